//! This module contains the configuration of the analyzer as a whole.

use std::path::PathBuf;

use crate::solver;

/// The configuration for the analysis of a contract.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Config {
    /// The configuration for running the solver.
    ///
    /// Defaults to [`solver::Config::default`].
    pub solver: solver::Config,

    /// The file to which the contract's result record is mirrored every time
    /// it changes.
    ///
    /// Defaults to [`None`], in which case no snapshot is written.
    pub snapshot: Option<PathBuf>,

    /// The file to which a listing of the decompiled program is written.
    ///
    /// Defaults to [`None`], in which case no listing is written.
    pub listing: Option<PathBuf>,

    /// The names of the patterns to check, compared case-insensitively.
    ///
    /// Defaults to [`None`], in which case every pattern in the catalogue is
    /// checked.
    pub patterns: Option<Vec<String>>,
}

impl Config {
    /// Sets the `solver` config field to `value`.
    #[must_use]
    pub fn with_solver(mut self, value: solver::Config) -> Self {
        self.solver = value;
        self
    }

    /// Sets the `snapshot` config field to `value`.
    #[must_use]
    pub fn with_snapshot(mut self, value: impl Into<PathBuf>) -> Self {
        self.snapshot = Some(value.into());
        self
    }

    /// Sets the `listing` config field to `value`.
    #[must_use]
    pub fn with_listing(mut self, value: impl Into<PathBuf>) -> Self {
        self.listing = Some(value.into());
        self
    }

    /// Sets the `patterns` config field to `value`.
    #[must_use]
    pub fn with_patterns(mut self, value: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.patterns = Some(value.into_iter().map(Into::into).collect());
        self
    }
}
