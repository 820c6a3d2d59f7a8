//! This module contains the context threaded through the stages of the
//! analysis of one contract.

use crate::{
    analyzer::{
        result::{ContractResult, PatternResult},
        snapshot::Snapshot,
    },
    constant::{ANALYSIS_FAILED_MESSAGE, NOT_SUPPORTED_MESSAGE},
    error::{Error, Result},
    program::Program,
    solver::Verdicts,
};

/// The result record of a contract under analysis, along with the snapshot it
/// is mirrored to.
#[derive(Clone, Debug)]
pub struct AnalysisContext {
    result:   ContractResult,
    snapshot: Snapshot,
}

impl AnalysisContext {
    /// Creates the context with an empty result record, and writes the initial
    /// snapshot.
    ///
    /// # Errors
    ///
    /// If the snapshot cannot be written.
    pub fn new(snapshot: Snapshot) -> Result<Self> {
        let result = ContractResult::default();
        let context = Self { result, snapshot };
        context.milestone()?;

        Ok(context)
    }

    /// Adds the patterns called `names` to the result record as pending.
    ///
    /// # Errors
    ///
    /// If the snapshot cannot be written.
    pub fn open_patterns<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
        self.result.open_patterns(names);
        self.milestone()
    }

    /// Gets the result record as it currently stands.
    #[must_use]
    pub fn result(&self) -> &ContractResult {
        &self.result
    }

    /// Mirrors the current result record to the snapshot.
    ///
    /// # Errors
    ///
    /// If the snapshot cannot be written.
    pub fn milestone(&self) -> Result<()> {
        self.snapshot.write(&self.result)
    }

    /// Captures `error` as having occurred during `stage`.
    pub fn record_error(&mut self, stage: impl Into<String>, error: &Error) {
        let stage = stage.into();
        tracing::warn!(%stage, %error, "captured error");
        self.result.capture(stage, error);
    }

    /// Marks the contract as decompiled.
    ///
    /// # Errors
    ///
    /// If the snapshot cannot be written.
    pub fn mark_decompiled(&mut self) -> Result<()> {
        self.result.decompiled = true;
        self.milestone()
    }

    /// Adds the nodes classified in `findings` to the pattern called `name`.
    pub fn record_findings(&mut self, name: &str, program: &Program, findings: &Verdicts) {
        self.pattern(name).record(program, findings);
    }

    /// Records the failure of the pattern called `name` with `error`, captured
    /// under `stage`.
    ///
    /// The pattern keeps any findings it has already produced.
    pub fn fail(&mut self, name: &str, stage: impl Into<String>, error: &Error) {
        let message = match error {
            Error::Pattern(e) if e.is_unsupported() => NOT_SUPPORTED_MESSAGE,
            _ => ANALYSIS_FAILED_MESSAGE,
        };
        self.pattern(name).set_error(message);
        self.record_error(stage, error);
    }

    /// Completes the pattern called `name` as not supported for this contract.
    pub fn unsupported(&mut self, name: &str) {
        let pattern = self.pattern(name);
        pattern.set_error(NOT_SUPPORTED_MESSAGE);
        pattern.completed = true;
    }

    /// Marks the pattern called `name` as completed.
    pub fn complete(&mut self, name: &str) {
        self.pattern(name).completed = true;
    }

    /// Marks the analysis as finished without giving up the context.
    ///
    /// # Errors
    ///
    /// If the snapshot cannot be written.
    pub fn mark_finished(&mut self) -> Result<()> {
        self.result.finished = true;
        self.milestone()
    }

    /// Marks the analysis as finished and yields the final result record.
    ///
    /// # Errors
    ///
    /// If the snapshot cannot be written.
    pub fn finish(mut self) -> Result<ContractResult> {
        self.mark_finished()?;
        Ok(self.result)
    }

    fn pattern(&mut self, name: &str) -> &mut PatternResult {
        self.result.pattern_mut(name)
    }
}
