//! This module contains the primary error type for the analyzer's interface.
//! It also re-exports the more specific error types that are
//! subsystem-specific.

pub mod container;
pub mod decompile;
pub mod derivation;
pub mod pattern;
pub mod registry;
pub mod solver;

use std::path::PathBuf;

use thiserror::Error;

/// The interface result type for the library.
///
/// # Usage
///
/// Any function considered to be part of the public interface of the library
/// should return this result type. Subsystems should return the more-specific
/// child error types as appropriate.
///
/// Note that _all_ of the library is public in order to facilitate use-cases
/// beyond the ones designed for.
pub type Result<T> = std::result::Result<T, Error>;

/// The interface error type for the library.
///
/// All errors returned from the library interface (and hence encountered by the
/// clients of the library) should be members of this enum.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// Errors that come from the decompiler or from validating its output.
    #[error(transparent)]
    Decompile(#[from] decompile::Error),

    /// Errors from deriving facts, located at the offending instruction.
    #[error(transparent)]
    Derivation(#[from] derivation::LocatedError),

    /// Errors from running the solver or reading its results.
    #[error(transparent)]
    Solver(#[from] solver::Error),

    /// Errors from checking a vulnerability pattern.
    #[error(transparent)]
    Pattern(#[from] pattern::Error),

    /// The progress snapshot could not be written.
    #[error("Could not write the progress snapshot to {path:?}: {message}")]
    Snapshot { path: PathBuf, message: String },

    /// An auxiliary output file could not be written.
    #[error("Could not write {path:?}: {message}")]
    Io { path: PathBuf, message: String },

    /// An unknown error, represented as a string.
    #[error("Unknown Error: {_0:?}")]
    Other(String),
}

impl Error {
    /// Constructs an unknown error with the provided `message`.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Checks whether the error must abort the analysis of the contract instead
    /// of being recorded against a single pattern.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Derivation(located) => located.payload.is_fatal(),
            Self::Snapshot { .. } | Self::Io { .. } => true,
            _ => false,
        }
    }
}

/// Registry errors surface outside of derivation when codes are looked up or
/// allocated directly.
impl From<registry::Error> for Error {
    fn from(value: registry::Error) -> Self {
        let located = container::Located {
            location: 0,
            payload:  derivation::Error::from(value),
        };
        Self::Derivation(located)
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use crate::error::{container::Locatable, derivation, registry, solver, Error};

    #[test]
    fn exhaustion_is_fatal() {
        let err: Error = derivation::Error::from(registry::Error::Exhausted { limit: 10 })
            .locate(3)
            .into();
        assert!(err.is_fatal());
    }

    #[test]
    fn solver_failures_are_not_fatal() {
        let err: Error = solver::Error::Timeout { seconds: 1 }.into();
        assert!(!err.is_fatal());
    }

    #[test]
    fn snapshot_failures_are_fatal() {
        let err = Error::Snapshot {
            path:    PathBuf::from("/nowhere"),
            message: "denied".into(),
        };
        assert!(err.is_fatal());
    }
}
