//! This module contains errors raised by vulnerability patterns.

use thiserror::Error;

use crate::error::solver;

/// Errors that a [`crate::pattern::Pattern`] may report while checking an
/// analysis unit.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("The pattern cannot be checked here: {reason}")]
    Unsupported { reason: String },

    #[error("The pattern failed: {message}")]
    Failed { message: String },

    #[error(transparent)]
    Solver(#[from] solver::Error),
}

/// The result type for pattern checks.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Constructs an unsupported-pattern error with the provided `reason`.
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported {
            reason: reason.into(),
        }
    }

    /// Constructs a generic pattern failure with the provided `message`.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Checks whether the error reports a condition the pattern does not
    /// support, rather than a failure.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}
