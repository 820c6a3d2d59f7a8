//! This module contains errors raised while allocating identifier codes.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that occur while the [`crate::registry::Registry`] allocates codes.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("The identifier space is exhausted: no code may reach {limit}")]
    Exhausted { limit: u32 },

    #[error("Could not write the code map at {path:?}: {message}")]
    AuditLog { path: PathBuf, message: String },
}

/// The result type for methods that may fail to allocate a code.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Checks whether the error must abort the analysis of the whole contract
    /// rather than a single pattern.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}
