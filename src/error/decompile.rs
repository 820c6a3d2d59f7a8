//! This module contains errors reported by the decompiler or while validating
//! the program it produced.

use thiserror::Error;

/// Errors that prevent a contract's bytecode from being turned into a
/// [`crate::program::Program`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Decompilation failed: {message}")]
    Failed { message: String },

    #[error("The program could not be parsed: {message}")]
    Malformed { message: String },

    #[error("Instruction {instruction} refers to {kind} {index}, which does not exist")]
    DanglingReference {
        instruction: u32,
        kind:        &'static str,
        index:       u32,
    },
}

/// The result type for decompilation.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Constructs a decompilation failure with the provided `message`.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}
