//! This module contains errors pertaining to the derivation of facts from a
//! program.

use thiserror::Error;

use crate::{
    error::{container, registry},
    program::Operation,
};

/// Errors that occur while deriving relations from the instructions of an
/// analysis unit.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("{operation} has no {role} operand")]
    MissingOperand {
        operation: Operation,
        role:      &'static str,
    },

    #[error(transparent)]
    Registry(#[from] registry::Error),
}

/// A derivation error with an associated instruction.
pub type LocatedError = container::Located<Error>;

/// The result type for methods that may have derivation errors.
pub type Result<T> = std::result::Result<T, LocatedError>;

impl Error {
    /// Checks whether the error must abort the analysis of the whole contract
    /// rather than a single pattern.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Registry(e) => e.is_fatal(),
            Self::MissingOperand { .. } => false,
        }
    }
}

/// Make it possible to attach locations to these errors.
impl container::Locatable for Error {
    type Located = LocatedError;

    fn locate(self, instruction: u32) -> Self::Located {
        container::Located {
            location: instruction,
            payload:  self,
        }
    }
}
