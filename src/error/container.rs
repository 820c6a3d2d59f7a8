//! This module contains the location wrapper used to attach an instruction to
//! an error.

use std::fmt::Formatter;

use thiserror::Error;

/// An error that is localised to a particular instruction in the program being
/// analysed.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct Located<E>
where
    E: Clone,
{
    /// The arena index of the instruction where the error occurred.
    pub location: u32,

    /// The error data
    pub payload: E,
}

/// Displays the error alongside the instruction at which it occurred.
impl<E> std::fmt::Display for Located<E>
where
    E: std::fmt::Display + Clone,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[i{}]: {}", self.location, self.payload)
    }
}

/// A trait for types that can have an instruction location attached to them.
pub trait Locatable
where
    Self: Sized,
{
    /// The return type with the attached location.
    type Located;

    /// Attach the location described by `instruction` (an arena index in the
    /// program) to the error.
    fn locate(self, instruction: u32) -> Self::Located;
}

/// A blanket implementation that allows for attaching a location to any result.
impl<T, E> Locatable for Result<T, E>
where
    E: std::error::Error + Clone,
{
    type Located = Result<T, Located<E>>;

    fn locate(self, instruction: u32) -> Self::Located {
        self.map_err(|e| Located {
            location: instruction,
            payload:  e,
        })
    }
}
