//! This module contains errors pertaining to running the external solver and
//! reading back its results.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that occur while preparing, running, or reading the results of the
/// fixed-point solver.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Could not prepare the workspace at {path:?}: {message}")]
    Workspace { path: PathBuf, message: String },

    #[error("Could not write the facts for {relation}: {message}")]
    WriteFacts {
        relation: &'static str,
        message:  String,
    },

    #[error("Could not start the solver {executable:?}: {message}")]
    Spawn { executable: PathBuf, message: String },

    #[error("The solver did not finish within {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("The solver exited with {code:?}: {stderr}")]
    ExitFailure { code: Option<i32>, stderr: String },

    #[error("Could not read {path:?}: {message}")]
    ReadResults { path: PathBuf, message: String },

    #[error("Line {line} of {path:?} is not a valid record: {record:?}")]
    MalformedRecord {
        path:   PathBuf,
        line:   usize,
        record: String,
    },

    #[error("The pattern name registry at {path:?} declares no patterns")]
    NoPatternNames { path: PathBuf },

    #[error("The solver declares no pattern named {name}")]
    UndeclaredPattern { name: String },

    #[error("The solver reported code {code}, which was never allocated to an instruction")]
    UnregisteredCode { code: i64 },
}

/// The result type for methods that interact with the solver.
pub type Result<T> = std::result::Result<T, Error>;
