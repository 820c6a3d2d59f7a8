//! This module contains the progress snapshot, a copy of a contract's result
//! record that is kept on disk while the analysis runs.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::{
    analyzer::result::ContractResult,
    error::{Error, Result},
};

/// The destination of the progress snapshot.
///
/// The snapshot is replaced atomically, so that anyone watching the file only
/// ever observes a complete record.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Snapshot {
    path: Option<PathBuf>,
}

impl Snapshot {
    /// Creates a snapshot written to `path`, or one that is never written if
    /// there is no path.
    #[must_use]
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Gets the file that the snapshot is written to.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Replaces the snapshot with `result`.
    ///
    /// # Errors
    ///
    /// If the snapshot cannot be written.
    pub fn write(&self, result: &ContractResult) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let error = |message: String| Error::Snapshot {
            path: path.clone(),
            message,
        };

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| error(e.to_string()))?;

        let json = serde_json::to_string_pretty(result).map_err(|e| error(e.to_string()))?;
        let mut file = NamedTempFile::new_in(parent).map_err(|e| error(e.to_string()))?;
        file.write_all(json.as_bytes()).map_err(|e| error(e.to_string()))?;
        file.persist(path).map_err(|e| error(e.error.to_string()))?;

        tracing::trace!(?path, "wrote snapshot");
        Ok(())
    }
}
