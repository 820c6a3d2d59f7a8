//! This module contains the temporary directories in which a single solver run
//! takes place.

use std::{
    fs,
    path::{Path, PathBuf},
};

use uuid::Uuid;

use crate::{
    constant::{WORKSPACE_OUTPUT_SUFFIX, WORKSPACE_PREFIX},
    error::solver::{Error, Result},
    utility::clip_uuid,
};

/// A uniquely-named pair of directories holding a solver run's input facts and
/// its results.
///
/// Both directories are removed when the workspace is dropped, whichever way
/// the run ended.
#[derive(Debug)]
pub struct Workspace {
    id:     Uuid,
    input:  PathBuf,
    output: PathBuf,
}

impl Workspace {
    /// Creates a fresh workspace under `root`.
    ///
    /// # Errors
    ///
    /// If either directory cannot be created.
    pub fn create(root: impl AsRef<Path>) -> Result<Self> {
        let id = Uuid::new_v4();
        let input = root.as_ref().join(format!("{WORKSPACE_PREFIX}{id}"));
        let output = root
            .as_ref()
            .join(format!("{WORKSPACE_PREFIX}{id}{WORKSPACE_OUTPUT_SUFFIX}"));

        // Construct first so that a partial creation is still cleaned up
        let workspace = Self { id, input, output };
        for dir in [&workspace.input, &workspace.output] {
            fs::create_dir_all(dir).map_err(|e| Error::Workspace {
                path:    dir.clone(),
                message: e.to_string(),
            })?;
        }

        tracing::debug!(workspace = clip_uuid(&id), "created workspace");
        Ok(workspace)
    }

    /// Gets the unique identifier of the workspace.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Gets the directory into which the input facts are written.
    #[must_use]
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Gets the directory into which the solver writes its results.
    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        for dir in [&self.input, &self.output] {
            if dir.exists() {
                if let Err(e) = fs::remove_dir_all(dir) {
                    tracing::warn!(path = ?dir, error = %e, "could not remove workspace directory");
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::solver::Workspace;

    #[test]
    fn directories_live_as_long_as_the_workspace() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let workspace = Workspace::create(root.path())?;
        let (input, output) = (workspace.input().to_path_buf(), workspace.output().to_path_buf());

        assert!(input.is_dir());
        assert!(output.is_dir());
        assert!(output.to_string_lossy().ends_with("_OUT"));
        std::fs::write(input.join("x.facts"), "1\n")?;

        drop(workspace);
        assert!(!input.exists());
        assert!(!output.exists());
        Ok(())
    }

    #[test]
    fn workspaces_are_unique() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let a = Workspace::create(root.path())?;
        let b = Workspace::create(root.path())?;
        assert_ne!(a.input(), b.input());
        Ok(())
    }
}
