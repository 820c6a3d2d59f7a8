//! This module contains the invocation of the external fixed-point solver that
//! evaluates the vulnerability patterns over the derived facts.
//!
//! # Protocol
//!
//! Every relation is written to `<relation>.facts` in the workspace's input
//! directory. The solver is then run as
//!
//! ```text
//! <timeout-command> <seconds> <solver> -F <input> -D <output>
//! ```
//!
//! and writes, for each pattern it declares, the partitions
//! `<name>Compliance.csv`, `<name>Violation.csv` and `<name>Warnings.csv` into
//! the output directory.

pub mod results;
pub mod workspace;

use std::{
    path::PathBuf,
    process::{Command, Stdio},
    time::{Duration, Instant},
};

pub use self::{
    results::{read_pattern_names, read_verdicts, Verdicts},
    workspace::Workspace,
};
use crate::{
    constant::{
        DEFAULT_PATTERN_NAMES_FILE,
        DEFAULT_SOLVER_EXECUTABLE,
        DEFAULT_SOLVER_TIMEOUT,
        DEFAULT_TIMEOUT_COMMAND,
        SOLVER_STDERR_TAIL_BYTES,
        TIMEOUT_EXIT_CODES,
    },
    error::solver::{Error, Result},
    utility::clip_uuid,
};

/// Runs the solver configured by `config` over the facts in `workspace`,
/// returning the time it took.
///
/// # Errors
///
/// If the solver cannot be started, runs out of time, or exits unsuccessfully.
pub fn run(config: &Config, workspace: &Workspace) -> Result<Duration> {
    let seconds = config.timeout.as_secs().max(1);
    let started = Instant::now();

    let output = Command::new(&config.timeout_command)
        .arg(seconds.to_string())
        .arg(&config.executable)
        .arg("-F")
        .arg(workspace.input())
        .arg("-D")
        .arg(workspace.output())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| Error::Spawn {
            executable: PathBuf::from(&config.timeout_command),
            message:    e.to_string(),
        })?;
    let elapsed = started.elapsed();

    if output.status.success() {
        tracing::info!(
            workspace = clip_uuid(&workspace.id()),
            ?elapsed,
            "solver finished"
        );
        return Ok(elapsed);
    }

    match output.status.code() {
        Some(code) if TIMEOUT_EXIT_CODES.contains(&code) => {
            tracing::warn!(seconds, "solver timed out");
            Err(Error::Timeout { seconds })
        }
        code => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = tail(&stderr, SOLVER_STDERR_TAIL_BYTES).trim().to_string();
            tracing::warn!(?code, %stderr, "solver failed");
            Err(Error::ExitFailure { code, stderr })
        }
    }
}

/// Gets at most the last `max` bytes of `text`, respecting character
/// boundaries.
fn tail(text: &str, max: usize) -> &str {
    let start = text.len().saturating_sub(max);
    let start = (start..text.len())
        .find(|i| text.is_char_boundary(*i))
        .unwrap_or(text.len());
    &text[start..]
}

/// The configuration for running the solver.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// The solver executable, compiled from the pattern rules.
    ///
    /// Defaults to [`DEFAULT_SOLVER_EXECUTABLE`].
    pub executable: PathBuf,

    /// The file listing the names of the patterns that the solver declares.
    ///
    /// Defaults to [`DEFAULT_PATTERN_NAMES_FILE`].
    pub pattern_names: PathBuf,

    /// The amount of time the solver may run for on a single analysis unit.
    /// Sub-second precision is ignored.
    ///
    /// Defaults to [`DEFAULT_SOLVER_TIMEOUT`].
    pub timeout: Duration,

    /// The command used to enforce the `timeout`.
    ///
    /// Defaults to [`DEFAULT_TIMEOUT_COMMAND`].
    pub timeout_command: String,

    /// The directory under which workspaces are created.
    ///
    /// Defaults to the system's temporary directory.
    pub workspace_root: PathBuf,

    /// Whether to write a map of every allocated code into each workspace's
    /// output directory.
    pub code_map: bool,
}

impl Config {
    /// Sets the `executable` config parameter to `value`.
    #[must_use]
    pub fn with_executable(mut self, value: impl Into<PathBuf>) -> Self {
        self.executable = value.into();
        self
    }

    /// Sets the `pattern_names` config parameter to `value`.
    #[must_use]
    pub fn with_pattern_names(mut self, value: impl Into<PathBuf>) -> Self {
        self.pattern_names = value.into();
        self
    }

    /// Sets the `timeout` config parameter to `value`.
    #[must_use]
    pub fn with_timeout(mut self, value: Duration) -> Self {
        self.timeout = value;
        self
    }

    /// Sets the `timeout_command` config parameter to `value`.
    #[must_use]
    pub fn with_timeout_command(mut self, value: impl Into<String>) -> Self {
        self.timeout_command = value.into();
        self
    }

    /// Sets the `workspace_root` config parameter to `value`.
    #[must_use]
    pub fn with_workspace_root(mut self, value: impl Into<PathBuf>) -> Self {
        self.workspace_root = value.into();
        self
    }

    /// Sets the `code_map` config parameter to `value`.
    #[must_use]
    pub fn with_code_map(mut self, value: bool) -> Self {
        self.code_map = value;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            executable:      PathBuf::from(DEFAULT_SOLVER_EXECUTABLE),
            pattern_names:   PathBuf::from(DEFAULT_PATTERN_NAMES_FILE),
            timeout:         DEFAULT_SOLVER_TIMEOUT,
            timeout_command: DEFAULT_TIMEOUT_COMMAND.to_string(),
            workspace_root:  std::env::temp_dir(),
            code_map:        false,
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use crate::solver::{tail, Config};

    #[test]
    fn builders_override_defaults() {
        let config = Config::default()
            .with_executable("/opt/solver")
            .with_timeout(Duration::from_secs(5))
            .with_code_map(true);

        assert_eq!(config.executable.to_string_lossy(), "/opt/solver");
        assert_eq!(config.timeout.as_secs(), 5);
        assert!(config.code_map);
        assert_eq!(config.timeout_command, Config::default().timeout_command);
    }

    #[test]
    fn tails_respect_character_boundaries() {
        assert_eq!(tail("hello", 3), "llo");
        assert_eq!(tail("hi", 10), "hi");
        assert_eq!(tail("aé", 1), "");
    }
}
