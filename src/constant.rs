//! This module contains constants that are needed throughout the codebase.

use std::time::Duration;

/// The largest code that the identifier registry may hand out.
///
/// The solver represents every field as a signed 32-bit integer, so codes must
/// stay strictly below [`i32::MAX`].
#[allow(clippy::cast_sign_loss)] // Positive by construction
pub const MAX_CODE: u32 = i32::MAX as u32;

/// The code that is permanently reserved for the integer constant `0`.
pub const ZERO_CONSTANT_CODE: u32 = 0;

/// The first code allocated by a fresh registry.
pub const FIRST_ALLOCATED_CODE: u32 = 1;

/// The integer constant used to represent "unknown" in the fact base.
pub const UNKNOWN_CONSTANT: i64 = -1;

/// The stride, in bytes, between the offsets emitted for the memory region read
/// by a `SHA3` instruction.
pub const HASHED_WORD_STRIDE: u32 = 4;

/// The label of the sentinel merge node used for conditional branches whose
/// merge point was not resolved by the decompiler.
pub const UNRESOLVED_MERGE_LABEL: &str = "BLACKHOLE";

/// The label fragment used when naming the synthetic nodes produced during join
/// construction.
pub const SYNTHETIC_JOIN_LABEL: &str = "tmp";

/// The file extension used for input relation files.
pub const FACT_FILE_EXTENSION: &str = "facts";

/// The separator between the fields of a single fact or result record.
pub const FIELD_SEPARATOR: char = '\t';

/// The suffix of the result partition holding compliant nodes.
pub const COMPLIANCE_SUFFIX: &str = "Compliance";

/// The suffix of the result partition holding violating nodes.
pub const VIOLATION_SUFFIX: &str = "Violation";

/// The suffix of the result partition holding warned nodes.
pub const WARNINGS_SUFFIX: &str = "Warnings";

/// The file extension of the solver's output partitions.
pub const RESULT_FILE_EXTENSION: &str = "csv";

/// The separator between names in the pattern name registry file.
pub const PATTERN_NAME_SEPARATOR: &str = " , ";

/// The prefix of every workspace directory created for a solver run.
pub const WORKSPACE_PREFIX: &str = "facts-";

/// The suffix that distinguishes a workspace's output directory from its input
/// directory.
pub const WORKSPACE_OUTPUT_SUFFIX: &str = "_OUT";

/// The name of the code allocation audit log written to a workspace's output
/// directory.
pub const CODE_MAP_FILE_NAME: &str = "code_map.txt";

/// The default amount of time for which the solver may run on a single
/// analysis unit.
pub const DEFAULT_SOLVER_TIMEOUT: Duration = Duration::from_secs(60);

/// The default name of the solver executable, resolved through `PATH`.
pub const DEFAULT_SOLVER_EXECUTABLE: &str = "dl-solver";

/// The default location of the pattern name registry file.
pub const DEFAULT_PATTERN_NAMES_FILE: &str = "pattern_names.txt";

/// The command used to bound the solver's running time.
#[cfg(target_os = "macos")]
pub const DEFAULT_TIMEOUT_COMMAND: &str = "gtimeout";

/// The command used to bound the solver's running time.
#[cfg(not(target_os = "macos"))]
pub const DEFAULT_TIMEOUT_COMMAND: &str = "timeout";

/// The exit codes with which the timeout command reports that the solver ran
/// out of time.
pub const TIMEOUT_EXIT_CODES: [i32; 2] = [124, 137];

/// The maximum number of bytes of the solver's standard error retained in a
/// failure report.
pub const SOLVER_STDERR_TAIL_BYTES: usize = 2_048;

/// The patterns that must see the whole contract rather than a single method.
pub const DEFAULT_CONTRACT_GLOBAL_PATTERNS: [&str; 1] = ["LockedEther"];

/// The patterns that can only be checked once methods have been recovered.
pub const DEFAULT_METHOD_RECOVERY_PATTERNS: [&str; 1] = ["MissingInputValidation"];

/// The error reported for a pattern that cannot be checked on the contract.
pub const NOT_SUPPORTED_MESSAGE: &str = "not supported";

/// The error reported for a pattern whose check failed.
pub const ANALYSIS_FAILED_MESSAGE: &str = "analysis failed";

/// The stage tag recorded when decompilation fails.
pub const DECOMPILATION_STAGE: &str = "decompilation_error";

/// The prefix of the stage tag recorded when the dataflow for a pattern could
/// not be computed.
pub const CHECK_PATTERN_STAGE_PREFIX: &str = "check_pattern_";

/// The prefix of the stage tag recorded when a pattern's check fails.
pub const CHECK_INSTRUCTIONS_STAGE_PREFIX: &str = "check_instructions_";

/// The stage tag recorded when checking the patterns of a contract is aborted.
pub const PATTERN_ERROR_STAGE: &str = "pattern_error";
