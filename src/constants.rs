//! Global constants for goldrec
//!
//! Centralized location for defaults shared by the CLI, the config file
//! loader and the harness engine

/// Binary name used in help and version output
pub const APP_NAME: &str = "goldrec";

/// Record file extension used when none is configured
pub const DEFAULT_RECORD_EXTENSION: &str = "rec";

/// Placeholder replaced by the test path in the program template
pub const DEFAULT_PLACEHOLDER: &str = "@";

/// Number of test cases evaluated concurrently by default
pub const DEFAULT_JOBS: usize = 1;

/// Interpreter used to run formatted invocations
pub const SHELL_PROGRAM: &str = "sh";

/// Flag passing the command string to [`SHELL_PROGRAM`]
pub const SHELL_COMMAND_FLAG: &str = "-c";

/// Environment variable disabling colored output (https://no-color.org)
pub const NO_COLOR_ENV: &str = "NO_COLOR";

/// Event name for per-test entries in JSON reports
pub const EVENT_TEST_RESULT: &str = "test_result";

/// Event name for per-test entries in JSON update reports
pub const EVENT_RECORD_UPDATE: &str = "record_update";

/// Event name for the closing JSON summary object
pub const EVENT_SUMMARY: &str = "summary";
