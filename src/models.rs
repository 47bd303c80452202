//! Data models module
//!
//! Defines core data structures:
//! - ExpectedRecord: persisted golden output of one test case
//! - RecordLookup / MissingReason: outcome of reading a record
//! - CapturedOutcome / FailureCause: observed behavior of one invocation
//! - TestResult / Verdict: per-test comparison result
//! - UpdateResult / UpdateAction: per-test record write result
//! - RunSummary / UpdateSummary: aggregated statistics
//! - HarnessConfig: validated settings for one run

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::constants::{DEFAULT_JOBS, DEFAULT_PLACEHOLDER, DEFAULT_RECORD_EXTENSION};
use crate::error::{HarnessError, Result};

/// Strip a single leading dot so `"rec"` and `".rec"` name the same extension
pub fn normalize_extension(ext: &str) -> &str {
    ext.strip_prefix('.').unwrap_or(ext)
}

/// Compare two extensions after normalization
pub fn extensions_equal(a: &str, b: &str) -> bool {
    normalize_extension(a) == normalize_extension(b)
}

/// Expected observable behavior of the program for one test case.
///
/// Field order is the serialization order of record files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedRecord {
    pub stdout: String,
    pub stderr: String,
    pub returncode: i32,
}

impl ExpectedRecord {
    /// Zero-value record written by create-empty mode
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Why a test case has no usable record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingReason {
    /// Record file does not exist
    NoRecord,
    /// Record file exists but cannot be parsed into an [`ExpectedRecord`]
    BadRecord { detail: String },
}

impl fmt::Display for MissingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRecord => write!(f, "no record"),
            Self::BadRecord { detail } => write!(f, "bad record: {}", detail),
        }
    }
}

/// Result of looking up the record of a test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordLookup {
    Present(ExpectedRecord),
    Missing(MissingReason),
}

/// Why an invocation produced no comparable output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The interpreter or pipes could not be set up
    LaunchError(String),
    /// The deadline expired and the process group was killed
    Timeout { after_ms: u64 },
    /// The run was interrupted while the program was running
    Interrupted,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LaunchError(detail) => write!(f, "launch error: {}", detail),
            Self::Timeout { after_ms } => write!(f, "timed out after {}ms", after_ms),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Observed behavior of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedOutcome {
    Completed {
        stdout: String,
        stderr: String,
        returncode: i32,
        command: String,
    },
    Failed {
        command: String,
        cause: FailureCause,
    },
}

impl CapturedOutcome {
    /// The shell command line that was run
    pub fn command(&self) -> &str {
        match self {
            Self::Completed { command, .. } | Self::Failed { command, .. } => command,
        }
    }

    /// The comparable triple, if the process ran to completion
    pub fn to_record(&self) -> Option<ExpectedRecord> {
        match self {
            Self::Completed { stdout, stderr, returncode, .. } => Some(ExpectedRecord {
                stdout: stdout.clone(),
                stderr: stderr.clone(),
                returncode: *returncode,
            }),
            Self::Failed { .. } => None,
        }
    }

    /// Exact field-by-field comparison against a record
    pub fn matches(&self, expected: &ExpectedRecord) -> bool {
        match self {
            Self::Completed { stdout, stderr, returncode, .. } => {
                *stdout == expected.stdout
                    && *stderr == expected.stderr
                    && *returncode == expected.returncode
            }
            Self::Failed { .. } => false,
        }
    }
}

/// Expected/actual pairing of a test result.
///
/// A skipped test never carries an outcome: the program is only run when a
/// usable record exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Skipped(MissingReason),
    Executed {
        expected: ExpectedRecord,
        actual: CapturedOutcome,
    },
}

/// Per-test result of a comparison run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub test_case: PathBuf,
    pub record_path: PathBuf,
    pub verdict: Verdict,
}

impl TestResult {
    pub fn skipped(&self) -> bool {
        matches!(self.verdict, Verdict::Skipped(_))
    }

    /// True iff the program completed and its triple equals the record exactly
    pub fn passed(&self) -> bool {
        match &self.verdict {
            Verdict::Executed { expected, actual } => actual.matches(expected),
            Verdict::Skipped(_) => false,
        }
    }

    pub fn expected(&self) -> RecordLookup {
        match &self.verdict {
            Verdict::Executed { expected, .. } => RecordLookup::Present(expected.clone()),
            Verdict::Skipped(reason) => RecordLookup::Missing(reason.clone()),
        }
    }

    pub fn actual(&self) -> Option<&CapturedOutcome> {
        match &self.verdict {
            Verdict::Executed { actual, .. } => Some(actual),
            Verdict::Skipped(_) => None,
        }
    }
}

/// What update mode did with the record of one test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAction {
    /// Record written (created or overwritten)
    Written(ExpectedRecord),
    /// Create-empty found an existing record and left it alone
    Kept,
    /// Program did not complete, nothing written
    NotWritten(CapturedOutcome),
    /// Writing the record file failed
    WriteFailed(String),
}

/// Per-test result of an update run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    pub test_case: PathBuf,
    pub record_path: PathBuf,
    pub action: UpdateAction,
}

/// Summary statistics for a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Tests whose output matched the record
    pub passed: usize,
    /// Tests that ran and did not match
    pub failed: usize,
    /// Tests without a usable record
    pub skipped: usize,
    /// Non-skipped tests (passed + failed)
    pub total: usize,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
    /// Whether the run was stopped by a signal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupted: Option<bool>,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }
}

/// Summary statistics for an update or create-empty run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSummary {
    /// Records created or overwritten
    pub written: usize,
    /// Existing records left untouched by create-empty
    pub kept: usize,
    /// Test cases whose record could not be produced or written
    pub failed: usize,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupted: Option<bool>,
}

/// What a run does with each discovered test case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Compare program output against records
    Check,
    /// Run the program and overwrite records with its output
    Update,
    /// Write zero-value records without running the program
    CreateEmpty,
}

/// Validated settings for one harness run
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Shell command template containing the placeholder
    pub program_template: String,
    /// Files or directories to collect test cases from
    pub roots: Vec<PathBuf>,
    pub mode: RunMode,
    /// Only directory entries with this extension are test cases
    pub test_ext: Option<String>,
    pub record_ext: String,
    pub placeholder: String,
    /// Descend into subdirectories of directory roots
    pub recursive: bool,
    /// Per-invocation deadline, unbounded when absent; signed so that
    /// negative input reaches validation
    pub timeout_ms: Option<i64>,
    /// Test cases evaluated concurrently
    pub jobs: usize,
    /// Only report failing tests
    pub fail_only: bool,
    pub color: bool,
    /// Print the invoked command for each test
    pub echo_command: bool,
    /// Emit JSON lines instead of the human report
    pub json_output: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            program_template: String::new(),
            roots: Vec::new(),
            mode: RunMode::Check,
            test_ext: None,
            record_ext: DEFAULT_RECORD_EXTENSION.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            recursive: true,
            timeout_ms: None,
            jobs: DEFAULT_JOBS,
            fail_only: false,
            color: false,
            echo_command: false,
            json_output: false,
        }
    }
}

impl HarnessConfig {
    /// Check configuration constraints; runs before discovery
    pub fn validate(&self) -> Result<()> {
        if normalize_extension(&self.record_ext).is_empty() {
            return Err(HarnessError::EmptyRecordExtension(self.record_ext.clone()));
        }
        if let Some(test_ext) = &self.test_ext {
            if extensions_equal(test_ext, &self.record_ext) {
                return Err(HarnessError::ExtensionCollision {
                    test: test_ext.clone(),
                    record: self.record_ext.clone(),
                });
            }
        }
        if let Some(timeout) = self.timeout_ms {
            if timeout < 1 {
                return Err(HarnessError::InvalidTimeout(timeout));
            }
        }
        if self.jobs < 1 {
            return Err(HarnessError::InvalidJobs(self.jobs));
        }
        if self.placeholder.is_empty() {
            return Err(HarnessError::EmptyPlaceholder);
        }
        Ok(())
    }

    /// Deadline in milliseconds, once [`HarnessConfig::validate`] has passed
    pub fn timeout(&self) -> Option<u64> {
        self.timeout_ms.and_then(|ms| u64::try_from(ms).ok())
    }
}

#[cfg(test)]
mod tests;
