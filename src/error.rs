//! Error taxonomy for the harness
//!
//! Only fatal conditions are represented as errors. Per-test problems
//! (missing or malformed records, launch failures, timeouts) travel as data
//! on the individual result, see [`crate::models::MissingReason`] and
//! [`crate::models::FailureCause`].

use std::path::PathBuf;

/// Fatal harness errors that abort a run before any test executes
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// A root is neither a file nor a directory
    #[error("path '{}' does not exist or is not a file or directory", .0.display())]
    InvalidRoot(PathBuf),

    /// A directory (root or nested) could not be listed
    #[error("cannot read directory '{}': {source}", path.display())]
    UnreadableDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Test and record extensions normalize to the same value
    #[error("record extension '{record}' and test extension '{test}' may not be equal")]
    ExtensionCollision { test: String, record: String },

    /// Record extension normalizes to nothing, so records would alias test files
    #[error("record extension '{0}' is empty")]
    EmptyRecordExtension(String),

    /// Timeout below one millisecond
    #[error("timeout must be at least 1 millisecond, got {0}")]
    InvalidTimeout(i64),

    /// Job count below one
    #[error("job count must be at least 1, got {0}")]
    InvalidJobs(usize),

    /// Empty placeholder symbol
    #[error("placeholder symbol may not be empty")]
    EmptyPlaceholder,

    /// Config file could not be read or parsed
    #[error("invalid config file '{}': {detail}", path.display())]
    ConfigFile { path: PathBuf, detail: String },
}

impl HarnessError {
    /// Whether this error belongs to the configuration category (checked before discovery)
    pub fn is_config_error(&self) -> bool {
        !matches!(self, Self::InvalidRoot(_) | Self::UnreadableDirectory { .. })
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;
