//! Record store
//!
//! One record file per test case, stored next to it with the test's
//! extension swapped for the record extension. Records are JSON objects
//! with exactly the fields `stdout`, `stderr` and `returncode`; unknown
//! fields are ignored on read and never written.

use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::models::{normalize_extension, ExpectedRecord, MissingReason, RecordLookup};

/// Mode of newly created record files
const RECORD_MODE: u32 = 0o644;

/// Reads and writes expected records for test cases
#[derive(Debug, Clone)]
pub struct RecordStore {
    extension: String,
}

impl RecordStore {
    /// `"rec"` and `".rec"` configure the same store
    pub fn new(extension: &str) -> Self {
        Self {
            extension: normalize_extension(extension).to_string(),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Sibling path with the last extension of the test file replaced
    pub fn record_path_of(&self, test_case: &Path) -> PathBuf {
        test_case.with_extension(&self.extension)
    }

    /// Load a record; absence and corruption are returned as [`MissingReason`]
    pub fn read(&self, record_path: &Path) -> RecordLookup {
        let content = match fs::read_to_string(record_path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return RecordLookup::Missing(MissingReason::NoRecord)
            }
            Err(err) => {
                return RecordLookup::Missing(MissingReason::BadRecord {
                    detail: err.to_string(),
                })
            }
        };

        match parse_record(&content) {
            Ok(record) => RecordLookup::Present(record),
            Err(detail) => RecordLookup::Missing(MissingReason::BadRecord { detail }),
        }
    }

    /// Atomically replace the record file with `record`
    pub fn write(&self, record_path: &Path, record: &ExpectedRecord) -> Result<()> {
        let directory = match record_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut encoded = serde_json::to_string_pretty(record)?;
        encoded.push('\n');

        let mut staging = NamedTempFile::new_in(directory)
            .with_context(|| format!("Failed to create temporary file in {}", directory.display()))?;
        staging
            .write_all(encoded.as_bytes())
            .with_context(|| format!("Failed to write record {}", record_path.display()))?;

        // Temporary files start out 0600; keep the mode of the record being replaced
        let permissions = match fs::metadata(record_path) {
            Ok(existing) => existing.permissions(),
            Err(_) => fs::Permissions::from_mode(RECORD_MODE),
        };
        staging
            .as_file()
            .set_permissions(permissions)
            .with_context(|| format!("Failed to set permissions of record {}", record_path.display()))?;
        staging
            .persist(record_path)
            .with_context(|| format!("Failed to replace record {}", record_path.display()))?;

        debug!(path = %record_path.display(), "record written");
        Ok(())
    }
}

/// Decode a record; only a JSON object is accepted
fn parse_record(content: &str) -> std::result::Result<ExpectedRecord, String> {
    let value: serde_json::Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    if !value.is_object() {
        return Err("record is not a JSON object".to_string());
    }
    ExpectedRecord::deserialize(value).map_err(|e| e.to_string())
}
