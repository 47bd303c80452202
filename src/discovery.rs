//! Test case discovery module
//!
//! Responsible for:
//! - Resolving root paths (files or directories) into test case paths
//! - Excluding record files and applying the test extension filter
//! - Optional recursion into subdirectories
//! - Deterministic ordering of results
//!
//! Any unreadable directory aborts discovery: a partial corpus must never
//! be reported as a passing run.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{HarnessError, Result};
use crate::models::normalize_extension;

/// Filters applied to directory entries during discovery
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Extension of record files, always excluded from directory listings
    pub record_ext: String,
    /// When set, only directory entries with this extension are kept
    pub test_ext: Option<String>,
    /// Descend into subdirectories
    pub recursive: bool,
}

impl DiscoveryOptions {
    pub fn new(record_ext: &str, test_ext: Option<&str>, recursive: bool) -> Self {
        Self {
            record_ext: normalize_extension(record_ext).to_string(),
            test_ext: test_ext.map(|ext| normalize_extension(ext).to_string()),
            recursive,
        }
    }

    /// Whether a directory entry with this file name is a test case.
    /// Names need not be valid UTF-8.
    fn accepts(&self, file_name: &OsStr) -> bool {
        let file_name = file_name.as_encoded_bytes();
        if has_extension(file_name, &self.record_ext) {
            return false;
        }
        match &self.test_ext {
            Some(ext) => has_extension(file_name, ext),
            None => true,
        }
    }
}

/// Suffix match on `"." + ext`; `ext` must already be normalized
fn has_extension(file_name: &[u8], ext: &str) -> bool {
    file_name
        .strip_suffix(ext.as_bytes())
        .is_some_and(|stem| stem.ends_with(b"."))
}

/// Resolve all roots into a sorted, de-duplicated list of test case paths
pub fn discover_tests(roots: &[PathBuf], options: &DiscoveryOptions) -> Result<Vec<PathBuf>> {
    let mut tests = Vec::new();

    for root in roots {
        if root.is_file() {
            // Explicitly named files bypass the extension filters
            tests.push(root.clone());
        } else if root.is_dir() {
            collect_directory(root, options, &mut tests)?;
        } else {
            return Err(HarnessError::InvalidRoot(root.clone()));
        }
    }

    tests.sort();
    tests.dedup();
    debug!(count = tests.len(), "discovered test cases");
    Ok(tests)
}

fn collect_directory(dir: &Path, options: &DiscoveryOptions, tests: &mut Vec<PathBuf>) -> Result<()> {
    let unreadable = |source| HarnessError::UnreadableDirectory {
        path: dir.to_path_buf(),
        source,
    };

    for entry in fs::read_dir(dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        let entry_path = entry.path();
        let file_type = entry.file_type().map_err(unreadable)?;

        // Symlinked directories are not followed, which keeps cycles out
        if file_type.is_dir() {
            if options.recursive {
                collect_directory(&entry_path, options, tests)?;
            }
            continue;
        }

        // Follows symlinks, so links to regular files count as files
        if !entry_path.is_file() {
            continue;
        }

        if options.accepts(&entry.file_name()) {
            tests.push(entry_path);
        }
    }

    Ok(())
}
