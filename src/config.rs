//! Configuration file support
//!
//! An optional TOML file supplies defaults for a project's harness
//! settings. Precedence, lowest to highest: built-in defaults, the file,
//! command-line flags.
//!
//! ```toml
//! test_ext = "txt"
//! record_ext = "rec"
//! symbol = "@"
//! timeout_ms = 5000
//! recursive = true
//! jobs = 4
//! color = false
//! echo_command = false
//! fail_only = false
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{HarnessError, Result};
use crate::models::HarnessConfig;

/// Settings accepted in a config file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub test_ext: Option<String>,
    pub record_ext: Option<String>,
    pub symbol: Option<String>,
    pub timeout_ms: Option<i64>,
    pub recursive: Option<bool>,
    pub jobs: Option<usize>,
    /// `false` disables color even on a terminal
    pub color: Option<bool>,
    pub echo_command: Option<bool>,
    pub fail_only: Option<bool>,
}

impl FileConfig {
    /// Read and parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| HarnessError::ConfigFile {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        Self::parse(&content).map_err(|detail| HarnessError::ConfigFile {
            path: path.to_path_buf(),
            detail,
        })
    }

    fn parse(content: &str) -> std::result::Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Overlay the values present in the file onto `config`
    pub fn apply_to(&self, config: &mut HarnessConfig) {
        if let Some(ext) = &self.test_ext {
            config.test_ext = Some(ext.clone());
        }
        if let Some(ext) = &self.record_ext {
            config.record_ext = ext.clone();
        }
        if let Some(symbol) = &self.symbol {
            config.placeholder = symbol.clone();
        }
        if let Some(timeout) = self.timeout_ms {
            config.timeout_ms = Some(timeout);
        }
        if let Some(recursive) = self.recursive {
            config.recursive = recursive;
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if let Some(echo) = self.echo_command {
            config.echo_command = echo;
        }
        if let Some(fail_only) = self.fail_only {
            config.fail_only = fail_only;
        }
    }
}
