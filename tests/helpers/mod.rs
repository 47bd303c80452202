#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::{json, Value};
use tempfile::TempDir;

/// A scratch directory of test cases and records
pub struct Suite {
    pub temp_dir: TempDir,
    scratch: TempDir,
}

impl Suite {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("create temp dir"),
            scratch: TempDir::new().expect("create scratch dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a test case file, creating parent directories
    pub fn case(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create case dir");
        }
        fs::write(&path, content).expect("write case");
        path
    }

    /// Write a well-formed record file
    pub fn record(&self, name: &str, stdout: &str, stderr: &str, returncode: i32) -> PathBuf {
        let body = json!({ "stdout": stdout, "stderr": stderr, "returncode": returncode });
        self.raw_record(name, &body.to_string())
    }

    /// Write arbitrary bytes as a record file
    pub fn raw_record(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, content).expect("write record");
        path
    }

    pub fn read_record(&self, name: &str) -> Value {
        let content = fs::read_to_string(self.path().join(name)).expect("read record");
        serde_json::from_str(&content).expect("record is JSON")
    }

    /// Path of a file counting program invocations, one byte per run.
    /// Lives outside the suite so discovery never sees it.
    pub fn counter(&self) -> PathBuf {
        self.scratch.path().join("invocations.log")
    }

    pub fn invocations(&self) -> usize {
        fs::read(self.counter()).map(|bytes| bytes.len()).unwrap_or(0)
    }

    /// Template that records each invocation, then cats the test file
    pub fn counting_cat(&self) -> String {
        format!("printf x >> '{}'; cat", self.counter().display())
    }
}

pub fn goldrec() -> Command {
    let mut cmd = Command::cargo_bin("goldrec").expect("binary built");
    cmd.env_remove("GOLDREC_LOG").env_remove("RUST_LOG");
    cmd
}

pub fn json_lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is JSON"))
        .collect()
}
