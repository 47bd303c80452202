//! goldrec - golden-record test harness library
//!
//! Discovers test files, runs a program-under-test against each through a
//! shell command template, and compares stdout, stderr and exit code with
//! a record stored next to the test file.

pub mod cli;
pub mod config;
pub mod constants;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod oracle;
pub mod output;
pub mod record;
pub mod template;
