//! CLI argument parsing and validation module
//!
//! Handles command-line interface using clap, including:
//! - Program template and test roots
//! - Update and create-empty modes
//! - Extension, placeholder and recursion options
//! - Timeout and parallelism
//! - Report format and display switches
//! - Merging with an optional config file

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::config::FileConfig;
use crate::constants::{APP_NAME, DEFAULT_PLACEHOLDER, DEFAULT_RECORD_EXTENSION, NO_COLOR_ENV};
use crate::models::{HarnessConfig, RunMode};

/// Everything the binary needs from the command line
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub harness: HarnessConfig,
    /// Number of `-v` flags
    pub verbosity: u8,
}

/// Build the clap command definition
pub fn build_command() -> Command {
    Command::new(APP_NAME)
        .version(env!("GOLDREC_VERSION"))
        .long_version(concat!(env!("GOLDREC_VERSION"), " (", env!("GIT_HASH"), ")"))
        .about("Golden-record test runner")
        .long_about(
            "Runs a program against each test file and compares its stdout, stderr and exit code \
             with a previously recorded result stored next to the test file.",
        )
        .arg(
            Arg::new("program")
                .value_name("PROGRAM_TEMPLATE")
                .help("Shell command to run; the placeholder is replaced by the test path (appended when absent)")
                .required(true),
        )
        .arg(
            Arg::new("tests")
                .value_name("TESTS")
                .help("Test files or directories containing test files")
                .required(true)
                .num_args(1..)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("update")
                .short('u')
                .long("update")
                .help("Record the program's current behavior instead of comparing")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("create-empty")
                .short('c')
                .long("create-empty")
                .help("Write empty records for tests that have none, without running the program")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("test-ext")
                .short('e')
                .long("test-ext")
                .value_name("EXT")
                .help("Only treat files with this extension as tests"),
        )
        .arg(
            Arg::new("record-ext")
                .short('r')
                .long("record-ext")
                .value_name("EXT")
                .help(format!("Extension of record files [default: {}]", DEFAULT_RECORD_EXTENSION)),
        )
        .arg(
            Arg::new("symbol")
                .short('s')
                .long("symbol")
                .value_name("SYM")
                .help(format!("Placeholder for the test path in the template [default: {}]", DEFAULT_PLACEHOLDER)),
        )
        .arg(
            Arg::new("no-recurse")
                .short('n')
                .long("no-recurse")
                .help("Do not descend into subdirectories")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("fail-only")
                .short('f')
                .long("fail-only")
                .help("Only show failing tests")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable colored output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("echo")
                .long("echo")
                .help("Print the command invoked for each test")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("MS")
                .help("Kill a test's process group after this many milliseconds")
                .allow_negative_numbers(true)
                .value_parser(value_parser!(i64)),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .value_name("N")
                .help("Run up to N tests concurrently; output order is unchanged")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Output one JSON object per line")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("TOML file with default settings")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase diagnostic logging on stderr (repeatable)")
                .action(ArgAction::Count),
        )
}

/// Parse command line arguments and return configuration
pub fn parse_args() -> Result<CliConfig> {
    let matches = build_command().get_matches();
    let color_capable = std::io::stdout().is_terminal() && std::env::var_os(NO_COLOR_ENV).is_none();
    config_from_matches(&matches, color_capable)
}

/// Merge defaults, the optional config file and flags, then validate
pub fn config_from_matches(matches: &ArgMatches, color_capable: bool) -> Result<CliConfig> {
    let mut harness = HarnessConfig::default();
    let mut color = color_capable;

    if let Some(path) = matches.get_one::<PathBuf>("config") {
        let file = FileConfig::load(path)?;
        file.apply_to(&mut harness);
        if file.color == Some(false) {
            color = false;
        }
    }

    harness.program_template = matches
        .get_one::<String>("program")
        .cloned()
        .unwrap_or_default();
    harness.roots = matches
        .get_many::<PathBuf>("tests")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    harness.mode = if matches.get_flag("create-empty") {
        RunMode::CreateEmpty
    } else if matches.get_flag("update") {
        RunMode::Update
    } else {
        RunMode::Check
    };

    if let Some(ext) = matches.get_one::<String>("test-ext") {
        harness.test_ext = Some(ext.clone());
    }
    if let Some(ext) = matches.get_one::<String>("record-ext") {
        harness.record_ext = ext.clone();
    }
    if let Some(symbol) = matches.get_one::<String>("symbol") {
        harness.placeholder = symbol.clone();
    }
    if matches.get_flag("no-recurse") {
        harness.recursive = false;
    }
    if matches.get_flag("fail-only") {
        harness.fail_only = true;
    }
    if matches.get_flag("echo") {
        harness.echo_command = true;
    }
    if let Some(timeout) = matches.get_one::<i64>("timeout") {
        harness.timeout_ms = Some(*timeout);
    }
    if let Some(jobs) = matches.get_one::<usize>("jobs") {
        harness.jobs = *jobs;
    }
    harness.json_output = matches.get_flag("json");
    harness.color = color && !matches.get_flag("no-color") && !harness.json_output;

    harness.validate()?;

    Ok(CliConfig {
        harness,
        verbosity: matches.get_count("verbose"),
    })
}
