#![forbid(unsafe_code)]

use std::io;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use goldrec::cli;
use goldrec::discovery::{discover_tests, DiscoveryOptions};
use goldrec::executor::Executor;
use goldrec::logging::{init_logging, LogLevel};
use goldrec::models::{HarnessConfig, RunMode};
use goldrec::oracle::ComparisonOracle;
use goldrec::output::{self, HumanReporter, JsonReporter, ReportOptions, Reporter};
use goldrec::record::RecordStore;
use goldrec::template::ProgramTemplate;

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<u8> {
    let cli = cli::parse_args()?;
    init_logging(LogLevel::from_verbosity(cli.verbosity));
    let config = cli.harness;

    // Set up interrupt handling: the first signal stops the run, a second one exits at once
    let interrupted = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        let _ = signal_hook::flag::register_conditional_shutdown(signal, 1, interrupted.clone());
        let _ = signal_hook::flag::register(signal, interrupted.clone());
    }

    let options = DiscoveryOptions::new(&config.record_ext, config.test_ext.as_deref(), config.recursive);
    let tests = discover_tests(&config.roots, &options)?;
    info!(count = tests.len(), "test cases discovered");

    let template = ProgramTemplate::new(&config.program_template, &config.placeholder)?;
    let executor = Executor::new(config.timeout())
        .context("Failed to start process runtime")?
        .with_interrupt(interrupted.clone());
    let oracle = ComparisonOracle::new(template, RecordStore::new(&config.record_ext), executor)
        .with_jobs(config.jobs)?
        .with_interrupt(interrupted.clone());

    let stdout = io::stdout();
    let mut reporter: Box<dyn Reporter> = if config.json_output {
        Box::new(JsonReporter::new(stdout.lock()))
    } else {
        Box::new(HumanReporter::new(stdout.lock(), report_options(&config)))
    };

    let code = match config.mode {
        RunMode::Check => {
            let results = oracle.check_all(tests);
            let summary = output::aggregate_checks(results, reporter.as_mut(), Some(interrupted.as_ref()))?;
            output::check_exit_code(&summary)
        }
        mode @ (RunMode::Update | RunMode::CreateEmpty) => {
            let results = oracle.update_all(tests, mode);
            let summary = output::aggregate_updates(results, reporter.as_mut(), Some(interrupted.as_ref()))?;
            output::update_exit_code(&summary)
        }
    };

    Ok(u8::try_from(code).unwrap_or(1))
}

fn report_options(config: &HarnessConfig) -> ReportOptions {
    ReportOptions {
        color: config.color,
        fail_only: config.fail_only,
        echo_command: config.echo_command,
    }
}
