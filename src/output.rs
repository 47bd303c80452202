//! Output formatting and result aggregation
//!
//! Handles:
//! - Human-readable per-test lines with expected-vs-actual detail
//! - JSON lines output for machine consumption
//! - Tallying pass/fail/skip and the final summary
//! - Mapping a finished run to the process exit code
//!
//! Results are written as they arrive so long runs report progressively.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::Result;
use serde_json::json;

use crate::constants::{EVENT_RECORD_UPDATE, EVENT_SUMMARY, EVENT_TEST_RESULT};
use crate::models::{
    CapturedOutcome, ExpectedRecord, RunSummary, TestResult, UpdateAction, UpdateResult,
    UpdateSummary, Verdict,
};

const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

/// Sink for streamed results and the closing summary
pub trait Reporter {
    fn test_result(&mut self, result: &TestResult) -> Result<()>;
    fn update_result(&mut self, result: &UpdateResult) -> Result<()>;
    fn run_summary(&mut self, summary: &RunSummary) -> Result<()>;
    fn update_summary(&mut self, summary: &UpdateSummary) -> Result<()>;
}

/// Display switches for the human report
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub color: bool,
    /// Hide passing and skipped tests
    pub fail_only: bool,
    /// Show the invoked command for every executed test
    pub echo_command: bool,
}

/// Line-oriented report for terminals and logs
pub struct HumanReporter<W: Write> {
    out: W,
    options: ReportOptions,
}

impl<W: Write> HumanReporter<W> {
    pub fn new(out: W, options: ReportOptions) -> Self {
        Self { out, options }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, text: &str, color: &str) -> String {
        if self.options.color {
            format!("{}{}{}", color, text, RESET)
        } else {
            text.to_string()
        }
    }

    fn write_mismatch(&mut self, expected: &ExpectedRecord, actual: &CapturedOutcome) -> Result<()> {
        if !self.options.echo_command {
            writeln!(self.out, "    COMMAND: {}", actual.command())?;
        }

        match actual {
            CapturedOutcome::Completed { stdout, stderr, returncode, .. } => {
                for (label, want, got) in [
                    ("STDOUT", &expected.stdout, stdout),
                    ("STDERR", &expected.stderr, stderr),
                ] {
                    if want != got {
                        writeln!(self.out, "    {} EXPECTED: {:?}", label, want)?;
                        writeln!(self.out, "    {} ACTUAL:   {:?}", label, got)?;
                    }
                }
                if expected.returncode != *returncode {
                    writeln!(self.out, "    RETURNCODE EXPECTED: {}", expected.returncode)?;
                    writeln!(self.out, "    RETURNCODE ACTUAL:   {}", returncode)?;
                }
            }
            CapturedOutcome::Failed { cause, .. } => {
                writeln!(self.out, "    ERROR: {}", cause)?;
            }
        }
        Ok(())
    }
}

impl<W: Write> Reporter for HumanReporter<W> {
    fn test_result(&mut self, result: &TestResult) -> Result<()> {
        let passed = result.passed();
        if self.options.fail_only && (passed || result.skipped()) {
            return Ok(());
        }

        write!(self.out, "TEST: '{}'... ", result.test_case.display())?;
        match &result.verdict {
            Verdict::Skipped(reason) => {
                let status = self.paint("SKIP", YELLOW);
                writeln!(self.out, "{} ({}: {})", status, reason, result.record_path.display())?;
            }
            Verdict::Executed { expected, actual } => {
                let status = if passed { self.paint("OK", GREEN) } else { self.paint("FAIL", RED) };
                writeln!(self.out, "{}", status)?;
                if self.options.echo_command {
                    writeln!(self.out, "    $ {}", actual.command())?;
                }
                if !passed {
                    self.write_mismatch(expected, actual)?;
                }
            }
        }

        self.out.flush()?;
        Ok(())
    }

    fn update_result(&mut self, result: &UpdateResult) -> Result<()> {
        let record = result.record_path.display();
        write!(self.out, "UPDATE: '{}'... ", result.test_case.display())?;
        match &result.action {
            UpdateAction::Written(_) => {
                let status = self.paint("WROTE", GREEN);
                writeln!(self.out, "{} {}", status, record)?;
            }
            UpdateAction::Kept => {
                let status = self.paint("KEPT", YELLOW);
                writeln!(self.out, "{} {} (record exists)", status, record)?;
            }
            UpdateAction::NotWritten(outcome) => {
                let status = self.paint("NOT WRITTEN", RED);
                writeln!(self.out, "{}", status)?;
                if let CapturedOutcome::Failed { cause, .. } = outcome {
                    writeln!(self.out, "    ERROR: {}", cause)?;
                }
            }
            UpdateAction::WriteFailed(detail) => {
                let status = self.paint("NOT WRITTEN", RED);
                writeln!(self.out, "{}", status)?;
                writeln!(self.out, "    ERROR: {}", detail)?;
            }
        }

        if self.options.echo_command {
            if let UpdateAction::NotWritten(outcome) = &result.action {
                writeln!(self.out, "    $ {}", outcome.command())?;
            }
        }

        self.out.flush()?;
        Ok(())
    }

    fn run_summary(&mut self, summary: &RunSummary) -> Result<()> {
        let line = format!("{}/{} tests passed", summary.passed, summary.total);
        let color = if summary.all_passed() { GREEN } else { RED };
        let line = self.paint(&line, color);
        write!(self.out, "{}", line)?;
        if summary.skipped > 0 {
            write!(self.out, " ({} skipped)", summary.skipped)?;
        }
        writeln!(self.out)?;

        if let Some(true) = summary.interrupted {
            writeln!(self.out, "Run interrupted by user")?;
        }
        Ok(())
    }

    fn update_summary(&mut self, summary: &UpdateSummary) -> Result<()> {
        write!(self.out, "{} records written", summary.written)?;
        if summary.kept > 0 {
            write!(self.out, ", {} kept", summary.kept)?;
        }
        if summary.failed > 0 {
            write!(self.out, ", {} not written", summary.failed)?;
        }
        writeln!(self.out)?;

        if let Some(true) = summary.interrupted {
            writeln!(self.out, "Run interrupted by user")?;
        }
        Ok(())
    }
}

/// One JSON object per line: a line per test, then a summary line
pub struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, value: &serde_json::Value) -> Result<()> {
        writeln!(self.out, "{}", value)?;
        self.out.flush()?;
        Ok(())
    }
}

fn outcome_json(outcome: &CapturedOutcome) -> serde_json::Value {
    match outcome {
        CapturedOutcome::Completed { stdout, stderr, returncode, command } => json!({
            "status": "completed",
            "command": command,
            "stdout": stdout,
            "stderr": stderr,
            "returncode": returncode,
        }),
        CapturedOutcome::Failed { command, cause } => json!({
            "status": "failed",
            "command": command,
            "error": cause.to_string(),
        }),
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn test_result(&mut self, result: &TestResult) -> Result<()> {
        let mut event = json!({
            "event": EVENT_TEST_RESULT,
            "test": result.test_case.display().to_string(),
            "record": result.record_path.display().to_string(),
        });

        match &result.verdict {
            Verdict::Skipped(reason) => {
                event["status"] = json!("skip");
                event["reason"] = json!(reason.to_string());
            }
            Verdict::Executed { expected, actual } => {
                event["status"] = json!(if result.passed() { "pass" } else { "fail" });
                event["expected"] = serde_json::to_value(expected)?;
                event["actual"] = outcome_json(actual);
            }
        }

        self.emit(&event)
    }

    fn update_result(&mut self, result: &UpdateResult) -> Result<()> {
        let mut event = json!({
            "event": EVENT_RECORD_UPDATE,
            "test": result.test_case.display().to_string(),
            "record": result.record_path.display().to_string(),
        });

        match &result.action {
            UpdateAction::Written(record) => {
                event["status"] = json!("written");
                event["written"] = serde_json::to_value(record)?;
            }
            UpdateAction::Kept => event["status"] = json!("kept"),
            UpdateAction::NotWritten(outcome) => {
                event["status"] = json!("not_written");
                event["actual"] = outcome_json(outcome);
            }
            UpdateAction::WriteFailed(detail) => {
                event["status"] = json!("not_written");
                event["error"] = json!(detail);
            }
        }

        self.emit(&event)
    }

    fn run_summary(&mut self, summary: &RunSummary) -> Result<()> {
        let mut event = serde_json::to_value(summary)?;
        event["event"] = json!(EVENT_SUMMARY);
        event["finished_at"] = json!(chrono::Utc::now().to_rfc3339());
        self.emit(&event)
    }

    fn update_summary(&mut self, summary: &UpdateSummary) -> Result<()> {
        let mut event = serde_json::to_value(summary)?;
        event["event"] = json!(EVENT_SUMMARY);
        event["finished_at"] = json!(chrono::Utc::now().to_rfc3339());
        self.emit(&event)
    }
}

fn interrupted_marker(flag: Option<&AtomicBool>) -> Option<bool> {
    flag.filter(|f| f.load(Ordering::Relaxed)).map(|_| true)
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Drain a comparison stream into the reporter and tally it
pub fn aggregate_checks<I>(
    results: I,
    reporter: &mut dyn Reporter,
    interrupted: Option<&AtomicBool>,
) -> Result<RunSummary>
where
    I: Iterator<Item = TestResult>,
{
    let start = Instant::now();
    let mut summary = RunSummary::default();

    for result in results {
        if result.skipped() {
            summary.skipped += 1;
        } else {
            summary.total += 1;
            if result.passed() {
                summary.passed += 1;
            } else {
                summary.failed += 1;
            }
        }
        reporter.test_result(&result)?;
    }

    summary.duration_ms = elapsed_ms(start);
    summary.interrupted = interrupted_marker(interrupted);
    reporter.run_summary(&summary)?;
    Ok(summary)
}

/// Drain an update stream into the reporter and tally it
pub fn aggregate_updates<I>(
    results: I,
    reporter: &mut dyn Reporter,
    interrupted: Option<&AtomicBool>,
) -> Result<UpdateSummary>
where
    I: Iterator<Item = UpdateResult>,
{
    let start = Instant::now();
    let mut summary = UpdateSummary::default();

    for result in results {
        match result.action {
            UpdateAction::Written(_) => summary.written += 1,
            UpdateAction::Kept => summary.kept += 1,
            UpdateAction::NotWritten(_) | UpdateAction::WriteFailed(_) => summary.failed += 1,
        }
        reporter.update_result(&result)?;
    }

    summary.duration_ms = elapsed_ms(start);
    summary.interrupted = interrupted_marker(interrupted);
    reporter.update_summary(&summary)?;
    Ok(summary)
}

/// 0 iff every non-skipped test passed and the run was not interrupted
pub fn check_exit_code(summary: &RunSummary) -> i32 {
    if summary.all_passed() && summary.interrupted.is_none() {
        0
    } else {
        1
    }
}

/// Update runs succeed regardless of individual write outcomes
pub fn update_exit_code(summary: &UpdateSummary) -> i32 {
    if summary.interrupted.is_none() {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FailureCause, MissingReason};
    use std::path::PathBuf;

    fn record(stdout: &str, returncode: i32) -> ExpectedRecord {
        ExpectedRecord {
            stdout: stdout.to_string(),
            stderr: String::new(),
            returncode,
        }
    }

    fn executed(name: &str, expected: ExpectedRecord, stdout: &str, returncode: i32) -> TestResult {
        TestResult {
            test_case: PathBuf::from(format!("{}.txt", name)),
            record_path: PathBuf::from(format!("{}.rec", name)),
            verdict: Verdict::Executed {
                expected,
                actual: CapturedOutcome::Completed {
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                    returncode,
                    command: format!("prog {}.txt", name),
                },
            },
        }
    }

    fn skipped(name: &str, reason: MissingReason) -> TestResult {
        TestResult {
            test_case: PathBuf::from(format!("{}.txt", name)),
            record_path: PathBuf::from(format!("{}.rec", name)),
            verdict: Verdict::Skipped(reason),
        }
    }

    fn human(results: Vec<TestResult>, options: ReportOptions) -> (RunSummary, String) {
        let mut reporter = HumanReporter::new(Vec::new(), options);
        let summary = aggregate_checks(results.into_iter(), &mut reporter, None).unwrap();
        (summary, String::from_utf8(reporter.into_inner()).unwrap())
    }

    #[test]
    fn test_tally_excludes_skips_from_total() {
        let results = vec![
            executed("a", record("hi\n", 0), "hi\n", 0),
            skipped("b", MissingReason::NoRecord),
            executed("c", record("x", 0), "y", 0),
        ];
        let (summary, text) = human(results, ReportOptions::default());

        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total, 2);
        assert_eq!(check_exit_code(&summary), 1);
        assert!(text.contains("1/2 tests passed (1 skipped)"));
    }

    #[test]
    fn test_only_skips_is_success() {
        let results = vec![skipped("b", MissingReason::NoRecord)];
        let (summary, text) = human(results, ReportOptions::default());
        assert_eq!(summary.total, 0);
        assert_eq!(check_exit_code(&summary), 0);
        assert!(text.contains("TEST: 'b.txt'... SKIP (no record: b.rec)"));
    }

    #[test]
    fn test_failure_shows_only_differing_fields() {
        let results = vec![executed("c", record("want\n", 0), "got\n", 2)];
        let (_, text) = human(results, ReportOptions::default());

        assert!(text.contains("TEST: 'c.txt'... FAIL"));
        assert!(text.contains("COMMAND: prog c.txt"));
        assert!(text.contains("STDOUT EXPECTED: \"want\\n\""));
        assert!(text.contains("STDOUT ACTUAL:   \"got\\n\""));
        assert!(text.contains("RETURNCODE EXPECTED: 0"));
        assert!(text.contains("RETURNCODE ACTUAL:   2"));
        assert!(!text.contains("STDERR"));
    }

    #[test]
    fn test_failed_invocation_shows_cause() {
        let result = TestResult {
            test_case: PathBuf::from("t.txt"),
            record_path: PathBuf::from("t.rec"),
            verdict: Verdict::Executed {
                expected: record("", 0),
                actual: CapturedOutcome::Failed {
                    command: "sleep 9 t.txt".to_string(),
                    cause: FailureCause::Timeout { after_ms: 50 },
                },
            },
        };
        let (_, text) = human(vec![result], ReportOptions::default());
        assert!(text.contains("ERROR: timed out after 50ms"));
    }

    #[test]
    fn test_fail_only_hides_passes_and_skips() {
        let results = vec![
            executed("a", record("hi", 0), "hi", 0),
            skipped("b", MissingReason::NoRecord),
            executed("c", record("x", 0), "y", 0),
        ];
        let options = ReportOptions {
            fail_only: true,
            ..Default::default()
        };
        let (_, text) = human(results, options);
        assert!(!text.contains("a.txt"));
        assert!(!text.contains("b.txt"));
        assert!(text.contains("c.txt"));
        assert!(text.contains("1/2 tests passed"));
    }

    #[test]
    fn test_echo_command_and_color() {
        let results = vec![executed("a", record("hi", 0), "hi", 0)];
        let options = ReportOptions {
            color: true,
            echo_command: true,
            ..Default::default()
        };
        let (_, text) = human(results, options);
        assert!(text.contains("\x1b[32mOK\x1b[0m"));
        assert!(text.contains("    $ prog a.txt"));
    }

    #[test]
    fn test_json_lines_per_result_and_summary() {
        let results = vec![
            executed("a", record("hi", 0), "hi", 0),
            skipped("b", MissingReason::BadRecord { detail: "eof".to_string() }),
        ];
        let mut reporter = JsonReporter::new(Vec::new());
        aggregate_checks(results.into_iter(), &mut reporter, None).unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();

        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["status"], "pass");
        assert_eq!(lines[0]["actual"]["command"], "prog a.txt");
        assert_eq!(lines[1]["status"], "skip");
        assert_eq!(lines[1]["reason"], "bad record: eof");
        assert_eq!(lines[2]["event"], "summary");
        assert_eq!(lines[2]["passed"], 1);
        assert_eq!(lines[2]["skipped"], 1);
        assert!(lines[2]["finished_at"].is_string());
    }

    #[test]
    fn test_update_run_always_succeeds() {
        let results = vec![
            UpdateResult {
                test_case: PathBuf::from("a.txt"),
                record_path: PathBuf::from("a.rec"),
                action: UpdateAction::Written(ExpectedRecord::empty()),
            },
            UpdateResult {
                test_case: PathBuf::from("b.txt"),
                record_path: PathBuf::from("b.rec"),
                action: UpdateAction::WriteFailed("read-only file system".to_string()),
            },
        ];
        let mut reporter = HumanReporter::new(Vec::new(), ReportOptions::default());
        let summary = aggregate_updates(results.into_iter(), &mut reporter, None).unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();

        assert_eq!(summary.written, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(update_exit_code(&summary), 0);
        assert!(text.contains("UPDATE: 'a.txt'... WROTE a.rec"));
        assert!(text.contains("ERROR: read-only file system"));
        assert!(text.contains("1 records written, 1 not written"));
    }

    #[test]
    fn test_interrupted_run_fails() {
        let flag = AtomicBool::new(true);
        let mut reporter = HumanReporter::new(Vec::new(), ReportOptions::default());
        let summary = aggregate_checks(std::iter::empty(), &mut reporter, Some(&flag)).unwrap();
        assert_eq!(summary.interrupted, Some(true));
        assert_eq!(check_exit_code(&summary), 1);
    }
}
