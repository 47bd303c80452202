//! Unit tests for data models module
//!
//! Covers the pass/skip predicates, exact comparison semantics and
//! configuration validation rules.

use super::*;

fn record(stdout: &str, stderr: &str, returncode: i32) -> ExpectedRecord {
    ExpectedRecord {
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        returncode,
    }
}

fn completed(stdout: &str, stderr: &str, returncode: i32) -> CapturedOutcome {
    CapturedOutcome::Completed {
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        returncode,
        command: "prog a.txt".to_string(),
    }
}

fn executed(expected: ExpectedRecord, actual: CapturedOutcome) -> TestResult {
    TestResult {
        test_case: PathBuf::from("a.txt"),
        record_path: PathBuf::from("a.rec"),
        verdict: Verdict::Executed { expected, actual },
    }
}

#[test]
fn test_extensions_equal_ignores_leading_dot() {
    assert!(extensions_equal("rec", ".rec"));
    assert!(extensions_equal(".rec", "rec"));
    assert!(extensions_equal("rec", "rec"));
    assert!(!extensions_equal("rec", "txt"));
    assert!(!extensions_equal("rec", "REC"));
}

#[test]
fn test_normalize_extension_strips_one_dot() {
    assert_eq!(normalize_extension(".out"), "out");
    assert_eq!(normalize_extension("out"), "out");
    assert_eq!(normalize_extension("..out"), ".out");
}

#[test]
fn test_exact_match_passes() {
    let result = executed(record("hi\n", "", 0), completed("hi\n", "", 0));
    assert!(result.passed());
    assert!(!result.skipped());
}

#[test]
fn test_any_single_field_difference_fails() {
    let expected = record("hi\n", "warn\n", 3);
    let variants = [
        completed("hi", "warn\n", 3),
        completed("hi\n", "warn", 3),
        completed("hi\n", "warn\n", 0),
    ];
    for actual in variants {
        let result = executed(expected.clone(), actual);
        assert!(!result.passed(), "{:?} should fail", result.actual());
    }
}

#[test]
fn test_failed_outcome_never_passes() {
    let expected = record("", "", 0);
    let timeout = CapturedOutcome::Failed {
        command: "sleep 5".to_string(),
        cause: FailureCause::Timeout { after_ms: 10 },
    };
    let launch = CapturedOutcome::Failed {
        command: "missing".to_string(),
        cause: FailureCause::LaunchError("not found".to_string()),
    };
    assert!(!executed(expected.clone(), timeout).passed());
    assert!(!executed(expected, launch).passed());
}

#[test]
fn test_skipped_result_has_no_actual() {
    let result = TestResult {
        test_case: PathBuf::from("b.txt"),
        record_path: PathBuf::from("b.rec"),
        verdict: Verdict::Skipped(MissingReason::NoRecord),
    };
    assert!(result.skipped());
    assert!(!result.passed());
    assert!(result.actual().is_none());
    assert_eq!(result.expected(), RecordLookup::Missing(MissingReason::NoRecord));
}

#[test]
fn test_executed_result_exposes_expected_and_actual() {
    let result = executed(record("x", "", 1), completed("x", "", 1));
    assert_eq!(result.expected(), RecordLookup::Present(record("x", "", 1)));
    assert_eq!(result.actual().map(CapturedOutcome::command), Some("prog a.txt"));
}

#[test]
fn test_outcome_to_record_drops_command() {
    assert_eq!(completed("o", "e", 2).to_record(), Some(record("o", "e", 2)));
    let failed = CapturedOutcome::Failed {
        command: "x".to_string(),
        cause: FailureCause::Timeout { after_ms: 1 },
    };
    assert_eq!(failed.to_record(), None);
}

#[test]
fn test_summary_all_passed_ignores_skips() {
    let summary = RunSummary {
        passed: 2,
        failed: 0,
        skipped: 5,
        total: 2,
        ..Default::default()
    };
    assert!(summary.all_passed());

    let empty = RunSummary::default();
    assert!(empty.all_passed());
}

#[test]
fn test_summary_interrupted_omitted_when_none() {
    let summary = RunSummary::default();
    let json = serde_json::to_value(&summary).unwrap();
    assert!(json.get("interrupted").is_none());
    assert_eq!(json["total"], 0);
}

#[test]
fn test_validate_rejects_extension_collision() {
    let config = HarnessConfig {
        test_ext: Some(".rec".to_string()),
        record_ext: "rec".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(HarnessError::ExtensionCollision { .. })
    ));
}

#[test]
fn test_validate_rejects_zero_timeout_and_jobs() {
    let config = HarnessConfig {
        timeout_ms: Some(0),
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(HarnessError::InvalidTimeout(0))));

    let config = HarnessConfig {
        timeout_ms: Some(-5),
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(HarnessError::InvalidTimeout(-5))));

    let config = HarnessConfig {
        jobs: 0,
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(HarnessError::InvalidJobs(0))));
}

#[test]
fn test_validate_rejects_empty_record_extension() {
    for ext in ["", "."] {
        let config = HarnessConfig {
            record_ext: ext.to_string(),
            ..Default::default()
        };
        assert!(
            matches!(config.validate(), Err(HarnessError::EmptyRecordExtension(_))),
            "{:?} should be rejected",
            ext
        );
    }
}

#[test]
fn test_timeout_conversion() {
    let config = HarnessConfig {
        timeout_ms: Some(250),
        ..Default::default()
    };
    assert_eq!(config.timeout(), Some(250));
    assert_eq!(HarnessConfig::default().timeout(), None);
}

#[test]
fn test_validate_rejects_empty_placeholder() {
    let config = HarnessConfig {
        placeholder: String::new(),
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(HarnessError::EmptyPlaceholder)));
}

#[test]
fn test_default_config_is_valid() {
    let config = HarnessConfig {
        test_ext: Some("txt".to_string()),
        timeout_ms: Some(1),
        ..Default::default()
    };
    assert!(config.validate().is_ok());
}
