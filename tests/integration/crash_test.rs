//! Crash report correlation and process capture.

use std::fs;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use xctriage::capture::{run_captured, CaptureRequest};
use xctriage::{CrashReportScanner, CrashType, ProcessOutcome, TriageEngine, TriageOptions, VerbosityMode};

use crate::helpers::{ips_report, xctest_run};

fn options_with_reports(dir: &TempDir) -> TriageOptions {
    TriageOptions {
        since: Some(SystemTime::now() - Duration::from_secs(120)),
        crash_reports: Some(CrashReportScanner::new(dir.path())),
        ..TriageOptions::with_mode(VerbosityMode::Minimal)
    }
}

// ============================================================================
// Crash report correlation
// ============================================================================

#[test]
fn simulator_crash_report_upgrades_unknown_exit() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("launchd_sim-2024-01-15-103100.ips"),
        ips_report("launchd_sim", "EXC_CRASH", "SIGABRT"),
    )
    .unwrap();

    let report = TriageEngine::new().triage(
        "Testing started\n",
        &ProcessOutcome::exited(2),
        &options_with_reports(&dir),
    );

    assert_eq!(report.crash_reports.len(), 1);
    assert_eq!(report.crash_reports[0].process_name, "launchd_sim");
    assert_eq!(report.crash_type, CrashType::SimulatorCrash);
    assert!(report.silent_failure);
}

#[test]
fn app_crash_report_matched_by_process_name() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("MyApp-2024-01-15-103100.ips"),
        ips_report("MyApp", "EXC_BAD_ACCESS", "SIGSEGV"),
    )
    .unwrap();

    let engine = TriageEngine::new();
    let transcript = xctest_run(10, 1);

    let unnamed = engine.triage(&transcript, &ProcessOutcome::exited(65), &options_with_reports(&dir));
    assert!(unnamed.crash_reports.is_empty());
    assert_eq!(unnamed.crash_type, CrashType::TestFailure);

    let options = TriageOptions {
        process_name: Some("MyApp".to_string()),
        ..options_with_reports(&dir)
    };
    let named = engine.triage(&transcript, &ProcessOutcome::exited(65), &options);
    assert_eq!(named.crash_reports.len(), 1);
    assert_eq!(named.crash_reports[0].exception_type, "EXC_BAD_ACCESS");
    assert_eq!(named.crash_type, CrashType::TestCrash);
}

#[test]
fn malformed_reports_are_skipped() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("xctest-broken.ips"), "{\"procName\": ").unwrap();
    fs::write(
        dir.path().join("xctest-good.ips"),
        ips_report("xctest", "EXC_BREAKPOINT", "SIGTRAP"),
    )
    .unwrap();

    let reports = CrashReportScanner::new(dir.path()).scan(None, SystemTime::UNIX_EPOCH);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].signal.as_deref(), Some("SIGTRAP"));
}

#[test]
fn signal_types_ignore_crash_reports() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("Simulator-1.ips"),
        ips_report("Simulator", "EXC_CRASH", "SIGABRT"),
    )
    .unwrap();
    let report = TriageEngine::new().triage(
        "",
        &ProcessOutcome::signaled("KILL"),
        &options_with_reports(&dir),
    );
    assert_eq!(report.crash_reports.len(), 1);
    assert_eq!(report.crash_type, CrashType::Killed);
}

// ============================================================================
// Capture
// ============================================================================

#[cfg(unix)]
#[test]
fn captured_run_feeds_the_engine() {
    let script = "echo '=== BUILD TARGET App OF PROJECT App ==='; \
                  echo 'main.swift:1:1: error: expected expression' >&2; \
                  echo '** BUILD FAILED **'; exit 65";
    let run = run_captured(&CaptureRequest::new("sh").args(["-c", script])).unwrap();
    let transcript = run.transcript.combined();

    let report = TriageEngine::new().triage(
        &transcript,
        &run.outcome,
        &TriageOptions::with_mode(VerbosityMode::Minimal),
    );
    assert!(report.digest.contains("error: expected expression"));
    assert!(report.digest.contains("** BUILD FAILED **"));
    assert_eq!(report.crash_type, CrashType::BuildFailure);
}

#[cfg(unix)]
#[test]
fn timed_out_run_is_timeout() {
    let request = CaptureRequest::new("sh")
        .args(["-c", "echo waiting; exec sleep 30"])
        .timeout(Duration::from_millis(200));
    let run = run_captured(&request).unwrap();
    let report = TriageEngine::new().triage(
        &run.transcript.combined(),
        &run.outcome,
        &TriageOptions::default(),
    );
    assert_eq!(report.crash_type, CrashType::Timeout);
    assert!(report.crash_type.is_crash());
}
