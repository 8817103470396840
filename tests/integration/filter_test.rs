//! End-to-end digest behavior through the public engine API.

use xctriage::triage::{LineClassifier, ModeLimits, TranscriptFilter};
use xctriage::{CrashType, ProcessOutcome, TriageEngine, TriageOptions, TriageReport, VerbosityMode};

use crate::helpers::{load_fixture, xctest_run};

fn triage(transcript: &str, exit_code: i32, mode: VerbosityMode) -> TriageReport {
    TriageEngine::new().triage(
        transcript,
        &ProcessOutcome::exited(exit_code),
        &TriageOptions::with_mode(mode),
    )
}

// ============================================================================
// Build transcripts
// ============================================================================

#[test]
fn minimal_build_failure_keeps_only_the_signal() {
    let report = triage(&load_fixture("build_failed.log"), 65, VerbosityMode::Minimal);

    assert!(report.digest.contains("error: cannot find 'DetailView' in scope"));
    assert!(report.digest.contains("The following build commands failed:"));
    assert!(report.digest.contains("** BUILD FAILED **"));
    assert!(!report.digest.contains("warning:"));
    assert!(!report.digest.contains("note:"));
    assert!(!report.digest.contains("-Xfrontend"));
    assert_eq!(report.crash_type, CrashType::BuildFailure);
}

#[test]
fn standard_build_failure_adds_warnings_and_context() {
    let report = triage(&load_fixture("build_failed.log"), 65, VerbosityMode::Standard);

    assert!(report.digest.contains("warning: variable 'count' was never mutated"));
    assert!(report.digest.contains("=== BUILD TARGET App"));
    assert!(report.digest.contains("Resolved source packages:"));
    assert!(!report.digest.contains("CodeSign"));
    assert!(!report.digest.contains("note: Using new build system"));
    assert!(report.stats.is_consistent());
}

#[test]
fn successful_build_reduces_to_the_marker() {
    let report = triage(&load_fixture("build_succeeded.log"), 0, VerbosityMode::Minimal);
    assert_eq!(report.digest.trim(), "** BUILD SUCCEEDED **");
    assert_eq!(report.crash_type, CrashType::None);
    assert!(!report.silent_failure);
}

#[test]
fn minimal_note_scenario() {
    let report = triage(
        "** BUILD SUCCEEDED **\nnote: Using new build system\n",
        0,
        VerbosityMode::Minimal,
    );
    assert_eq!(report.digest, "** BUILD SUCCEEDED **\n");
    assert_eq!(report.stats.total_lines, 2);
    assert_eq!(report.stats.filtered_lines, 1);
}

// ============================================================================
// Test transcripts
// ============================================================================

#[test]
fn failing_tests_survive_every_mode() {
    let transcript = xctest_run(377, 8);
    for mode in [VerbosityMode::Minimal, VerbosityMode::Standard, VerbosityMode::Verbose] {
        let report = triage(&transcript, 65, mode);
        for i in 0..8 {
            assert!(
                report.digest.contains(&format!("testConflict{i}]' failed")),
                "{mode}: missing testConflict{i}"
            );
        }
        assert!(report.digest.contains("** TEST FAILED **"), "{mode}");
        assert!(report.stats.is_consistent(), "{mode}");
        assert_eq!(report.crash_type, CrashType::TestFailure, "{mode}");
    }
}

#[test]
fn late_failure_survives_tight_ceiling() {
    let mut transcript = String::new();
    for i in 0..500 {
        transcript.push_str(&format!(
            "Test Case '-[AppTests.FastTests testFast{i}]' passed (0.001 seconds).\n"
        ));
    }
    transcript.push_str("Test Case '-[AppTests.SlowTests testTimeoutHandling]' failed (5.000 seconds).\n");

    let classifier = LineClassifier::new();
    let limits = ModeLimits {
        max_lines: 50,
        ..VerbosityMode::Standard.limits()
    };
    let out = TranscriptFilter::new(&classifier, VerbosityMode::Standard)
        .with_limits(limits)
        .filter(&transcript);

    assert!(out.digest.contains("testTimeoutHandling"));
    assert!(out.stats.kept_lines <= 50);
    assert_eq!(out.stats.total_lines, 501);
    assert!(out.stats.is_consistent());
}

#[test]
fn verbose_is_identity_on_short_clean_input() {
    let transcript = "Building App\nCompiling AppDelegate.swift\n\nLinking App\n** BUILD SUCCEEDED **\n";
    let report = triage(transcript, 0, VerbosityMode::Verbose);
    assert_eq!(report.digest, transcript);
}

#[test]
fn colored_output_is_stripped() {
    let transcript = "\x1b[1;31merror:\x1b[0m no such module 'Foo'\n\x1b[1m** BUILD FAILED **\x1b[0m\n";
    let report = triage(transcript, 65, VerbosityMode::Minimal);
    assert_eq!(report.digest, "error: no such module 'Foo'\n** BUILD FAILED **\n");
}

#[test]
fn every_mode_respects_its_character_ceiling() {
    let transcript = xctest_run(5_000, 2);
    for mode in [VerbosityMode::Minimal, VerbosityMode::Standard, VerbosityMode::Verbose] {
        let report = triage(&transcript, 65, mode);
        let limits = mode.limits();
        assert!(
            report.digest.len() <= limits.max_characters + 200,
            "{mode}: {} chars",
            report.digest.len()
        );
        assert!(report.stats.kept_lines <= limits.max_lines, "{mode}");
    }
}

// ============================================================================
// Crash classification from transcript evidence
// ============================================================================

#[test]
fn fatal_error_in_test_run_upgrades_exit_65() {
    let report = triage(&load_fixture("test_crash.log"), 65, VerbosityMode::Minimal);
    assert_eq!(report.crash_type, CrashType::FatalError);
    assert!(report.crash_indicators.fatal_error_detected);
    assert!(report.crash_indicators.early_exit);
    assert!(report.digest.contains("Fatal error: Unexpectedly found nil"));
}

#[test]
fn signal_beats_transcript_evidence() {
    let report = TriageEngine::new().triage(
        &load_fixture("test_crash.log"),
        &ProcessOutcome::signaled("SIGSEGV"),
        &TriageOptions::with_mode(VerbosityMode::Standard),
    );
    assert_eq!(report.crash_type, CrashType::SegFault);
}

#[test]
fn empty_failing_run_is_silent_failure() {
    let report = triage("", 1, VerbosityMode::Standard);
    assert!(report.silent_failure);
    assert_eq!(report.digest, "");
    assert_eq!(report.crash_type, CrashType::BuildFailure);
}
