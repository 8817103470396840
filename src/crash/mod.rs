//! Failure taxonomy: exit codes, signals, transcript evidence and OS crash
//! reports combined into one [`CrashType`].
//!
//! - [`outcome`] - `ProcessOutcome` and the exit/signal table
//! - [`indicators`] - textual crash signatures in a transcript
//! - [`reports`] - crash report store scanning

pub mod error;
pub mod indicators;
pub mod outcome;
pub mod reports;

pub use error::CrashReportError;
pub use indicators::{CrashIndicators, IndicatorScanner};
pub use outcome::{parse_signal, signal_name, CrashType, ProcessOutcome};
pub use reports::{CrashReport, CrashReportScanner, DEFAULT_WATCH_LIST};

use crate::triage::TranscriptEvidence;

/// Refine a provisional type with transcript evidence and crash reports.
///
/// Signal-derived, timeout and cancellation types are final. Reported
/// failures (and success or unknown exits) are upgraded by the strongest
/// evidence present, in this order: Swift fatal error, runtime trap, test
/// runner/host death, simulator boot timeout, crash report.
pub fn resolve_crash_type(
    provisional: CrashType,
    evidence: &TranscriptEvidence,
    indicators: &CrashIndicators,
    reports: &[CrashReport],
) -> CrashType {
    let provisional = refine_reported_failure(provisional, evidence);
    if !provisional.is_upgradable() {
        return provisional;
    }

    let resolved = if indicators.fatal_error_detected {
        CrashType::FatalError
    } else if indicators.runtime_crash || indicators.runner_failure() {
        CrashType::TestCrash
    } else if indicators.simulator_boot_timeout {
        CrashType::SimulatorCrash
    } else if let Some(report) = reports.first() {
        if reports.iter().any(CrashReport::is_simulator) {
            CrashType::SimulatorCrash
        } else {
            tracing::debug!(process = %report.process_name, "crash report found for run");
            CrashType::TestCrash
        }
    } else {
        provisional
    };

    if resolved != provisional {
        tracing::debug!(from = %provisional, to = %resolved, "crash type upgraded");
    }
    resolved
}

/// Exit 65 also covers builds that failed before any test ran.
fn refine_reported_failure(provisional: CrashType, evidence: &TranscriptEvidence) -> CrashType {
    let failed_build = evidence.build_failed || evidence.error_lines > 0;
    if provisional == CrashType::TestFailure && failed_build && evidence.test_lines == 0 {
        CrashType::BuildFailure
    } else {
        provisional
    }
}
