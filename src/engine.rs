//! Triage engine: digest plus failure classification for one invocation.

use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::crash::{
    resolve_crash_type, CrashIndicators, CrashReport, CrashReportScanner, CrashType,
    IndicatorScanner, ProcessOutcome,
};
use crate::triage::{
    DebugOptions, FilterStats, LineClassifier, ModeLimits, TranscriptDetails, TranscriptFilter,
    VerbosityMode,
};

/// Transcripts shorter than this with a non-zero exit are suspicious.
pub const SILENT_FAILURE_MIN_BYTES: usize = 200;

/// Default budget for the crash report scan.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(2);

/// Per-invocation knobs.
#[derive(Debug, Clone)]
pub struct TriageOptions {
    pub mode: VerbosityMode,
    /// Override the mode's ceilings
    pub limits: Option<ModeLimits>,
    pub debug: DebugOptions,
    /// Name of the process under test, matched against crash report files
    pub process_name: Option<String>,
    /// Run start; crash reports are only correlated when this is known
    pub since: Option<SystemTime>,
    /// `None` disables crash report correlation
    pub crash_reports: Option<CrashReportScanner>,
    pub scan_timeout: Duration,
}

impl Default for TriageOptions {
    fn default() -> Self {
        Self {
            mode: VerbosityMode::default(),
            limits: None,
            debug: DebugOptions::disabled(),
            process_name: None,
            since: None,
            crash_reports: None,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }
}

impl TriageOptions {
    pub fn with_mode(mode: VerbosityMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// Everything the caller gets back.
#[derive(Debug, Clone, Serialize)]
pub struct TriageReport {
    pub mode: VerbosityMode,
    pub digest: String,
    pub stats: FilterStats,
    /// Diagnostics, failed tests and artifacts from the full transcript
    #[serde(flatten)]
    pub details: TranscriptDetails,
    pub crash_type: CrashType,
    pub crash_indicators: CrashIndicators,
    pub crash_reports: Vec<CrashReport>,
    pub silent_failure: bool,
}

/// Owns the compiled rule tables; reuse across invocations.
#[derive(Debug, Default)]
pub struct TriageEngine {
    classifier: LineClassifier,
    indicators: IndicatorScanner,
}

impl TriageEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Triage one transcript. Never fails: unreadable crash reports and
    /// trace files degrade to less information, not errors.
    pub fn triage(
        &self,
        transcript: &str,
        outcome: &ProcessOutcome,
        options: &TriageOptions,
    ) -> TriageReport {
        let provisional = CrashType::from_outcome(outcome);

        let mut filter = TranscriptFilter::new(&self.classifier, options.mode)
            .with_debug(options.debug.clone());
        if let Some(limits) = options.limits {
            filter = filter.with_limits(limits);
        }
        let filtered = filter.filter(transcript);

        let crash_indicators = self.indicators.scan(transcript);
        let crash_reports = match (&options.crash_reports, options.since) {
            (Some(scanner), Some(since)) => scanner.scan_with_deadline(
                options.process_name.as_deref(),
                since,
                options.scan_timeout,
            ),
            _ => Vec::new(),
        };

        let crash_type = resolve_crash_type(
            provisional,
            &filtered.evidence,
            &crash_indicators,
            &crash_reports,
        );
        let silent_failure = outcome.exit_code != 0
            && (transcript.len() < SILENT_FAILURE_MIN_BYTES
                || !filtered.evidence.has_terminal_marker());

        tracing::info!(
            mode = %options.mode,
            crash_type = %crash_type,
            silent_failure,
            reduction_pct = filtered.stats.reduction_percentage(),
            "triage complete"
        );

        TriageReport {
            mode: options.mode,
            digest: filtered.digest,
            stats: filtered.stats,
            details: filtered.details,
            crash_type,
            crash_indicators,
            crash_reports,
            silent_failure,
        }
    }
}
