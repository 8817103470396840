//! xctriage - output triage for xcodebuild transcripts.
//!
//! Converts unbounded, noisy build/test output into a bounded digest that
//! keeps errors, warnings, final results and failing test identities, and
//! classifies how the run ended (reported failure vs. crash).

pub mod capture;
pub mod cli;
pub mod config;
pub mod crash;
pub mod engine;
pub mod triage;

pub use config::Config;
pub use crash::{CrashIndicators, CrashReport, CrashReportScanner, CrashType, ProcessOutcome};
pub use engine::{TriageEngine, TriageOptions, TriageReport, SILENT_FAILURE_MIN_BYTES};
pub use triage::{Diagnostic, FilterStats, TranscriptDetails, VerbosityMode};
