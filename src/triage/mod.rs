//! Transcript triage: turn a raw build/test transcript into a bounded digest.
//!
//! Every line is classified once against an ordered rule table, then a
//! per-mode policy decides whether it is kept, removed or summarized, and a
//! budget enforcer fits the survivors into the mode's line/character ceilings.
//!
//! # Guarantees
//!
//! - **Zero-loss on failures**: errors, failing test results and terminal
//!   `** ... **` markers are reserved before routine output competes for
//!   budget, so they survive in every mode.
//! - **Bounded output**: routine lines never push the digest past the mode
//!   ceiling; a single marker line states what was cut.
//! - **Accounting**: `total_lines == kept_lines + filtered_lines`.
//!
//! # Module Structure
//!
//! - [`config`] - Verbosity modes and their ceilings
//! - [`classifier`] - Line classification rules
//! - [`context`] - Build-phase/blank-run tracking across lines
//! - [`policy`] - Per-mode Keep/Remove/Summarize tables
//! - [`budget`] - Critical-first budget allocation
//! - [`details`] - Diagnostics, failed tests and artifacts as structured data
//! - [`filter`] - Orchestration into a digest
//! - [`debug`] - Optional on-disk decision trace

mod ansi;
pub mod budget;
pub mod classifier;
pub mod config;
pub mod context;
pub mod debug;
pub mod details;
pub mod filter;
pub mod policy;
pub mod stats;
pub mod types;

pub use ansi::strip_ansi;
pub use budget::{BudgetEnforcer, CRITICAL_MAX_BYTES, CRITICAL_MAX_LINES};
pub use classifier::LineClassifier;
pub use config::{ModeLimits, ParseModeError, VerbosityMode};
pub use context::FilterContext;
pub use debug::{DebugOptions, DebugTrace};
pub use details::{
    Diagnostic, DetailExtractor, FailedTest, Severity, TestCounts, TranscriptDetails,
    MAX_DETAIL_ITEMS,
};
pub use filter::{FilteredDigest, TranscriptEvidence, TranscriptFilter};
pub use policy::ModePolicy;
pub use stats::FilterStats;
pub use types::{Classification, FilterDecision, LineClass, LineTraits, LogLine};
