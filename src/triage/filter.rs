//! Transcript filtering: classify, decide, budget, render.

use super::budget::{BudgetEnforcer, Budgeted, Candidate};
use super::classifier::LineClassifier;
use super::config::{ModeLimits, VerbosityMode};
use super::context::FilterContext;
use super::debug::{DebugOptions, DebugTrace};
use super::details::TranscriptDetails;
use super::policy::ModePolicy;
use super::stats::FilterStats;
use super::types::{Classification, LineClass, LogLine};

/// Facts about the whole transcript gathered while classifying, used for
/// crash-type refinement and silent-failure detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscriptEvidence {
    pub success_markers: usize,
    pub failure_markers: usize,
    pub error_lines: usize,
    pub test_lines: usize,
    pub build_failed: bool,
}

impl TranscriptEvidence {
    fn observe(&mut self, c: &Classification) {
        if c.traits.terminal {
            if c.traits.failing {
                self.failure_markers += 1;
            } else {
                self.success_markers += 1;
            }
        }
        match c.class {
            LineClass::Error => self.error_lines += 1,
            LineClass::BuildResult if c.traits.failing => self.build_failed = true,
            // `** TEST FAILED **` alone is not test activity
            LineClass::TestResult if !c.traits.terminal => self.test_lines += 1,
            _ => {}
        }
    }

    pub fn has_terminal_marker(&self) -> bool {
        self.success_markers + self.failure_markers > 0
    }
}

/// The bounded digest of one transcript.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredDigest {
    pub digest: String,
    pub stats: FilterStats,
    pub evidence: TranscriptEvidence,
    pub details: TranscriptDetails,
}

/// Runs one transcript through classifier, policy and budget.
///
/// Holds no per-run state; each call builds its own context and stats.
pub struct TranscriptFilter<'a> {
    classifier: &'a LineClassifier,
    policy: ModePolicy,
    mode: VerbosityMode,
    limits: ModeLimits,
    debug: DebugOptions,
}

impl<'a> TranscriptFilter<'a> {
    pub fn new(classifier: &'a LineClassifier, mode: VerbosityMode) -> Self {
        Self {
            classifier,
            policy: ModePolicy::new(),
            mode,
            limits: mode.limits(),
            debug: DebugOptions::disabled(),
        }
    }

    pub fn with_limits(mut self, limits: ModeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_debug(mut self, debug: DebugOptions) -> Self {
        self.debug = debug;
        self
    }

    pub fn filter(&self, transcript: &str) -> FilteredDigest {
        let mut trace = DebugTrace::open(&self.debug, self.mode);
        if let Some(trace) = trace.as_mut() {
            trace.input(transcript);
        }

        let lines = LogLine::split(transcript);
        let mut ctx = FilterContext::new();
        let mut stats = FilterStats::new();
        let mut evidence = TranscriptEvidence::default();
        let mut details = TranscriptDetails::default();
        let mut candidates = Vec::with_capacity(lines.len());

        for line in &lines {
            let classification = self.classifier.classify(line, &ctx);
            stats.record_rule(classification.rule);
            evidence.observe(&classification);
            self.classifier
                .details()
                .observe(line, &classification, &mut details);

            let decision = self.policy.decide(&classification, self.mode, &ctx);
            if let Some(trace) = trace.as_mut() {
                trace.decision(line, &classification, decision);
            }
            if decision.keeps() {
                candidates.push(Candidate {
                    line,
                    classification,
                    decision,
                });
            } else {
                stats.filtered_lines += 1;
            }

            ctx.observe(&line.text);
        }
        stats.total_lines = lines.len();

        let budgeted = BudgetEnforcer::with_limits(self.mode, self.limits)
            .enforce(&candidates, &mut stats);
        let digest = render(budgeted, transcript.ends_with('\n'));

        if let Some(trace) = trace.as_mut() {
            trace.output(transcript, &digest, &stats);
        }
        tracing::debug!(
            mode = %self.mode,
            total = stats.total_lines,
            kept = stats.kept_lines,
            filtered = stats.filtered_lines,
            "transcript filtered"
        );

        FilteredDigest {
            digest,
            stats,
            evidence,
            details,
        }
    }
}

/// Join selected lines, append the truncation marker, and keep the input's
/// trailing-newline convention.
fn render(budgeted: Budgeted, trailing_newline: bool) -> String {
    let Budgeted { mut lines, marker, .. } = budgeted;
    let truncated = marker.is_some();
    lines.extend(marker);
    if lines.is_empty() {
        return String::new();
    }
    let mut digest = lines.join("\n");
    if trailing_newline || truncated {
        digest.push('\n');
    }
    digest
}
