//! Budget enforcement.
//!
//! A single forward pass that stops at the ceiling loses failures that arrive
//! late in a long run of routine output. Instead the enforcer works on the
//! fully classified stream in two phases:
//!
//! 1. **Critical** lines (errors, failing or terminal results) are reserved
//!    first. The last terminal marker of each kind is always kept; every other
//!    critical line, repeated markers included, is bounded only by a safety
//!    cap against pathological critical volume.
//! 2. **Routine** lines fill whatever line/byte budget is left, in original
//!    order, until the first line that does not fit.
//!
//! Selected lines are emitted in original order followed by at most one
//! truncation marker.

use std::borrow::Cow;
use std::collections::HashSet;

use super::config::{ModeLimits, VerbosityMode};
use super::stats::{FilterStats, RULE_BUDGET_EVICTED_CRITICAL, RULE_BUDGET_EVICTED_ROUTINE};
use super::types::{Classification, FilterDecision, LogLine};

/// Maximum critical lines reserved regardless of mode.
pub const CRITICAL_MAX_LINES: usize = 400;
/// Maximum critical bytes reserved regardless of mode.
pub const CRITICAL_MAX_BYTES: usize = 24 * 1024;

/// Suffix appended to lines cut at the per-line length cap.
const ELLIPSIS: &str = "...";

/// A line the mode policy decided to keep, awaiting budget.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub line: &'a LogLine,
    pub classification: Classification,
    pub decision: FilterDecision,
}

impl Candidate<'_> {
    pub fn is_critical(&self) -> bool {
        self.classification.is_critical()
    }
}

/// Output of the enforcer: digest lines in original order plus what was cut.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Budgeted {
    pub lines: Vec<String>,
    pub omitted_lines: usize,
    pub omitted_bytes: usize,
    pub omitted_critical: usize,
    pub marker: Option<String>,
}

/// Allocates a mode's line/byte budget across candidates.
#[derive(Debug, Clone, Copy)]
pub struct BudgetEnforcer {
    mode: VerbosityMode,
    limits: ModeLimits,
    critical_max_lines: usize,
    critical_max_bytes: usize,
}

impl BudgetEnforcer {
    pub fn new(mode: VerbosityMode) -> Self {
        Self::with_limits(mode, mode.limits())
    }

    /// Use custom ceilings (tighter budgets in tests, caller overrides).
    pub fn with_limits(mode: VerbosityMode, limits: ModeLimits) -> Self {
        Self {
            mode,
            limits,
            critical_max_lines: CRITICAL_MAX_LINES,
            critical_max_bytes: CRITICAL_MAX_BYTES,
        }
    }

    pub fn with_critical_cap(mut self, max_lines: usize, max_bytes: usize) -> Self {
        self.critical_max_lines = max_lines;
        self.critical_max_bytes = max_bytes;
        self
    }

    pub fn limits(&self) -> ModeLimits {
        self.limits
    }

    /// Select which candidates fit and render them.
    ///
    /// Updates `kept_lines`, `filtered_lines` (for evictions),
    /// `summarized_sections` and the eviction rule counters in `stats`.
    pub fn enforce(&self, candidates: &[Candidate<'_>], stats: &mut FilterStats) -> Budgeted {
        let rendered: Vec<Cow<'_, str>> = candidates
            .iter()
            .map(|c| truncate_line(&c.line.text, self.limits.max_line_length))
            .collect();
        let cost = |i: usize| rendered[i].len() + 1;

        let mut selected = vec![false; candidates.len()];
        let mut critical_lines = 0usize;
        let mut critical_bytes = 0usize;
        let mut out = Budgeted::default();

        // Phase 1a: the last terminal marker of each kind is never evicted
        let mut seen_markers = HashSet::new();
        for (i, c) in candidates.iter().enumerate().rev() {
            if c.is_critical()
                && c.classification.traits.terminal
                && seen_markers.insert(c.classification.rule)
            {
                selected[i] = true;
                critical_lines += 1;
                critical_bytes += cost(i);
            }
        }

        // Phase 1b: remaining critical lines up to the safety cap
        for (i, c) in candidates.iter().enumerate() {
            if !c.is_critical() || selected[i] {
                continue;
            }
            if critical_lines < self.critical_max_lines
                && critical_bytes + cost(i) <= self.critical_max_bytes
            {
                selected[i] = true;
                critical_lines += 1;
                critical_bytes += cost(i);
            } else {
                out.omitted_critical += 1;
                out.omitted_lines += 1;
                out.omitted_bytes += cost(i);
                stats.record_rule(RULE_BUDGET_EVICTED_CRITICAL);
            }
        }

        // Phase 2: routine lines fill what is left
        let mut lines_left = self.limits.max_lines.saturating_sub(critical_lines);
        let mut bytes_left = self.limits.max_characters.saturating_sub(critical_bytes);
        let mut exhausted = false;
        for (i, c) in candidates.iter().enumerate() {
            if c.is_critical() {
                continue;
            }
            if !exhausted && lines_left > 0 && cost(i) <= bytes_left {
                selected[i] = true;
                lines_left -= 1;
                bytes_left -= cost(i);
            } else {
                exhausted = true;
                out.omitted_lines += 1;
                out.omitted_bytes += cost(i);
                stats.record_rule(RULE_BUDGET_EVICTED_ROUTINE);
            }
        }

        for (i, c) in candidates.iter().enumerate() {
            if !selected[i] {
                continue;
            }
            if c.decision == FilterDecision::Summarize {
                stats.summarized_sections += 1;
            }
            out.lines.push(rendered[i].clone().into_owned());
        }

        stats.kept_lines += out.lines.len();
        stats.filtered_lines += out.omitted_lines;

        if out.omitted_lines > 0 {
            out.marker = Some(self.marker(&out));
        }
        out
    }

    fn marker(&self, out: &Budgeted) -> String {
        let mut marker = format!(
            "... (output truncated: {} lines / {} bytes omitted, mode={}, limit {} lines / {} chars",
            out.omitted_lines,
            out.omitted_bytes,
            self.mode,
            self.limits.max_lines,
            self.limits.max_characters
        );
        if out.omitted_critical > 0 {
            marker.push_str(&format!(
                "; {} error/failure lines over the safety cap",
                out.omitted_critical
            ));
        }
        marker.push(')');
        marker
    }
}

/// Cut `text` to at most `max_chars` characters, marking the cut.
pub fn truncate_line(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => Cow::Owned(format!("{}{}", &text[..byte_index], ELLIPSIS)),
        None => Cow::Borrowed(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::classifier::LineClassifier;
    use crate::triage::context::FilterContext;

    fn candidates<'a>(lines: &'a [LogLine], classifier: &LineClassifier) -> Vec<Candidate<'a>> {
        lines
            .iter()
            .map(|line| Candidate {
                line,
                classification: classifier.classify(line, &FilterContext::default()),
                decision: FilterDecision::Keep,
            })
            .collect()
    }

    fn tight(max_lines: usize, max_characters: usize) -> BudgetEnforcer {
        BudgetEnforcer::with_limits(
            VerbosityMode::Standard,
            ModeLimits {
                max_lines,
                max_characters,
                max_line_length: 200,
            },
        )
    }

    #[test]
    fn truncate_line_respects_char_boundaries() {
        assert_eq!(truncate_line("short", 10), "short");
        assert_eq!(truncate_line("abcdef", 3), "abc...");
        assert_eq!(truncate_line("ééééé", 2), "éé...");
    }

    #[test]
    fn everything_fits_without_marker() {
        let classifier = LineClassifier::new();
        let lines = LogLine::split("one\ntwo\nthree");
        let mut stats = FilterStats::new();
        let out = tight(10, 1000).enforce(&candidates(&lines, &classifier), &mut stats);
        assert_eq!(out.lines, vec!["one", "two", "three"]);
        assert!(out.marker.is_none());
        assert_eq!(stats.kept_lines, 3);
    }

    #[test]
    fn late_failures_survive_routine_flood() {
        let classifier = LineClassifier::new();
        let mut text = String::new();
        for i in 0..300 {
            text.push_str(&format!("Test Case 'Suite.testPass{i}' passed (0.001 seconds)\n"));
        }
        text.push_str("Test Case 'Suite.testBroken' failed (0.002 seconds)\n");
        text.push_str("** TEST FAILED **\n");
        let lines = LogLine::split(&text);
        let mut stats = FilterStats::new();

        let out = tight(20, 2_000).enforce(&candidates(&lines, &classifier), &mut stats);

        assert!(out.lines.iter().any(|l| l.contains("testBroken")));
        assert_eq!(out.lines.last().map(String::as_str), Some("** TEST FAILED **"));
        assert!(out.lines.len() <= 20);
        assert!(out.marker.as_deref().unwrap_or("").contains("mode=standard"));
        assert_eq!(stats.kept_lines + stats.filtered_lines, lines.len());
    }

    #[test]
    fn routine_fill_stops_at_first_line_that_does_not_fit() {
        let classifier = LineClassifier::new();
        let lines = LogLine::split("aaaa\nbbbbbbbbbbbbbbbbbbbb\nc");
        let mut stats = FilterStats::new();
        let out = tight(10, 8).enforce(&candidates(&lines, &classifier), &mut stats);
        assert_eq!(out.lines, vec!["aaaa"]);
        assert_eq!(out.omitted_lines, 2);
        assert_eq!(stats.rule_hits(RULE_BUDGET_EVICTED_ROUTINE), 2);
    }

    #[test]
    fn critical_cap_bounds_pathological_error_volume() {
        let classifier = LineClassifier::new();
        let mut text = String::new();
        for i in 0..50 {
            text.push_str(&format!("f.swift:{i}:1: error: broken\n"));
        }
        text.push_str("** BUILD FAILED **\n");
        let lines = LogLine::split(&text);
        let mut stats = FilterStats::new();

        let out = tight(100, 10_000)
            .with_critical_cap(10, 10_000)
            .enforce(&candidates(&lines, &classifier), &mut stats);

        // Nine errors plus the terminal marker
        assert_eq!(out.lines.len(), 10);
        assert_eq!(out.omitted_critical, 41);
        assert!(out.lines.iter().any(|l| l == "** BUILD FAILED **"));
        assert!(out.marker.as_deref().unwrap_or("").contains("safety cap"));
    }

    #[test]
    fn repeated_terminal_markers_respect_the_safety_cap() {
        let classifier = LineClassifier::new();
        let mut text = "** BUILD FAILED **\n".repeat(5_000);
        text.push_str("** TEST SUCCEEDED **\n");
        let lines = LogLine::split(&text);
        let mut stats = FilterStats::new();

        let out = BudgetEnforcer::new(VerbosityMode::Minimal)
            .enforce(&candidates(&lines, &classifier), &mut stats);

        assert_eq!(out.lines.len(), CRITICAL_MAX_LINES);
        assert_eq!(out.lines.last().map(String::as_str), Some("** TEST SUCCEEDED **"));
        assert_eq!(out.omitted_critical, 5_001 - CRITICAL_MAX_LINES);
        assert_eq!(stats.kept_lines + stats.filtered_lines, lines.len());
        assert!(out.marker.as_deref().unwrap_or("").contains("safety cap"));
    }

    #[test]
    fn last_marker_of_each_kind_survives_a_full_cap() {
        let classifier = LineClassifier::new();
        let mut text = String::new();
        for i in 0..20 {
            text.push_str(&format!("f.swift:{i}:1: error: broken\n"));
        }
        text.push_str("** BUILD FAILED **\n** TEST FAILED **\n");
        let lines = LogLine::split(&text);
        let mut stats = FilterStats::new();

        let out = tight(100, 10_000)
            .with_critical_cap(5, 10_000)
            .enforce(&candidates(&lines, &classifier), &mut stats);

        assert_eq!(out.lines.len(), 5);
        assert_eq!(
            &out.lines[3..],
            &["** BUILD FAILED **".to_string(), "** TEST FAILED **".to_string()]
        );
    }

    #[test]
    fn long_lines_are_truncated_not_dropped() {
        let classifier = LineClassifier::new();
        let long = format!("a.swift:1:1: error: {}", "x".repeat(500));
        let lines = vec![LogLine::new(&long, 0)];
        let mut stats = FilterStats::new();
        let out = tight(10, 10_000).enforce(&candidates(&lines, &classifier), &mut stats);
        assert_eq!(out.lines.len(), 1);
        assert!(out.lines[0].ends_with("..."));
        assert_eq!(out.lines[0].chars().count(), 203);
    }

    #[test]
    fn summarize_counts_as_kept() {
        let classifier = LineClassifier::new();
        let lines = LogLine::split("Test Suite 'All tests' passed at 10:00");
        let mut cands = candidates(&lines, &classifier);
        cands[0].decision = FilterDecision::Summarize;
        let mut stats = FilterStats::new();
        let out = tight(10, 1000).enforce(&cands, &mut stats);
        assert_eq!(out.lines.len(), 1);
        assert_eq!(stats.kept_lines, 1);
        assert_eq!(stats.summarized_sections, 1);
    }
}
