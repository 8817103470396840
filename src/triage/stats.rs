//! Filter statistics.

use std::collections::BTreeMap;

use serde::Serialize;

/// Rule name recorded when budget pressure evicts a routine line.
pub const RULE_BUDGET_EVICTED_ROUTINE: &str = "budget-evicted-routine";
/// Rule name recorded when the critical safety cap evicts a line.
pub const RULE_BUDGET_EVICTED_CRITICAL: &str = "budget-evicted-critical";

/// Counts for one triage run.
///
/// Invariant: `total_lines == kept_lines + filtered_lines`. Summarized lines
/// are counted inside `kept_lines`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub total_lines: usize,
    pub kept_lines: usize,
    pub filtered_lines: usize,
    pub summarized_sections: usize,
    pub rule_hit_counts: BTreeMap<String, usize>,
}

impl FilterStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one hit for a classification rule.
    pub fn record_rule(&mut self, rule: &str) {
        *self.rule_hit_counts.entry(rule.to_string()).or_insert(0) += 1;
    }

    pub fn rule_hits(&self, rule: &str) -> usize {
        self.rule_hit_counts.get(rule).copied().unwrap_or(0)
    }

    /// Share of input lines that did not make it into the digest, in percent.
    pub fn reduction_percentage(&self) -> f64 {
        if self.total_lines == 0 {
            return 0.0;
        }
        self.filtered_lines as f64 / self.total_lines as f64 * 100.0
    }

    pub fn is_consistent(&self) -> bool {
        self.total_lines == self.kept_lines + self.filtered_lines
    }
}
