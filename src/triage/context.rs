//! Per-run context tracking.
//!
//! The tracker is a tiny state machine fed one line at a time. The policy and
//! classifier read it *before* the current line is observed, so decisions for
//! line `n` see the state produced by lines `0..n`.

/// Mutable per-run state. One instance per triage invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterContext {
    pub in_build_phase: bool,
    pub current_target: String,
    /// Most recently started or finished XCTest suite; empty before the first
    pub current_suite: String,
    pub last_line_was_empty: bool,
}

impl FilterContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the state machine past `line`. Unrecognised lines only touch
    /// the blank-run flag.
    pub fn observe(&mut self, line: &str) {
        let trimmed = line.trim();
        self.last_line_was_empty = trimmed.is_empty();
        if trimmed.is_empty() {
            return;
        }

        if trimmed.starts_with("=== BUILD") && trimmed.contains("TARGET") {
            self.in_build_phase = true;
            if let Some(target) = target_name(trimmed) {
                self.current_target = target.to_string();
            }
            return;
        }

        if let Some(suite) = suite_name(trimmed) {
            self.current_suite = suite.to_string();
        }

        let build_finished = trimmed.contains("** BUILD")
            && (trimmed.contains("SUCCEEDED") || trimmed.contains("FAILED"));
        let testing_started = trimmed.starts_with("Test Suite '") && trimmed.contains("' started");
        if build_finished || testing_started {
            self.in_build_phase = false;
        }
    }

    /// Whether an `Executed N tests` line here closes the whole run rather
    /// than one test class. Summaries outside any XCTest suite count as whole.
    pub fn in_whole_run_suite(&self) -> bool {
        let suite = self.current_suite.as_str();
        suite.is_empty()
            || suite == "All tests"
            || suite == "Selected tests"
            || suite.ends_with(".xctest")
    }
}

/// Name of the suite in a `Test Suite 'Name' started|passed|failed ...` line.
fn suite_name(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("Test Suite '")?;
    let (name, tail) = rest.split_once('\'')?;
    [" started", " passed", " failed"]
        .iter()
        .any(|verb| tail.starts_with(verb))
        .then_some(name)
}

/// Token following `TARGET` in a `=== BUILD TARGET Foo OF PROJECT Bar ===` banner.
fn target_name(banner: &str) -> Option<&str> {
    let mut tokens = banner.split_whitespace();
    tokens.find(|t| *t == "TARGET")?;
    tokens.next().filter(|t| *t != "===")
}
