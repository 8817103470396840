//! Structured details pulled out of classified lines.
//!
//! The classifier already knows which lines are diagnostics, test results or
//! artifact paths. The extractor runs regex captures over exactly those lines
//! so callers get `{file, line, column, message}` records, failed test
//! identities and artifact locations without re-parsing the digest.

use std::path::PathBuf;

use regex::Regex;
use serde::Serialize;

use super::types::{Classification, LineClass, LogLine};

/// Upper bound on diagnostics and failed tests kept per transcript.
pub const MAX_DETAIL_ITEMS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A compiler or tool diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Source file or emitting tool (`xcodebuild`); absent for bare `error: ...`
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedTest {
    /// Identity as printed, e.g. `-[AppTests.LoginTests testBadPassword]`
    pub name: String,
    pub duration_secs: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TestCounts {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl TestCounts {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

/// Everything extracted from one transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TranscriptDetails {
    pub diagnostics: Vec<Diagnostic>,
    pub failed_tests: Vec<FailedTest>,
    pub test_counts: TestCounts,
    pub artifact_paths: Vec<PathBuf>,
    /// Diagnostics and failed tests dropped past [`MAX_DETAIL_ITEMS`]
    pub omitted_items: usize,
}

impl TranscriptDetails {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        if self.diagnostics.len() < MAX_DETAIL_ITEMS {
            self.diagnostics.push(diagnostic);
        } else {
            self.omitted_items += 1;
        }
    }

    fn push_failed_test(&mut self, name: &str, duration_secs: Option<f64>) {
        // Swift Testing reports an issue and then the failure for one test
        if let Some(known) = self.failed_tests.iter_mut().find(|t| t.name == name) {
            known.duration_secs = known.duration_secs.or(duration_secs);
            return;
        }
        if self.failed_tests.len() < MAX_DETAIL_ITEMS {
            self.failed_tests.push(FailedTest {
                name: name.to_string(),
                duration_secs,
            });
        } else {
            self.omitted_items += 1;
        }
    }

    fn push_artifact(&mut self, path: &str) {
        let path = PathBuf::from(path.trim());
        if !path.as_os_str().is_empty() && !self.artifact_paths.contains(&path) {
            self.artifact_paths.push(path);
        }
    }
}

/// Compiled capture patterns. Owned by [`super::LineClassifier`].
#[derive(Debug)]
pub struct DetailExtractor {
    located: Regex,
    attributed: Regex,
    bare: Regex,
    test_case: Regex,
    swift_testing_failure: Regex,
    artifact: Regex,
}

impl Default for DetailExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DetailExtractor {
    pub fn new() -> Self {
        let compile = |re: &str| {
            Regex::new(re).unwrap_or_else(|e| panic!("invalid detail pattern {re}: {e}"))
        };
        Self {
            located: compile(r"^(.+?):(\d+):(?:(\d+):)?\s*(error|warning):\s*(.+)$"),
            attributed: compile(r"^(.+?):\s*(error|warning):\s*(.+)$"),
            bare: compile(r"^(?i:fatal )?(?i)(error|warning):\s*(.+)$"),
            test_case: compile(
                r"Test Case '([^']+)' (passed|failed|skipped)(?: \((\d+(?:\.\d+)?) seconds\))?",
            ),
            swift_testing_failure: compile(
                r"^[✘✗] Test (.+?) (?:failed|recorded an issue)(?:.*? after (\d+(?:\.\d+)?) seconds)?",
            ),
            artifact: compile(r"(?:Archive path|Export path|Product Path|Exported to):\s*(.+)$"),
        }
    }

    /// Record whatever `line` contributes. Lines of other classes are ignored.
    pub fn observe(&self, line: &LogLine, c: &Classification, details: &mut TranscriptDetails) {
        let text = line.trimmed_text.as_str();
        match c.class {
            LineClass::Error | LineClass::Warning => {
                if let Some(diagnostic) = self.diagnostic(text) {
                    details.push_diagnostic(diagnostic);
                }
            }
            LineClass::TestResult => self.test_result(text, details),
            LineClass::ArtifactPath => match self.artifact.captures(text) {
                Some(caps) => details.push_artifact(&caps[1]),
                None => details.push_artifact(text),
            },
            _ => {}
        }
    }

    fn diagnostic(&self, text: &str) -> Option<Diagnostic> {
        if let Some(caps) = self.located.captures(text) {
            return Some(Diagnostic {
                severity: severity(&caps[4]),
                file: Some(caps[1].to_string()),
                line: caps[2].parse().ok(),
                column: caps.get(3).and_then(|m| m.as_str().parse().ok()),
                message: caps[5].to_string(),
            });
        }
        if let Some(caps) = self.bare.captures(text) {
            return Some(Diagnostic {
                severity: severity(&caps[1]),
                file: None,
                line: None,
                column: None,
                message: caps[2].to_string(),
            });
        }
        self.attributed.captures(text).map(|caps| Diagnostic {
            severity: severity(&caps[2]),
            file: Some(caps[1].to_string()),
            line: None,
            column: None,
            message: caps[3].to_string(),
        })
    }

    fn test_result(&self, text: &str, details: &mut TranscriptDetails) {
        if let Some(caps) = self.test_case.captures(text) {
            let duration = caps.get(3).and_then(|m| m.as_str().parse().ok());
            match &caps[2] {
                "passed" => details.test_counts.passed += 1,
                "skipped" => details.test_counts.skipped += 1,
                _ => {
                    details.test_counts.failed += 1;
                    details.push_failed_test(&caps[1], duration);
                }
            }
            return;
        }
        if let Some(caps) = self.swift_testing_failure.captures(text) {
            let duration = caps.get(2).and_then(|m| m.as_str().parse().ok());
            details.push_failed_test(&caps[1], duration);
        }
    }
}

fn severity(word: &str) -> Severity {
    if word.eq_ignore_ascii_case("warning") {
        Severity::Warning
    } else {
        Severity::Error
    }
}
