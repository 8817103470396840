//! Data structures shared by the triage pipeline.

use serde::Serialize;

use super::ansi::strip_ansi;

/// A single line of a transcript.
///
/// `text` has trailing `\r` and ANSI escape sequences removed; `trimmed_text`
/// is `text` without surrounding whitespace. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub text: String,
    pub trimmed_text: String,
    pub original_index: usize,
}

impl LogLine {
    pub fn new(raw: &str, original_index: usize) -> Self {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        let text = strip_ansi(raw);
        let trimmed_text = text.trim().to_string();
        Self {
            text,
            trimmed_text,
            original_index,
        }
    }

    /// Split a transcript into lines, numbering them from zero.
    pub fn split(transcript: &str) -> Vec<LogLine> {
        transcript
            .lines()
            .enumerate()
            .map(|(index, line)| LogLine::new(line, index))
            .collect()
    }

    pub fn is_blank(&self) -> bool {
        self.trimmed_text.is_empty()
    }
}

/// Semantic category of a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineClass {
    Error,
    Warning,
    BuildResult,
    TestResult,
    CleanResult,
    ArtifactPath,
    ProgressIndicator,
    ConfigInfo,
    FrameworkNoise,
    VerboseCompilation,
    CompilationNoise,
    Plain,
    Blank,
}

impl LineClass {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::BuildResult => "build_result",
            Self::TestResult => "test_result",
            Self::CleanResult => "clean_result",
            Self::ArtifactPath => "artifact_path",
            Self::ProgressIndicator => "progress_indicator",
            Self::ConfigInfo => "config_info",
            Self::FrameworkNoise => "framework_noise",
            Self::VerboseCompilation => "verbose_compilation",
            Self::CompilationNoise => "compilation_noise",
            Self::Plain => "plain",
            Self::Blank => "blank",
        }
    }
}

/// Extra facts a rule attaches to a classified line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineTraits {
    /// `** X SUCCEEDED **` / `** X FAILED **`
    pub terminal: bool,
    /// The line reports a failure (failed test, failed suite, non-zero failure count)
    pub failing: bool,
    /// Whole-run suite pass/fail or the "Executed N tests" line closing it
    pub suite_summary: bool,
    /// Compiler-internal flag soup that even verbose mode drops
    pub internal_flags: bool,
}

/// Result of classifying one line: its class, the rule that matched, and traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub class: LineClass,
    pub rule: &'static str,
    pub traits: LineTraits,
}

impl Classification {
    pub fn new(class: LineClass, rule: &'static str) -> Self {
        Self {
            class,
            rule,
            traits: LineTraits::default(),
        }
    }

    /// Whether budget pressure must never evict this line.
    pub fn is_critical(&self) -> bool {
        match self.class {
            LineClass::Error => true,
            LineClass::BuildResult | LineClass::CleanResult => self.traits.terminal,
            LineClass::TestResult => self.traits.terminal || self.traits.failing,
            _ => false,
        }
    }
}

/// What the mode policy wants done with a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Keep,
    Remove,
    /// Reserved for condensation; currently kept verbatim.
    Summarize,
}

impl FilterDecision {
    pub fn keeps(&self) -> bool {
        !matches!(self, Self::Remove)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Keep => "KEEP",
            Self::Remove => "REMOVE",
            Self::Summarize => "SUMMARIZE",
        }
    }
}
