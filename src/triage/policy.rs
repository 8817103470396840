//! Mode policy: what each verbosity mode does with each line class.
//!
//! Classes come from [`super::classifier`]; this module never inspects line
//! text. Modes differ only in their decision tables.

use super::config::VerbosityMode;
use super::context::FilterContext;
use super::types::{Classification, FilterDecision, LineClass};

/// Per-mode Keep/Remove/Summarize tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModePolicy;

impl ModePolicy {
    pub fn new() -> Self {
        Self
    }

    /// Decide the fate of a classified line given the context left by the
    /// previous lines.
    pub fn decide(
        &self,
        classification: &Classification,
        mode: VerbosityMode,
        ctx: &FilterContext,
    ) -> FilterDecision {
        if classification.class == LineClass::Blank {
            return Self::blank(mode, ctx);
        }
        match mode {
            VerbosityMode::Minimal => Self::minimal(classification),
            VerbosityMode::Standard => Self::standard(classification),
            VerbosityMode::Verbose => Self::verbose(classification),
        }
    }

    /// Minimal drops every blank; the others collapse runs to one.
    fn blank(mode: VerbosityMode, ctx: &FilterContext) -> FilterDecision {
        if mode == VerbosityMode::Minimal || ctx.last_line_was_empty {
            FilterDecision::Remove
        } else {
            FilterDecision::Keep
        }
    }

    fn minimal(c: &Classification) -> FilterDecision {
        use LineClass::*;
        match c.class {
            Error | BuildResult | CleanResult => FilterDecision::Keep,
            TestResult if c.traits.terminal || c.traits.failing => FilterDecision::Keep,
            TestResult if c.traits.suite_summary => FilterDecision::Summarize,
            _ => FilterDecision::Remove,
        }
    }

    fn standard(c: &Classification) -> FilterDecision {
        use LineClass::*;
        match c.class {
            Error | Warning | BuildResult | CleanResult => FilterDecision::Keep,
            TestResult if c.traits.suite_summary && !c.traits.failing => {
                FilterDecision::Summarize
            }
            TestResult => FilterDecision::Keep,
            ArtifactPath | ProgressIndicator | ConfigInfo => FilterDecision::Keep,
            FrameworkNoise | VerboseCompilation | CompilationNoise | Plain => {
                FilterDecision::Remove
            }
            Blank => FilterDecision::Remove,
        }
    }

    fn verbose(c: &Classification) -> FilterDecision {
        if c.traits.internal_flags {
            FilterDecision::Remove
        } else {
            FilterDecision::Keep
        }
    }
}
