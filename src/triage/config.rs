//! Verbosity modes and the limits bound to them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How much of a transcript survives triage.
///
/// Every mode enforces ceilings; verbose only bounds them more generously.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerbosityMode {
    /// Errors, terminal results and whole-suite summaries
    Minimal,
    /// Errors, warnings, all results, test detail and select progress/config
    #[default]
    Standard,
    /// Everything except compiler-internal flag noise
    Verbose,
}

/// Size ceilings for one verbosity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeLimits {
    pub max_lines: usize,
    pub max_characters: usize,
    pub max_line_length: usize,
}

impl VerbosityMode {
    pub fn limits(&self) -> ModeLimits {
        match self {
            Self::Minimal => ModeLimits {
                max_lines: 100,
                max_characters: 5_000,
                max_line_length: 200,
            },
            Self::Standard => ModeLimits {
                max_lines: 800,
                max_characters: 40_000,
                max_line_length: 200,
            },
            Self::Verbose => ModeLimits {
                max_lines: 4_000,
                max_characters: 200_000,
                max_line_length: 1_000,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Standard => "standard",
            Self::Verbose => "verbose",
        }
    }
}

impl fmt::Display for VerbosityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognised mode string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown output mode '{0}' (expected minimal, standard or verbose)")]
pub struct ParseModeError(pub String);

impl FromStr for VerbosityMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "standard" => Ok(Self::Standard),
            "verbose" => Ok(Self::Verbose),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}
