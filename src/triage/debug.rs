//! Diagnostic trace side channel.
//!
//! When enabled, every run writes a timestamped log of input stats, per-line
//! decisions and output stats to a file. The trace is write-only: failures
//! to open or write it are logged and otherwise ignored, and nothing here
//! feeds back into the digest.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use humansize::{format_size, BINARY};

use super::config::VerbosityMode;
use super::stats::FilterStats;
use super::types::{Classification, FilterDecision, LogLine};

/// Environment variable that enables tracing (`true`).
pub const DEBUG_ENV: &str = "XCTRIAGE_FILTER_DEBUG";
/// Environment variable naming the trace directory.
pub const DEBUG_DIR_ENV: &str = "XCTRIAGE_FILTER_DEBUG_DIR";

/// Characters of input/output echoed into the trace.
const PREVIEW_CHARS: usize = 1000;

/// Where (and whether) to write traces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugOptions {
    pub enabled: bool,
    pub directory: Option<PathBuf>,
}

impl DebugOptions {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn to_dir(directory: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            directory: Some(directory.into()),
        }
    }

    /// Apply `XCTRIAGE_FILTER_DEBUG` / `XCTRIAGE_FILTER_DEBUG_DIR` on top of `self`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var(DEBUG_ENV) {
            self.enabled = value.eq_ignore_ascii_case("true") || value == "1";
        }
        if let Ok(dir) = std::env::var(DEBUG_DIR_ENV) {
            if !dir.is_empty() {
                self.directory = Some(PathBuf::from(dir));
            }
        }
        self
    }

    fn resolved_dir(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// An open trace file for one run.
pub struct DebugTrace {
    path: PathBuf,
    writer: BufWriter<File>,
    failed: bool,
}

impl DebugTrace {
    /// Open a trace file for `mode`, or `None` if tracing is off or the file
    /// cannot be created.
    pub fn open(options: &DebugOptions, mode: VerbosityMode) -> Option<Self> {
        if !options.enabled {
            return None;
        }
        let dir = options.resolved_dir();
        let path = dir.join(format!(
            "xctriage_filter_{}_{}.log",
            mode,
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        match File::create(&path) {
            Ok(file) => {
                tracing::info!(path = %path.display(), "filter debug trace enabled");
                let mut trace = Self {
                    path,
                    writer: BufWriter::new(file),
                    failed: false,
                };
                trace.log(format_args!("=== Filter Debug Log Started ==="));
                trace.log(format_args!("Mode: {}", mode));
                trace.log(format_args!("Time: {}", Local::now().to_rfc3339()));
                Some(trace)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot create filter debug trace");
                None
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log(&mut self, args: std::fmt::Arguments<'_>) {
        if self.failed {
            return;
        }
        let stamp = Local::now().format("%H:%M:%S%.3f");
        if let Err(e) = writeln!(self.writer, "[{}] {}", stamp, args) {
            tracing::warn!(path = %self.path.display(), error = %e, "filter debug trace write failed");
            self.failed = true;
        }
    }

    pub fn input(&mut self, transcript: &str) {
        self.log(format_args!("=== Filter Input Stats ==="));
        self.log(format_args!(
            "Total input length: {} chars ({})",
            transcript.len(),
            format_size(transcript.len(), BINARY)
        ));
        self.log(format_args!("Estimated input tokens: {}", transcript.len() / 4));
        self.log(format_args!("Total input lines: {}", transcript.lines().count()));
        self.log(format_args!("First {} chars: {}", PREVIEW_CHARS, preview(transcript)));
    }

    pub fn decision(
        &mut self,
        line: &LogLine,
        classification: &Classification,
        decision: FilterDecision,
    ) {
        self.log(format_args!(
            "#{} {} rule={} class={}{} | {}",
            line.original_index,
            decision.name(),
            classification.rule,
            classification.class.name(),
            if classification.is_critical() { " critical" } else { "" },
            preview(&line.text)
        ));
    }

    pub fn output(&mut self, transcript: &str, digest: &str, stats: &FilterStats) {
        self.log(format_args!("=== Filter Output Stats ==="));
        self.log(format_args!("Input lines: {}", stats.total_lines));
        self.log(format_args!("Output lines: {}", stats.kept_lines));
        self.log(format_args!("Filtered lines: {}", stats.filtered_lines));
        self.log(format_args!("Summarized sections: {}", stats.summarized_sections));
        self.log(format_args!(
            "Output length: {} chars ({})",
            digest.len(),
            format_size(digest.len(), BINARY)
        ));
        self.log(format_args!("Estimated output tokens: {}", digest.len() / 4));
        if !transcript.is_empty() {
            let reduction = (1.0 - digest.len() as f64 / transcript.len() as f64) * 100.0;
            self.log(format_args!("Reduction: {:.1}%", reduction));
        }
        for (rule, hits) in &stats.rule_hit_counts {
            self.log(format_args!("Rule {}: {}", rule, hits));
        }
        self.log(format_args!("First {} chars of output: {}", PREVIEW_CHARS, preview(digest)));
        self.log(format_args!("=== End Filter ==="));
        if let Err(e) = self.writer.flush() {
            tracing::warn!(path = %self.path.display(), error = %e, "filter debug trace flush failed");
        }
    }
}

fn preview(s: &str) -> std::borrow::Cow<'_, str> {
    super::budget::truncate_line(s, PREVIEW_CHARS)
}
