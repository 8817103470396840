//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::triage::VerbosityMode;

#[cfg(not(feature = "release"))]
const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_SHA"),
    " ",
    env!("XCTRIAGE_BUILD_DATE"),
    ")"
);

#[cfg(feature = "release")]
const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("XCTRIAGE_BUILD_DATE"),
    ")"
);

/// Triage xcodebuild output into bounded digests and classify failures.
#[derive(Debug, Parser)]
#[command(name = "xctriage", version, long_version = LONG_VERSION)]
#[command(about = "Triage xcodebuild output into bounded digests and classify failures")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Filter a captured transcript (file or stdin)
    Filter(FilterArgs),

    /// Run a command, capture its output and triage it
    Run(RunArgs),

    /// List recent crash reports of simulator and test processes
    Crashes(CrashesArgs),

    /// Show configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options shared by `filter` and `run`.
#[derive(Debug, Clone, clap::Args)]
pub struct OutputArgs {
    /// Verbosity mode: minimal, standard or verbose (default from config)
    #[arg(short, long)]
    pub mode: Option<VerbosityMode>,

    /// Print the full report as JSON
    #[arg(long)]
    pub json: bool,

    /// Write a per-line decision trace (see XCTRIAGE_FILTER_DEBUG_DIR)
    #[arg(long)]
    pub debug: bool,

    /// Process name to match against crash report files
    #[arg(long, value_name = "NAME")]
    pub process_name: Option<String>,

    /// Do not correlate OS crash reports
    #[arg(long)]
    pub no_crash_reports: bool,
}

#[derive(Debug, clap::Args)]
pub struct FilterArgs {
    /// Transcript file (reads stdin when omitted)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Exit code of the process that produced the transcript
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub exit_code: i32,

    /// Terminating signal (SIGSEGV, SEGV, segv or a number)
    #[arg(long)]
    pub signal: Option<String>,

    /// The process dumped core
    #[arg(long)]
    pub core_dumped: bool,

    /// The process was killed after a timeout
    #[arg(long)]
    pub timed_out: bool,

    /// The process was canceled
    #[arg(long)]
    pub canceled: bool,

    /// Run start (RFC 3339); enables crash report correlation
    #[arg(long, value_name = "TIME")]
    pub since: Option<String>,
}

#[derive(Debug, clap::Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub output: OutputArgs,

    /// Kill the command after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Command and arguments
    #[arg(last = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

#[derive(Debug, clap::Args)]
pub struct CrashesArgs {
    /// Also match reports of this process
    #[arg(short, long, value_name = "NAME")]
    pub process: Option<String>,

    /// Look back this many minutes
    #[arg(long, default_value_t = 60)]
    pub minutes: u64,

    /// Print reports as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration as TOML
    Show,
}
