//! Subcommand handlers.

pub mod completions;
pub mod config;
pub mod crashes;
pub mod filter;
pub mod run;

use std::time::SystemTime;

use anyhow::Result;
use humansize::{format_size, BINARY};

use xctriage::cli::OutputArgs;
use xctriage::{Config, TriageOptions, TriageReport};

/// Merge config defaults with command-line flags.
pub(crate) fn triage_options(
    config: &Config,
    args: &OutputArgs,
    since: Option<SystemTime>,
) -> TriageOptions {
    let mut debug = config.triage.debug_options();
    if args.debug {
        debug.enabled = true;
    }
    TriageOptions {
        mode: args.mode.unwrap_or(config.triage.default_mode),
        limits: None,
        debug,
        process_name: args.process_name.clone(),
        since,
        crash_reports: if args.no_crash_reports {
            None
        } else {
            config.crash_reports.scanner()
        },
        scan_timeout: config.crash_reports.scan_timeout(),
    }
}

/// Digest on stdout, summary on stderr; or the whole report as JSON.
pub(crate) fn print_report(report: &TriageReport, input_bytes: usize, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    print!("{}", report.digest);
    if !report.digest.is_empty() && !report.digest.ends_with('\n') {
        println!();
    }

    let stats = &report.stats;
    eprintln!(
        "xctriage: {} ({}); {} of {} lines kept, {:.1}% reduced, {} -> {}",
        report.crash_type,
        report.crash_type.description(),
        stats.kept_lines,
        stats.total_lines,
        stats.reduction_percentage(),
        format_size(input_bytes, BINARY),
        format_size(report.digest.len(), BINARY),
    );
    let details = &report.details;
    if !details.diagnostics.is_empty() || !details.failed_tests.is_empty() {
        eprintln!(
            "xctriage: {} errors, {} warnings, {} failed tests",
            details.errors().count(),
            details.warnings().count(),
            details.failed_tests.len()
        );
    }
    for path in &details.artifact_paths {
        eprintln!("xctriage: artifact {}", path.display());
    }
    if report.silent_failure {
        eprintln!("xctriage: silent failure: non-zero exit without a result marker");
    }
    for crash in &report.crash_reports {
        eprintln!(
            "xctriage: crash report {} ({}) {}",
            crash.process_name,
            crash.exception_type,
            crash.file_path.display()
        );
    }
    Ok(())
}
