//! `crashes` subcommand handler

use std::time::{Duration, SystemTime};

use anyhow::Result;

use xctriage::cli::CrashesArgs;
use xctriage::{Config, CrashReportScanner};

pub fn handle(args: CrashesArgs) -> Result<()> {
    let config = Config::load()?;
    let scanner = config
        .crash_reports
        .scanner()
        .unwrap_or_else(CrashReportScanner::default);
    let since = SystemTime::now()
        .checked_sub(Duration::from_secs(args.minutes.saturating_mul(60)))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let reports = scanner.scan(args.process.as_deref(), since);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    if reports.is_empty() {
        println!(
            "No crash reports in {} from the last {} minutes.",
            scanner.directory().display(),
            args.minutes
        );
        return Ok(());
    }

    for report in &reports {
        println!(
            "{}  {:<20} {:<16} {:<8} {}",
            report.timestamp.format("%Y-%m-%d %H:%M:%S"),
            report.process_name,
            report.exception_type,
            report.signal.as_deref().unwrap_or("-"),
            report.file_path.display()
        );
    }
    Ok(())
}
