//! `filter` subcommand handler

use std::fs;
use std::io::{self, Read};
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::DateTime;

use xctriage::cli::FilterArgs;
use xctriage::{Config, ProcessOutcome, TriageEngine};

use super::{print_report, triage_options};

pub fn handle(args: FilterArgs) -> Result<()> {
    let bytes = match &args.file {
        Some(path) => fs::read(path)
            .with_context(|| format!("Failed to read transcript {}", path.display()))?,
        None => {
            if atty::is(atty::Stream::Stdin) {
                anyhow::bail!("No transcript given: pass a FILE or pipe output into xctriage");
            }
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read transcript from stdin")?;
            buf
        }
    };
    // App logs mixed into the transcript are not always valid UTF-8
    let transcript = String::from_utf8_lossy(&bytes);

    let since = args.since.as_deref().map(parse_since).transpose()?;
    let config = Config::load()?;
    let options = triage_options(&config, &args.output, since);

    let outcome = ProcessOutcome {
        exit_code: args.exit_code,
        signaled: args.signal.is_some(),
        signal: args.signal.clone(),
        core_dumped: args.core_dumped,
        timed_out: args.timed_out,
        canceled: args.canceled,
    };

    let report = TriageEngine::new().triage(&transcript, &outcome, &options);
    print_report(&report, bytes.len(), args.output.json)
}

fn parse_since(value: &str) -> Result<SystemTime> {
    let time = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid --since time '{}', expected RFC 3339", value))?;
    Ok(SystemTime::from(time))
}
