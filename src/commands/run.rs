//! `run` subcommand handler

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use signal_hook::consts::{SIGINT, SIGTERM};

use xctriage::capture::{run_captured, CaptureRequest};
use xctriage::cli::RunArgs;
use xctriage::{Config, TriageEngine};

use super::{print_report, triage_options};

/// Run the command, print the report, and return the exit code to use.
///
/// A canceled or timed-out run exits 130 / 124 like a shell would.
pub fn handle(args: RunArgs) -> Result<i32> {
    let (program, program_args) = args
        .command
        .split_first()
        .context("No command given after --")?;

    let cancel = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&cancel))
            .context("Failed to install signal handler")?;
    }

    let mut request = CaptureRequest::new(program)
        .args(program_args)
        .cancel_flag(cancel);
    if let Some(secs) = args.timeout {
        request = request.timeout(Duration::from_secs(secs));
    }

    let run = run_captured(&request)?;
    let transcript = run.transcript.combined();

    let config = Config::load()?;
    let options = triage_options(&config, &args.output, Some(run.started_at));
    let report = TriageEngine::new().triage(&transcript, &run.outcome, &options);
    print_report(&report, transcript.len(), args.output.json)?;

    let code = if run.outcome.canceled {
        130
    } else if run.outcome.timed_out {
        124
    } else if run.outcome.exit_code >= 0 {
        run.outcome.exit_code
    } else {
        // Killed by a signal: 128 + signo
        128 + run.outcome.signal_number().unwrap_or(0)
    };
    Ok(code)
}
