mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use xctriage::cli::{Cli, Commands, ConfigCommands};

/// Log filter environment variable (`XCTRIAGE_LOG=debug`).
const LOG_ENV: &str = "XCTRIAGE_LOG";

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Filter(args) => commands::filter::handle(args),
        Commands::Run(args) => {
            let code = commands::run::handle(args)?;
            if code != 0 {
                std::io::Write::flush(&mut std::io::stdout())?;
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::Crashes(args) => commands::crashes::handle(args),
        Commands::Config(ConfigCommands::Show) => commands::config::handle_show(),
        Commands::Completions { shell } => {
            commands::completions::handle(shell);
            Ok(())
        }
    }
}
