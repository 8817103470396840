//! Config subcommands handler

use anyhow::Result;

use xctriage::Config;

/// Show current configuration as TOML.
#[cfg(not(tarpaulin_include))]
pub fn handle_show() -> Result<()> {
    let config = Config::load()?;
    let path = Config::config_path()?;
    let exists = if path.exists() { "" } else { " (not found, defaults)" };
    println!("# {}{}", path.display(), exists);
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
