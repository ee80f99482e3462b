//! Config subcommand handlers.

use std::io::Write;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::commands::load_config;
use crate::error::CliError;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut out = std::io::stdout().lock();
    match args.command {
        ConfigCommand::Show => {
            let config = load_config(global)?;
            write!(out, "{}", config.to_toml()?)?;
        }
        ConfigCommand::Path => {
            let path = global
                .config
                .clone()
                .unwrap_or_else(fwwatch_config::config_path);
            writeln!(out, "{}", path.display())?;
        }
    }
    Ok(())
}
