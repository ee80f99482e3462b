//! Subcommand handlers.

pub mod alert;
pub mod config_cmd;
pub mod parse;

use fwwatch_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load the config from `--config` or the default location, plus env.
pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let config = match &global.config {
        Some(path) => fwwatch_config::load_config_from(path)?,
        None => fwwatch_config::load_config()?,
    };
    Ok(config)
}
