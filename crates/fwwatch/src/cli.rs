//! Clap derive definitions for the `fwwatch` command tree.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use fwwatch_core::ParseMode;

/// Watch nftables firewall logs: forward priority drops to a webhook,
/// inspect parsing, and manage configuration.
#[derive(Debug, Parser)]
#[command(name = "fwwatch", version, about, propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file path (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Tail the firewall log and POST priority drops to the webhook
    Alert(AlertArgs),

    /// Parse log lines from stdin and print matching events as JSON
    Parse(ParseArgs),

    /// Inspect configuration
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct AlertArgs {
    /// Firewall log to follow (overrides `log_file`)
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// Webhook URL (overrides `alert.webhook_url` and FW_WEBHOOK)
    #[arg(short = 'w', long)]
    pub webhook: Option<String>,
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Which parser rules to apply
    #[arg(short, long, value_enum, default_value_t = ModeArg::Dashboard)]
    pub mode: ModeArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Strict fields plus the FW-DROP / FW-ALLOW fallback
    Dashboard,
    /// Prefix and source only, values passed through unchanged
    Alert,
}

impl From<ModeArg> for ParseMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Dashboard => Self::Dashboard,
            ModeArg::Alert => Self::Alert,
        }
    }
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,

    /// Print the config file path
    Path,
}
