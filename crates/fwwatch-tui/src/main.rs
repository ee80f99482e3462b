//! `fwwatch-tui`: live terminal dashboard for nftables firewall logs.
//!
//! Tails the firewall log, parses each line into an event, and keeps the
//! newest events plus per-prefix and per-source counters in memory. The
//! screen refreshes about four times a second; `c` clears the counters and
//! `e` exports the held lines to a snapshot file.
//!
//! Logs are written to a file (default `/tmp/fwwatch-tui.log`) to avoid
//! corrupting the terminal UI.

mod action;
mod app;
mod bridge;
mod component;
mod event;
mod screens;
mod theme;
mod tui;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use fwwatch_core::EventStore;

use crate::app::App;

/// Terminal dashboard for a live firewall log.
#[derive(Parser, Debug)]
#[command(name = "fwwatch-tui", version, about)]
struct Cli {
    /// Firewall log to follow (overrides `log_file` from the config)
    #[arg(short = 'f', long)]
    file: Option<PathBuf>,

    /// Config file path (defaults to the platform config directory)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Trace log path
    #[arg(long, default_value = "/tmp/fwwatch-tui.log")]
    trace_log: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Set up file-based tracing. Nothing may be written to stdout/stderr while
/// the dashboard owns the terminal. Hold the guard so logs flush on exit.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("fwwatch_tui={log_level},fwwatch_core={log_level}"))
    });

    let log_dir = cli
        .trace_log
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .trace_log
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("fwwatch-tui.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Install panic/error hooks BEFORE entering the terminal
    tui::install_hooks()?;

    let _log_guard = setup_tracing(&cli);

    // Priority: CLI flags > env > config file > defaults
    let mut config = match &cli.config {
        Some(path) => fwwatch_config::load_config_from(path)?,
        None => fwwatch_config::load_config()?,
    };
    if let Some(file) = cli.file {
        config.log_file = file;
    }
    config.validate()?;

    info!(
        log_file = %config.log_file.display(),
        capacity = config.capacity,
        "starting fwwatch-tui"
    );

    let store = Arc::new(EventStore::new(config.store_config()));
    let mut app = App::new(store, config.tail_config(), config.dashboard_config());
    app.run().await?;

    Ok(())
}
