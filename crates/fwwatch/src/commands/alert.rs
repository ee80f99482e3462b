//! `fwwatch alert`: tail the log and forward priority drops to a webhook.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use fwwatch_core::{AlertForwarder, Tailer};

use crate::cli::{AlertArgs, GlobalOpts};
use crate::commands::load_config;
use crate::error::CliError;

pub async fn handle(args: AlertArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = load_config(global)?;
    if let Some(file) = args.file {
        config.log_file = file;
    }
    if let Some(webhook) = args.webhook {
        config.alert.webhook_url = webhook;
    }
    config.validate()?;

    let forwarder = AlertForwarder::new(config.alert_config()?)?;
    let cancel = CancellationToken::new();
    let tailer = Tailer::new(config.tail_config(), cancel.clone());

    info!(
        path = %tailer.path().display(),
        webhook = %forwarder.webhook_url(),
        "forwarding priority alerts, Ctrl-C to stop"
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "could not listen for Ctrl-C, stopping");
        }
    };
    run_forwarder(tailer, forwarder, &cancel, shutdown).await;
    Ok(())
}

/// Feed every tailed line to the forwarder until `shutdown` resolves.
async fn run_forwarder<S>(
    tailer: Tailer,
    forwarder: AlertForwarder,
    cancel: &CancellationToken,
    shutdown: S,
) where
    S: Future<Output = ()>,
{
    let task = tailer.spawn(move |line| {
        // Delivery is fire-and-forget; the handle is not awaited.
        let _ = forwarder.handle_line(&line);
    });

    shutdown.await;
    cancel.cancel();
    if let Err(e) = task.await {
        warn!(error = %e, "tail task failed");
    }
    info!("alert forwarding stopped");
}
