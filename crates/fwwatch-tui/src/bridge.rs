//! Tail bridge: connects the log [`Tailer`] to the event store and the UI.
//!
//! Parsed lines go straight into the shared [`EventStore`]; the dashboard
//! picks them up on its next tick. Tail state transitions are forwarded as
//! [`Action`]s so the header can show whether the file is being followed.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use fwwatch_core::{EventStore, ParseMode, TailConfig, Tailer, parse_line};

use crate::action::Action;

/// Tail the configured file until `cancel` fires.
///
/// Returns once the tailer has stopped, so awaiting the spawned handle
/// guarantees no more store writes.
pub async fn run_tail_bridge(
    config: TailConfig,
    store: Arc<EventStore>,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let tailer = Tailer::new(config, cancel.child_token());
    let mut state = tailer.subscribe_state();
    let _ = action_tx.send(Action::TailStateChanged(*state.borrow_and_update()));

    let mut tail_task = tailer.spawn(move |line| {
        if let Some(event) = parse_line(&line, ParseMode::Dashboard) {
            store.record(event);
        }
    });

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            _ = &mut tail_task => {
                debug!("tail task exited");
                return;
            }

            Ok(()) = state.changed() => {
                let current = *state.borrow_and_update();
                let _ = action_tx.send(Action::TailStateChanged(current));
            }
        }
    }

    let _ = tail_task.await;
    debug!("tail bridge stopped");
}
