//! All possible UI actions. Actions are the sole mechanism for state mutation.

use std::sync::Arc;

use fwwatch_core::{StoreSnapshot, TailState};

/// Notification severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A transient footer message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Success,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Error,
        }
    }
}

/// Every state transition in the TUI is expressed as an Action.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Quit,
    Tick,
    Resize(u16, u16),

    // ── Data ──────────────────────────────────────────────────────
    /// Fresh copy of the event store, taken once per tick.
    StoreUpdated(Arc<StoreSnapshot>),
    TailStateChanged(TailState),

    // ── Operator commands ─────────────────────────────────────────
    ClearCounts,
    Export,

    // ── Notifications ─────────────────────────────────────────────
    Notify(Notification),
}
