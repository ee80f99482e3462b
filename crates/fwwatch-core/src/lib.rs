// fwwatch-core: tail → parse → aggregate → forward pipeline for firewall logs.

pub mod alert;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod parse;
pub mod store;
pub mod tail;

// ── Primary re-exports ──────────────────────────────────────────────
pub use alert::{AlertForwarder, AlertPayload};
pub use config::{AlertConfig, DashboardConfig, StoreConfig, TailConfig};
pub use error::CoreError;
pub use export::export_snapshot;
pub use model::{Event, EventFields};
pub use parse::{ParseMode, parse_line};
pub use store::{EventStore, StoreSnapshot};
pub use tail::{TailState, Tailer};
