// ── Shared event store ──
//
// Mutex-guarded ring of recent events with prefix and source counters.

mod event_store;

pub use event_store::{Counts, EventStore, StoreSnapshot};
