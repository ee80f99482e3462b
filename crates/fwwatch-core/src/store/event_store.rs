// ── Bounded event store ──
//
// The only mutable state shared between the tailing task and the dashboard.
// One mutex guards the event ring and both counters so that a reader never
// sees the ring and the counters disagree.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use tracing::debug;

use crate::config::StoreConfig;
use crate::model::Event;

/// Occurrence counts keyed by prefix or source address, in first-seen order.
pub type Counts = IndexMap<String, u64>;

struct Inner {
    /// Newest first.
    events: VecDeque<Arc<Event>>,
    prefix_counts: Counts,
    source_counts: Counts,
}

/// Thread-safe bounded buffer of recent events plus running counters.
///
/// Shared as `Arc<EventStore>`. All access goes through [`record`],
/// [`clear_counts`] and [`snapshot`]; the lock is never handed out.
///
/// [`record`]: EventStore::record
/// [`clear_counts`]: EventStore::clear_counts
/// [`snapshot`]: EventStore::snapshot
pub struct EventStore {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl EventStore {
    pub fn new(config: StoreConfig) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(Inner {
                events: VecDeque::with_capacity(capacity),
                prefix_counts: Counts::new(),
                source_counts: Counts::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Add an event, evicting the oldest one when full, and bump both counters.
    pub fn record(&self, event: Event) {
        let event = Arc::new(event);
        let mut inner = self.lock();

        if inner.events.len() == self.capacity {
            inner.events.pop_back();
        }
        *inner.prefix_counts.entry(event.prefix.clone()).or_insert(0) += 1;
        *inner
            .source_counts
            .entry(event.source_address.clone())
            .or_insert(0) += 1;
        inner.events.push_front(event);
    }

    /// Reset both counters. The recent-events history is kept.
    pub fn clear_counts(&self) {
        let mut inner = self.lock();
        inner.prefix_counts.clear();
        inner.source_counts.clear();
        debug!("event counters cleared");
    }

    /// Consistent point-in-time copy of the events and both counters.
    pub fn snapshot(&self) -> StoreSnapshot {
        let inner = self.lock();
        StoreSnapshot {
            events: inner.events.iter().cloned().collect(),
            prefix_counts: inner.prefix_counts.clone(),
            source_counts: inner.source_counts.clone(),
        }
    }

    /// Every mutation leaves `Inner` consistent, so a poisoned lock is safe
    /// to keep using.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

/// Owned copy of the store's state at one instant.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    /// Newest first.
    pub events: Vec<Arc<Event>>,
    pub prefix_counts: Counts,
    pub source_counts: Counts,
}

impl StoreSnapshot {
    /// Events counted since the last clear (sum of the prefix counter).
    pub fn total(&self) -> u64 {
        self.prefix_counts.values().sum()
    }

    /// Highest prefix counts, ties in first-seen order.
    pub fn top_prefixes(&self, n: usize) -> Vec<(&str, u64)> {
        top_n(&self.prefix_counts, n)
    }

    /// Highest source-address counts, ties in first-seen order.
    pub fn top_sources(&self, n: usize) -> Vec<(&str, u64)> {
        top_n(&self.source_counts, n)
    }
}

fn top_n(counts: &Counts, n: usize) -> Vec<(&str, u64)> {
    let mut entries: Vec<(&str, u64)> = counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    // Stable sort keeps insertion order among equal counts.
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(n);
    entries
}
