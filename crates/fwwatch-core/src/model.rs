// ── Domain model ──
//
// A parsed firewall log line. Every display field is a non-empty string so
// renderers and payload builders never have to special-case absence.

use chrono::{DateTime, Local, SubsecRound};
use serde::Serialize;

/// Placeholder used for any field the log line did not carry.
pub const PLACEHOLDER: &str = "-";

/// Prefix used when a firewall-looking line has no usable first token.
pub const DEFAULT_PREFIX: &str = "FW-LOG";

/// One firewall log entry, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Capture time, truncated to whole seconds.
    pub timestamp: DateTime<Local>,
    /// Classification tag, e.g. `FW-DROP-SSH`.
    pub prefix: String,
    pub source_address: String,
    pub dest_address: String,
    /// Destination port, or the source port when the line had no `DPT=`.
    pub dest_port: String,
    pub protocol: String,
    /// The stripped log line as read from the file.
    pub raw: String,
}

impl Event {
    /// Build an event stamped with the current local time.
    ///
    /// Empty field values are replaced with [`PLACEHOLDER`] (or
    /// [`DEFAULT_PREFIX`] for the prefix).
    pub fn new(fields: EventFields, raw: impl Into<String>) -> Self {
        Self::at(Local::now(), fields, raw)
    }

    /// Build an event with an explicit capture time.
    pub fn at(timestamp: DateTime<Local>, fields: EventFields, raw: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(0),
            prefix: non_empty_or(fields.prefix, DEFAULT_PREFIX),
            source_address: non_empty_or(fields.source_address, PLACEHOLDER),
            dest_address: non_empty_or(fields.dest_address, PLACEHOLDER),
            dest_port: non_empty_or(fields.dest_port, PLACEHOLDER),
            protocol: non_empty_or(fields.protocol, PLACEHOLDER),
            raw: raw.into(),
        }
    }

    /// Capture time in the dashboard's `YYYY-MM-DD HH:MM:SS` form.
    pub fn time_label(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Raw field values extracted by the parser, before placeholder filling.
#[derive(Debug, Clone, Default)]
pub struct EventFields {
    pub prefix: Option<String>,
    pub source_address: Option<String>,
    pub dest_address: Option<String>,
    pub dest_port: Option<String>,
    pub protocol: Option<String>,
}

fn non_empty_or(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => fallback.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_become_placeholders() {
        let event = Event::new(EventFields::default(), "raw line");
        assert_eq!(event.prefix, DEFAULT_PREFIX);
        assert_eq!(event.source_address, PLACEHOLDER);
        assert_eq!(event.dest_address, PLACEHOLDER);
        assert_eq!(event.dest_port, PLACEHOLDER);
        assert_eq!(event.protocol, PLACEHOLDER);
        assert_eq!(event.raw, "raw line");
    }

    #[test]
    fn blank_values_count_as_missing() {
        let fields = EventFields {
            prefix: Some("  ".into()),
            protocol: Some(String::new()),
            ..EventFields::default()
        };
        let event = Event::new(fields, "");
        assert_eq!(event.prefix, DEFAULT_PREFIX);
        assert_eq!(event.protocol, PLACEHOLDER);
    }

    #[test]
    fn timestamp_has_second_resolution() {
        let event = Event::new(EventFields::default(), "");
        assert_eq!(event.timestamp.timestamp_subsec_nanos(), 0);
        assert_eq!(event.time_label().len(), "2026-01-01 00:00:00".len());
    }
}
