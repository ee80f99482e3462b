// ── Firewall log line parser ──
//
// Best-effort field extraction from nftables `log prefix "FW-...: "` lines.
// Each key=value tag is located independently, so tags may appear in any
// order with arbitrary tokens between them. Lines that cannot be parsed are
// dropped by returning `None`; that is the steady state for unrelated log
// traffic, not an error.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::model::{DEFAULT_PREFIX, Event, EventFields};

/// Which extraction policy to apply.
///
/// The dashboard and the alert forwarder look at the same lines with
/// different interests, and their counts must not drift into each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Requires prefix, `SRC=`, `DST=` and `PROTO=`. Maps protocol numbers
    /// to names, falls back from `DPT=` to `SPT=`, and synthesizes an event
    /// for unparsable lines that still carry an `FW-DROP`/`FW-ALLOW` marker.
    Dashboard,
    /// Requires prefix, `SRC=` and a `DPT=` tag, whose value may be empty.
    /// Values pass through unchanged and there is no fallback path.
    Alert,
}

/// Markers that identify a firewall line the structured path could not parse.
const FALLBACK_MARKERS: [&str; 2] = ["FW-DROP", "FW-ALLOW"];

static PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| tag_regex(r"(FW-[A-Z0-9-]+):"));
static SRC_RE: LazyLock<Regex> = LazyLock::new(|| tag_regex(r"\bSRC=([0-9A-F:.]+)"));
static DST_RE: LazyLock<Regex> = LazyLock::new(|| tag_regex(r"\bDST=([0-9A-F:.]+)"));
static SPT_RE: LazyLock<Regex> = LazyLock::new(|| tag_regex(r"\bSPT=(\d+)"));
static DPT_RE: LazyLock<Regex> = LazyLock::new(|| tag_regex(r"\bDPT=(\d+)"));
// Alert lines must carry the tag even when it has no port value.
static DPT_TAG_RE: LazyLock<Regex> = LazyLock::new(|| tag_regex(r"\bDPT=(\d*)"));
static PROTO_RE: LazyLock<Regex> = LazyLock::new(|| tag_regex(r"\bPROTO=(\w*)"));

fn tag_regex(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|e| unreachable!("invalid built-in pattern {pattern}: {e}"))
}

/// Parse one log line, stamping the resulting event with the current time.
pub fn parse_line(line: &str, mode: ParseMode) -> Option<Event> {
    let fields = match mode {
        ParseMode::Dashboard => dashboard_fields(line).or_else(|| fallback_fields(line)),
        ParseMode::Alert => alert_fields(line),
    }?;
    Some(Event::new(fields, line))
}

/// Map nftables protocol numbers to their names; anything else passes through.
pub fn protocol_name(code: &str) -> &str {
    match code {
        "6" => "TCP",
        "17" => "UDP",
        "1" => "ICMP",
        other => other,
    }
}

fn capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
}

/// Prefix plus the text that follows it; tags are only searched after the
/// prefix so that syslog headers cannot be mistaken for fields.
fn split_prefix(line: &str) -> Option<(String, &str)> {
    let caps = PREFIX_RE.captures(line)?;
    let whole = caps.get(0)?;
    let prefix = caps.get(1)?.as_str().to_owned();
    Some((prefix, &line[whole.end()..]))
}

fn dashboard_fields(line: &str) -> Option<EventFields> {
    let (prefix, rest) = split_prefix(line)?;
    let source_address = capture(&SRC_RE, rest)?;
    let dest_address = capture(&DST_RE, rest)?;
    let protocol = capture(&PROTO_RE, rest)?;

    let dest_port = capture(&DPT_RE, rest).or_else(|| capture(&SPT_RE, rest));

    Some(EventFields {
        prefix: Some(prefix),
        source_address: Some(source_address),
        dest_address: Some(dest_address),
        dest_port,
        protocol: Some(protocol_name(&protocol).to_owned()),
    })
}

fn alert_fields(line: &str) -> Option<EventFields> {
    let (prefix, rest) = split_prefix(line)?;
    let source_address = capture(&SRC_RE, rest)?;
    let dest_port = capture(&DPT_TAG_RE, rest)?;

    Some(EventFields {
        prefix: Some(prefix),
        source_address: Some(source_address),
        dest_address: capture(&DST_RE, rest),
        dest_port: Some(dest_port),
        protocol: capture(&PROTO_RE, rest),
    })
}

fn fallback_fields(line: &str) -> Option<EventFields> {
    if !FALLBACK_MARKERS.iter().any(|marker| line.contains(marker)) {
        return None;
    }

    let prefix = line
        .split_whitespace()
        .next()
        .map(|token| token.trim_end_matches(':'))
        .filter(|token| !token.is_empty())
        .unwrap_or(DEFAULT_PREFIX);

    Some(EventFields {
        prefix: Some(prefix.to_owned()),
        ..EventFields::default()
    })
}
