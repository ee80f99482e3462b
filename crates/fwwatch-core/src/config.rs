// ── Runtime configuration ──
//
// These types describe how each pipeline component behaves. They never
// touch disk: fwwatch-config (or a test) builds them and hands them in.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// Default firewall log written by the nftables logging rules.
pub const DEFAULT_LOG_FILE: &str = "/var/log/firewall.log";

/// Default number of events retained in memory.
pub const DEFAULT_CAPACITY: usize = 200;

/// Webhook used when nothing is configured. Deliveries to it simply fail.
pub const DEFAULT_WEBHOOK_URL: &str = "https://example.com/webhook";

/// Prefixes that are forwarded to the webhook by default.
pub const DEFAULT_PRIORITY_PREFIXES: [&str; 2] = ["FW-DROP-SSH", "FW-DROP-BLOCKEDPORT"];

/// How the [`Tailer`](crate::tail::Tailer) follows its file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailConfig {
    pub path: PathBuf,
    /// Interval between existence checks while the file is missing.
    pub wait_interval: Duration,
    /// Sleep between reads when no new data has been appended.
    pub poll_interval: Duration,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_LOG_FILE),
            wait_interval: Duration::from_millis(500),
            poll_interval: Duration::from_millis(200),
        }
    }
}

/// Sizing for the [`EventStore`](crate::store::EventStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    pub capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Where and what the [`AlertForwarder`](crate::alert::AlertForwarder) sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertConfig {
    pub webhook_url: Url,
    pub timeout: Duration,
    pub priority_prefixes: Vec<String>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            webhook_url: Url::parse(DEFAULT_WEBHOOK_URL)
                .unwrap_or_else(|_| unreachable!("default webhook URL is valid")),
            timeout: Duration::from_secs(5),
            priority_prefixes: DEFAULT_PRIORITY_PREFIXES
                .iter()
                .map(|p| (*p).to_owned())
                .collect(),
        }
    }
}

/// Presentation settings for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub refresh_interval: Duration,
    /// Rows shown in each of the top-prefix / top-source columns.
    pub top_n: usize,
    /// How long the export confirmation stays in the footer.
    pub notice_duration: Duration,
    /// Directory that receives `firewall_snapshot_<ts>.log` files.
    pub export_dir: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_millis(250),
            top_n: 6,
            notice_duration: Duration::from_secs(1),
            export_dir: std::env::temp_dir(),
        }
    }
}
