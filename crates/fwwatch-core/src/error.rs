// ── Core error types ──
//
// Errors surfaced by fwwatch-core. Most of the pipeline is best-effort and
// never produces these: unparsable lines, a missing log file and failed
// webhook deliveries are expected states, not errors. What remains are the
// operator-initiated paths (export) and construction-time failures.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Export ───────────────────────────────────────────────────────
    #[error("Failed to write snapshot to {}: {source}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Webhook delivery ─────────────────────────────────────────────
    #[error("Webhook transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook rejected alert with HTTP {status}")]
    WebhookStatus { status: u16 },
}
