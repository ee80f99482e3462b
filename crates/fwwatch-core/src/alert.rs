//! Priority alert forwarding to a webhook.
//!
//! Lines are parsed in [`ParseMode::Alert`]; those whose prefix starts with
//! an allow-listed string are POSTed as a small JSON document. Delivery is
//! fire-and-forget: each POST runs on its own task, failures are logged at
//! debug level and dropped, and the tail loop never waits on the network.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;

use crate::config::AlertConfig;
use crate::error::CoreError;
use crate::model::Event;
use crate::parse::{ParseMode, parse_line};

/// Body sent to the webhook: `{"prefix": .., "src": .., "dpt": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertPayload {
    pub prefix: String,
    pub src: String,
    pub dpt: String,
}

impl From<&Event> for AlertPayload {
    fn from(event: &Event) -> Self {
        Self {
            prefix: event.prefix.clone(),
            src: event.source_address.clone(),
            dpt: event.dest_port.clone(),
        }
    }
}

/// Filters lines against the priority list and posts matches.
///
/// Cheap to clone; clones share the HTTP connection pool.
#[derive(Debug, Clone)]
pub struct AlertForwarder {
    http: reqwest::Client,
    webhook_url: Url,
    priority_prefixes: Arc<[String]>,
}

impl AlertForwarder {
    /// Build a forwarder with its own HTTP client using the configured timeout.
    pub fn new(config: AlertConfig) -> Result<Self, CoreError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("fwwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(config, http))
    }

    /// Build a forwarder around an existing client. The client's own timeout
    /// applies; `config.timeout` is ignored.
    pub fn with_client(config: AlertConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            webhook_url: config.webhook_url,
            priority_prefixes: config.priority_prefixes.into(),
        }
    }

    pub fn webhook_url(&self) -> &Url {
        &self.webhook_url
    }

    /// Literal prefix test against the allow-list.
    pub fn is_priority(&self, prefix: &str) -> bool {
        self.priority_prefixes
            .iter()
            .any(|wanted| prefix.starts_with(wanted.as_str()))
    }

    /// The payload this line would produce, if it is a priority alert.
    pub fn evaluate(&self, line: &str) -> Option<AlertPayload> {
        let event = parse_line(line, ParseMode::Alert)?;
        self.is_priority(&event.prefix)
            .then(|| AlertPayload::from(&event))
    }

    /// Post the line's alert in the background, if it has one.
    ///
    /// Must be called inside a tokio runtime. The returned handle can be
    /// ignored; it resolves once the single delivery attempt has finished.
    pub fn handle_line(&self, line: &str) -> Option<JoinHandle<()>> {
        let payload = self.evaluate(line)?;
        info!(prefix = %payload.prefix, src = %payload.src, dpt = %payload.dpt, "forwarding alert");

        let forwarder = self.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = forwarder.deliver(&payload).await {
                debug!(error = %e, prefix = %payload.prefix, "alert delivery failed, dropping");
            }
        }))
    }

    /// One POST attempt. Non-2xx responses are reported as errors.
    pub async fn deliver(&self, payload: &AlertPayload) -> Result<(), CoreError> {
        let response = self
            .http
            .post(self.webhook_url.clone())
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(CoreError::WebhookStatus {
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const SSH_DROP: &str = "FW-DROP-SSH: IN=eth0 SRC=10.0.0.5 DST=10.0.0.1 DPT=22 PROTO=6";

    fn config(url: &str) -> AlertConfig {
        AlertConfig {
            webhook_url: url.parse().unwrap(),
            timeout: Duration::from_secs(5),
            ..AlertConfig::default()
        }
    }

    async fn setup() -> (MockServer, AlertForwarder) {
        let server = MockServer::start().await;
        let forwarder = AlertForwarder::new(config(&format!("{}/hook", server.uri()))).unwrap();
        (server, forwarder)
    }

    #[tokio::test]
    async fn priority_line_is_posted_exactly_once() {
        let (server, forwarder) = setup().await;

        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "prefix": "FW-DROP-SSH",
                "src": "10.0.0.5",
                "dpt": "22",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        forwarder.handle_line(SSH_DROP).unwrap().await.unwrap();
    }

    #[tokio::test]
    async fn non_priority_lines_are_not_posted() {
        let (server, forwarder) = setup().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let allow = "FW-ALLOW-WEB: SRC=10.0.0.5 DST=10.0.0.1 DPT=443 PROTO=6";
        assert!(forwarder.handle_line(allow).is_none());
        assert!(forwarder.handle_line("random unrelated text").is_none());
        // Firewall-looking but unparsable: alerts have no fallback path.
        assert!(forwarder.handle_line("FW-DROP-SSH: no fields").is_none());
        // Port-less traffic such as ICMP has no DPT= tag.
        let icmp = "FW-DROP-SSH: IN=eth0 SRC=10.0.0.5 DST=10.0.0.1 PROTO=1";
        assert!(forwarder.evaluate(icmp).is_none());
        assert!(forwarder.handle_line(icmp).is_none());
    }

    #[test]
    fn prefix_match_is_literal_starts_with() {
        let forwarder = AlertForwarder::with_client(
            config("http://127.0.0.1:9/hook"),
            reqwest::Client::new(),
        );
        assert!(forwarder.is_priority("FW-DROP-SSH"));
        assert!(forwarder.is_priority("FW-DROP-SSH-LAN"));
        assert!(forwarder.is_priority("FW-DROP-BLOCKEDPORT"));
        assert!(!forwarder.is_priority("FW-DROP"));
        assert!(!forwarder.is_priority("fw-drop-ssh"));
        assert!(!forwarder.is_priority("FW-ALLOW-SSH"));
    }

    #[test]
    fn payload_uses_raw_alert_fields() {
        let forwarder = AlertForwarder::with_client(
            config("http://127.0.0.1:9/hook"),
            reqwest::Client::new(),
        );
        let payload = forwarder
            .evaluate("FW-DROP-BLOCKEDPORT: SRC=10.1.1.1 SPT=4000 DPT= PROTO=6")
            .unwrap();
        assert_eq!(
            payload,
            AlertPayload {
                prefix: "FW-DROP-BLOCKEDPORT".into(),
                src: "10.1.1.1".into(),
                dpt: "-".into(),
            }
        );
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"prefix": "FW-DROP-BLOCKEDPORT", "src": "10.1.1.1", "dpt": "-"})
        );
    }

    #[tokio::test]
    async fn server_errors_are_reported_but_not_retried() {
        let (server, forwarder) = setup().await;

        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let payload = forwarder.evaluate(SSH_DROP).unwrap();
        let err = forwarder.deliver(&payload).await.unwrap_err();
        assert!(matches!(err, CoreError::WebhookStatus { status: 503 }));

        // Background delivery swallows the failure.
        forwarder.handle_line(SSH_DROP).unwrap().await.unwrap();
    }

    #[tokio::test]
    async fn slow_webhook_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let mut cfg = config(&format!("{}/hook", server.uri()));
        cfg.timeout = Duration::from_millis(100);
        let forwarder = AlertForwarder::new(cfg).unwrap();

        let payload = forwarder.evaluate(SSH_DROP).unwrap();
        match forwarder.deliver(&payload).await {
            Err(CoreError::Http(e)) => assert!(e.is_timeout()),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_webhook_is_swallowed() {
        let forwarder = AlertForwarder::new(config("http://127.0.0.1:9/hook")).unwrap();
        let handle = forwarder.handle_line(SSH_DROP).unwrap();
        handle.await.unwrap();
    }
}
