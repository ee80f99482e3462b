//! Shared configuration for the fwwatch CLI and dashboard.
//!
//! A single TOML file plus environment overrides, merged with `figment`
//! and translated into the runtime config types of `fwwatch_core`. Both
//! binaries depend on this crate and layer their CLI flags on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use fwwatch_core::config::{
    AlertConfig, DEFAULT_CAPACITY, DEFAULT_LOG_FILE, DEFAULT_PRIORITY_PREFIXES,
    DEFAULT_WEBHOOK_URL, DashboardConfig, StoreConfig, TailConfig,
};

/// Prefix for structured overrides, e.g. `FWWATCH_ALERT__TIMEOUT_SECS=2`.
pub const ENV_PREFIX: &str = "FWWATCH_";

/// Webhook override honoured for compatibility with existing deployments.
pub const WEBHOOK_ENV: &str = "FW_WEBHOOK";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Firewall log to tail.
    pub log_file: PathBuf,

    /// Number of recent events kept in memory.
    pub capacity: usize,

    pub tail: TailSection,
    pub alert: AlertSection,
    pub dashboard: DashboardSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            capacity: DEFAULT_CAPACITY,
            tail: TailSection::default(),
            alert: AlertSection::default(),
            dashboard: DashboardSection::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TailSection {
    pub wait_interval_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for TailSection {
    fn default() -> Self {
        Self {
            wait_interval_ms: 500,
            poll_interval_ms: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AlertSection {
    pub webhook_url: String,
    pub timeout_secs: u64,
    pub priority_prefixes: Vec<String>,
}

impl Default for AlertSection {
    fn default() -> Self {
        Self {
            webhook_url: DEFAULT_WEBHOOK_URL.into(),
            timeout_secs: 5,
            priority_prefixes: DEFAULT_PRIORITY_PREFIXES
                .iter()
                .map(|p| (*p).to_owned())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardSection {
    pub refresh_interval_ms: u64,
    pub top_n: usize,
    pub notice_ms: u64,
    /// Defaults to the system temp directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,
}

impl Default for DashboardSection {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 250,
            top_n: 6,
            notice_ms: 1000,
            export_dir: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "fwwatch", "fwwatch").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("fwwatch");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// The provider stack: defaults, TOML file, `FWWATCH_*`, `FW_WEBHOOK`.
pub fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .merge(
            Env::raw()
                .only(&[WEBHOOK_ENV])
                .map(|_| "alert.webhook_url".into()),
        )
}

/// Load and validate the config from the default path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load and validate the config from `path` + environment. A missing file
/// is not an error; defaults and environment still apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment_for(path).extract()?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Check ranges and parse the webhook URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(invalid("capacity", "must be at least 1"));
        }
        if self.tail.wait_interval_ms == 0 {
            return Err(invalid("tail.wait_interval_ms", "must be at least 1"));
        }
        if self.tail.poll_interval_ms == 0 {
            return Err(invalid("tail.poll_interval_ms", "must be at least 1"));
        }
        if self.dashboard.refresh_interval_ms == 0 {
            return Err(invalid("dashboard.refresh_interval_ms", "must be at least 1"));
        }
        if self.dashboard.notice_ms == 0 {
            return Err(invalid("dashboard.notice_ms", "must be at least 1"));
        }
        if self.dashboard.top_n == 0 {
            return Err(invalid("dashboard.top_n", "must be at least 1"));
        }
        if self.alert.timeout_secs == 0 {
            return Err(invalid("alert.timeout_secs", "must be at least 1"));
        }
        if self.alert.priority_prefixes.is_empty() {
            return Err(invalid("alert.priority_prefixes", "must not be empty"));
        }
        if self.alert.priority_prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid("alert.priority_prefixes", "entries must not be blank"));
        }
        self.webhook_url()?;
        Ok(())
    }

    /// The webhook as an `http`/`https` URL.
    pub fn webhook_url(&self) -> Result<Url, ConfigError> {
        let url: Url = self
            .alert
            .webhook_url
            .parse()
            .map_err(|e| invalid("alert.webhook_url", format!("{e}: {}", self.alert.webhook_url)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(
                "alert.webhook_url",
                format!("expected http or https, got '{other}'"),
            )),
        }
    }

    pub fn tail_config(&self) -> TailConfig {
        TailConfig {
            path: self.log_file.clone(),
            wait_interval: Duration::from_millis(self.tail.wait_interval_ms),
            poll_interval: Duration::from_millis(self.tail.poll_interval_ms),
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            capacity: self.capacity,
        }
    }

    pub fn alert_config(&self) -> Result<AlertConfig, ConfigError> {
        Ok(AlertConfig {
            webhook_url: self.webhook_url()?,
            timeout: Duration::from_secs(self.alert.timeout_secs),
            priority_prefixes: self.alert.priority_prefixes.clone(),
        })
    }

    pub fn dashboard_config(&self) -> DashboardConfig {
        DashboardConfig {
            refresh_interval: Duration::from_millis(self.dashboard.refresh_interval_ms),
            top_n: self.dashboard.top_n,
            notice_duration: Duration::from_millis(self.dashboard.notice_ms),
            export_dir: self
                .dashboard
                .export_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
        }
    }

    /// Render as TOML (used by `fwwatch config show`).
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;

    use super::*;

    fn load(path: &str) -> Result<Config, figment::Error> {
        load_config_from(Path::new(path)).map_err(|e| figment::Error::from(e.to_string()))
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let cfg = load("does-not-exist.toml")?;
            assert_eq!(cfg, Config::default());
            assert_eq!(cfg.log_file, PathBuf::from("/var/log/firewall.log"));
            assert_eq!(cfg.capacity, 200);
            assert_eq!(
                cfg.alert.priority_prefixes,
                vec!["FW-DROP-SSH".to_owned(), "FW-DROP-BLOCKEDPORT".to_owned()]
            );
            Ok(())
        });
    }

    #[test]
    fn file_values_override_defaults() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file(
                "config.toml",
                r#"
                    log_file = "/tmp/fw.log"
                    capacity = 50

                    [alert]
                    webhook_url = "http://hooks.local/fw"
                    priority_prefixes = ["FW-DROP-SSH"]

                    [dashboard]
                    top_n = 3
                    export_dir = "/srv/exports"
                "#,
            )?;
            let cfg = load("config.toml")?;
            assert_eq!(cfg.log_file, PathBuf::from("/tmp/fw.log"));
            assert_eq!(cfg.capacity, 50);
            assert_eq!(cfg.alert.priority_prefixes, vec!["FW-DROP-SSH".to_owned()]);
            // Untouched keys in a partially specified section keep defaults.
            assert_eq!(cfg.alert.timeout_secs, 5);
            assert_eq!(cfg.tail, TailSection::default());

            let dash = cfg.dashboard_config();
            assert_eq!(dash.top_n, 3);
            assert_eq!(dash.export_dir, PathBuf::from("/srv/exports"));
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file("config.toml", "capacity = 50\n")?;
            jail.set_env("FWWATCH_CAPACITY", "75");
            jail.set_env("FWWATCH_TAIL__POLL_INTERVAL_MS", "100");
            let cfg = load("config.toml")?;
            assert_eq!(cfg.capacity, 75);
            assert_eq!(cfg.tail.poll_interval_ms, 100);
            assert_eq!(cfg.tail_config().poll_interval, Duration::from_millis(100));
            Ok(())
        });
    }

    #[test]
    fn legacy_webhook_variable_is_honoured() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env(WEBHOOK_ENV, "https://alerts.example.net/hook");
            let cfg = load("none.toml")?;
            let alert = cfg.alert_config().unwrap();
            assert_eq!(alert.webhook_url.as_str(), "https://alerts.example.net/hook");
            Ok(())
        });
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let cfg = Config {
            capacity: 0,
            ..Config::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "capacity"));
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let mut cfg = Config::default();
        cfg.alert.timeout_secs = 0;
        let err = cfg.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation { ref field, .. } if field == "alert.timeout_secs")
        );

        let mut cfg = Config::default();
        cfg.dashboard.notice_ms = 0;
        let err = cfg.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation { ref field, .. } if field == "dashboard.notice_ms")
        );
    }

    #[test]
    fn webhook_must_be_http() {
        let mut cfg = Config::default();
        cfg.alert.webhook_url = "ftp://example.com/hook".into();
        assert!(cfg.validate().is_err());

        cfg.alert.webhook_url = "not a url".into();
        assert!(cfg.validate().is_err());

        cfg.alert.webhook_url = "http://127.0.0.1:8080/hook".into();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_priority_list_is_rejected() {
        let mut cfg = Config::default();
        cfg.alert.priority_prefixes.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn runtime_configs_carry_values() {
        let cfg = Config::default();
        let tail = cfg.tail_config();
        assert_eq!(tail.path, PathBuf::from("/var/log/firewall.log"));
        assert_eq!(tail.wait_interval, Duration::from_millis(500));
        assert_eq!(tail.poll_interval, Duration::from_millis(200));
        assert_eq!(cfg.store_config().capacity, 200);
        assert_eq!(cfg.alert_config().unwrap().timeout, Duration::from_secs(5));
        assert_eq!(cfg.dashboard_config().export_dir, std::env::temp_dir());
    }

    #[test]
    fn toml_round_trips_through_figment() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let mut original = Config::default();
            original.capacity = 42;
            original.dashboard.export_dir = Some(PathBuf::from("/var/tmp"));
            jail.create_file("config.toml", &original.to_toml().unwrap())?;
            assert_eq!(load("config.toml")?, original);
            Ok(())
        });
    }
}
