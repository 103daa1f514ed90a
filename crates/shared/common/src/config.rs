//! Store configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_APP_NAME, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_DATABASE,
    DEFAULT_MONITOR_INTERVAL_SECS, DEFAULT_PROBE_TIMEOUT_SECS, DEFAULT_STORE_URL,
};

/// Everything needed to build an equivalent client from scratch.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClientSettings {
    /// Store URL (may embed credentials)
    pub url: String,
    /// Application name reported to the store
    pub app_name: String,
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSettings")
            .field("url", &"[REDACTED]")
            .field("app_name", &self.app_name)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl ClientSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_STORE_URL.to_string(),
            app_name: DEFAULT_APP_NAME.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

/// Connection monitor timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct MonitorConfig {
    /// Upper bound on one liveness probe
    pub probe_timeout: Duration,
    /// Pause between probes (also after a reconnect attempt)
    pub interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            interval: Duration::from_secs(DEFAULT_MONITOR_INTERVAL_SECS),
        }
    }
}

/// Store configuration for a hosting application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoreConfig {
    pub client: ClientSettings,
    /// Database repositories bind to
    pub database: String,
    pub monitor: MonitorConfig,
}

fn env_secs(key: &str, default: u64) -> Duration {
    Duration::from_secs(
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default),
    )
}

impl StoreConfig {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let config = Self {
            client: ClientSettings {
                url: env::var("STORE_URL").unwrap_or_else(|_| DEFAULT_STORE_URL.to_string()),
                app_name: env::var("STORE_APP_NAME")
                    .unwrap_or_else(|_| DEFAULT_APP_NAME.to_string()),
                connect_timeout: env_secs(
                    "STORE_CONNECT_TIMEOUT_SECS",
                    DEFAULT_CONNECT_TIMEOUT_SECS,
                ),
            },
            database: env::var("STORE_DATABASE")
                .unwrap_or_else(|_| DEFAULT_DATABASE.to_string()),
            monitor: MonitorConfig {
                probe_timeout: env_secs("STORE_PROBE_TIMEOUT_SECS", DEFAULT_PROBE_TIMEOUT_SECS),
                interval: env_secs("STORE_MONITOR_INTERVAL_SECS", DEFAULT_MONITOR_INTERVAL_SECS),
            },
        };

        tracing::debug!(config = ?config, "Store configuration loaded");
        config
    }
}
