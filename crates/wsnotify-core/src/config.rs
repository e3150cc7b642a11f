//! Client configuration.
//!
//! Values come from code, from any serde format, or from the environment:
//!
//! | Variable                              | Default                  |
//! |---------------------------------------|--------------------------|
//! | `WSNOTIFY_URI`                        | `ws://localhost:4242/ws` |
//! | `WSNOTIFY_CONNECT_TIMEOUT_SECS`       | `10`                     |
//! | `WSNOTIFY_NOTIFICATION_TIMEOUT_SECS`  | `5`                      |
//! | `WSNOTIFY_CLOSE_TIMEOUT_SECS`         | `2`                      |
//! | `WSNOTIFY_RECONNECT_ATTEMPTS`         | `3`                      |
//! | `WSNOTIFY_RECONNECT_DELAY_MS`         | `500`                    |

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for one notification client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket endpoint.
    pub uri: String,
    /// Maximum time `connect` waits for the handshake.
    pub connect_timeout: Duration,
    /// Default budget for waiting on a single notification.
    pub notification_timeout: Duration,
    /// Maximum time `disconnect` waits for the peer's close reply.
    pub close_timeout: Duration,
    pub reconnect_attempts: u32,
    pub reconnect_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            uri: "ws://localhost:4242/ws".to_string(),
            connect_timeout: Duration::from_secs(10),
            notification_timeout: Duration::from_secs(5),
            close_timeout: Duration::from_secs(2),
            reconnect_attempts: 3,
            reconnect_delay: Duration::from_millis(500),
        }
    }
}

impl ClientConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_notification_timeout(mut self, timeout: Duration) -> Self {
        self.notification_timeout = timeout;
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    pub fn with_reconnect(mut self, attempts: u32, delay: Duration) -> Self {
        self.reconnect_attempts = attempts;
        self.reconnect_delay = delay;
        self
    }

    /// Defaults overridden by `WSNOTIFY_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `WSNOTIFY_*` key.
    ///
    /// Unparsable values are ignored with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(uri) = lookup("WSNOTIFY_URI") {
            config.uri = uri;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "WSNOTIFY_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "WSNOTIFY_NOTIFICATION_TIMEOUT_SECS") {
            config.notification_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "WSNOTIFY_CLOSE_TIMEOUT_SECS") {
            config.close_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_var(&lookup, "WSNOTIFY_RECONNECT_ATTEMPTS") {
            config.reconnect_attempts = attempts;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "WSNOTIFY_RECONNECT_DELAY_MS") {
            config.reconnect_delay = Duration::from_millis(ms);
        }
        config
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}
