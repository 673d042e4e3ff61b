//! Store configuration.
//!
//! # Responsibility
//! - Describe where the database lives and how the handle pool is sized.
//!
//! # Invariants
//! - `max_connections` is always at least 1 once normalized.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 30_000;

/// Configuration for a file-backed [`crate::db::Store`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file path.
    pub path: PathBuf,
    /// Upper bound on open connections shared by all requests.
    pub max_connections: u32,
    /// Idle connections kept warm. `None` keeps `max_connections` open.
    pub min_idle: Option<u32>,
    /// How long one statement waits on a locked database.
    pub busy_timeout_ms: u64,
    /// How long a caller waits for a free pooled connection.
    pub connection_timeout_ms: u64,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections.max(1)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("saypi.db"),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_idle: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            connection_timeout_ms: DEFAULT_CONNECTION_TIMEOUT_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StoreConfig;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"path": "/tmp/say.db", "max_connections": 2}"#).unwrap();
        assert_eq!(config.path, PathBuf::from("/tmp/say.db"));
        assert_eq!(config.max_connections(), 2);
        assert_eq!(config.min_idle, None);
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn zero_connections_is_clamped_to_one() {
        let mut config = StoreConfig::new("x.db");
        config.max_connections = 0;
        assert_eq!(config.max_connections(), 1);
    }
}
