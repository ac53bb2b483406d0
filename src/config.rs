use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Service Configuration
// ============================================================================
//
// Defaults suit a local run against the in-memory store. Environment
// variables override them:
//
//   NOTES_HTTP_ADDR           bind address            (0.0.0.0:8080)
//   NOTES_STORE               memory | scylla         (memory)
//   NOTES_SCYLLA_NODES        comma separated nodes   (127.0.0.1:9042)
//   NOTES_KEYSPACE            keyspace name           (notes_ks)
//   NOTES_REQUEST_TIMEOUT_MS  per-request store bound (10000)
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Scylla,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "scylla" => Ok(StoreBackend::Scylla),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_addr: SocketAddr,
    pub store: StoreBackend,
    pub scylla_nodes: Vec<String>,
    pub keyspace: String,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            store: StoreBackend::Memory,
            scylla_nodes: vec!["127.0.0.1:9042".to_string()],
            keyspace: "notes_ks".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Defaults overridden by the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(addr) = lookup("NOTES_HTTP_ADDR") {
            config.http_addr = addr.parse().map_err(|e: std::net::AddrParseError| {
                invalid("NOTES_HTTP_ADDR", e.to_string())
            })?;
        }

        if let Some(store) = lookup("NOTES_STORE") {
            config.store = store.parse().map_err(|e| invalid("NOTES_STORE", e))?;
        }

        if let Some(nodes) = lookup("NOTES_SCYLLA_NODES") {
            config.scylla_nodes = nodes
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(keyspace) = lookup("NOTES_KEYSPACE") {
            config.keyspace = keyspace.trim().to_string();
        }

        if let Some(ms) = lookup("NOTES_REQUEST_TIMEOUT_MS") {
            let ms: u64 = ms.trim().parse().map_err(|e: std::num::ParseIntError| {
                invalid("NOTES_REQUEST_TIMEOUT_MS", e.to_string())
            })?;
            config.request_timeout = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.store == StoreBackend::Scylla && self.scylla_nodes.is_empty() {
            return Err(invalid("NOTES_SCYLLA_NODES", "at least one node is required".to_string()));
        }

        // Interpolated into CQL, so restrict to identifier characters
        let valid_keyspace = !self.keyspace.is_empty()
            && self
                .keyspace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_keyspace {
            return Err(invalid(
                "NOTES_KEYSPACE",
                format!("'{}' is not a valid keyspace name", self.keyspace),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(invalid("NOTES_REQUEST_TIMEOUT_MS", "must be positive".to_string()));
        }

        Ok(())
    }
}

fn invalid(var: &'static str, message: String) -> ConfigError {
    ConfigError::Invalid { var, message }
}
