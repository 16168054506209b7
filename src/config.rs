use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub node: NodeConfig,
    pub database: DatabaseConfig,
    pub listener: ListenerConfig,
    pub logging: LoggingConfig,
}

/// Chain node endpoints and timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// WebSocket endpoint used for the newHeads subscription
    pub ws_endpoint: String,
    /// HTTP JSON-RPC endpoint used for block and balance queries
    pub http_endpoint: String,
    /// Timeout applied by the HTTP client to every request
    pub request_timeout_seconds: u64,
    /// Bound on opening a subscription and seeding the current head
    pub subscribe_timeout_seconds: u64,
    /// Deadline for fetching one full block
    pub fetch_timeout_seconds: u64,
    /// Fixed delay between reconnect attempts
    pub reconnect_delay_seconds: u64,
}

/// Ledger database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file path
    pub path: String,
    /// Enable WAL mode so the CLI can read while the listener writes
    pub enable_wal_mode: bool,
    /// Database busy timeout in milliseconds
    pub busy_timeout_ms: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Capacity of the hand-off queue between the block source and the consumer
    pub queue_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            ws_endpoint: "ws://127.0.0.1:8546".to_string(),
            http_endpoint: "http://127.0.0.1:8545".to_string(),
            request_timeout_seconds: 30,
            subscribe_timeout_seconds: 10,
            fetch_timeout_seconds: 5,
            reconnect_delay_seconds: 2,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "./ledger.db".to_string(),
            enable_wal_mode: true,
            busy_timeout_ms: 5000,
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self { queue_capacity: 1 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl NodeConfig {
    pub fn subscribe_timeout(&self) -> Duration {
        Duration::from_secs(self.subscribe_timeout_seconds)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_seconds)
    }
}

fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables.
    /// Environment variables take precedence over file values.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the TOML file named by `CONFIG_FILE` (default `config.toml`)
    pub fn load_from_file() -> Result<Self, ConfigError> {
        let config_path = env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if !Path::new(&config_path).exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ConfigError::FileNotFound(config_path.clone()))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parsing(e.to_string()))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(endpoint) = env::var("NODE_WS_URL") {
            self.node.ws_endpoint = endpoint;
        }
        if let Ok(endpoint) = env::var("NODE_HTTP_URL") {
            self.node.http_endpoint = endpoint;
        }
        if let Some(v) = parse_env("RPC_TIMEOUT_SECONDS")? {
            self.node.request_timeout_seconds = v;
        }
        if let Some(v) = parse_env("SUBSCRIBE_TIMEOUT_SECONDS")? {
            self.node.subscribe_timeout_seconds = v;
        }
        if let Some(v) = parse_env("FETCH_TIMEOUT_SECONDS")? {
            self.node.fetch_timeout_seconds = v;
        }
        if let Some(v) = parse_env("RECONNECT_DELAY_SECONDS")? {
            self.node.reconnect_delay_seconds = v;
        }

        if let Ok(path) = env::var("DATABASE_PATH") {
            self.database.path = path;
        }
        if let Some(v) = parse_env("DATABASE_WAL_MODE")? {
            self.database.enable_wal_mode = v;
        }

        if let Some(v) = parse_env("LISTENER_QUEUE_CAPACITY")? {
            self.listener.queue_capacity = v;
        }

        if let Ok(level) = env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = env::var("LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.node.ws_endpoint.starts_with("ws://") && !self.node.ws_endpoint.starts_with("wss://") {
            return Err(ConfigError::InvalidUrl(self.node.ws_endpoint.clone()));
        }
        if !self.node.http_endpoint.starts_with("http://") && !self.node.http_endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(self.node.http_endpoint.clone()));
        }

        let bounded = [
            ("node.request_timeout_seconds", self.node.request_timeout_seconds),
            ("node.subscribe_timeout_seconds", self.node.subscribe_timeout_seconds),
            ("node.fetch_timeout_seconds", self.node.fetch_timeout_seconds),
            ("node.reconnect_delay_seconds", self.node.reconnect_delay_seconds),
        ];
        for (key, value) in bounded {
            if value == 0 || value > 300 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }

        if self.listener.queue_capacity == 0 || self.listener.queue_capacity > 1024 {
            return Err(ConfigError::InvalidValue {
                key: "listener.queue_capacity".to_string(),
                value: self.listener.queue_capacity.to_string(),
            });
        }

        if self.database.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "database.path".to_string(),
                value: self.database.path.clone(),
            });
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                value: self.logging.level.clone(),
            });
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.format".to_string(),
                value: self.logging.format.clone(),
            });
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample_config() -> Result<String, ConfigError> {
        toml::to_string_pretty(&Self::default()).map_err(|e| ConfigError::Parsing(e.to_string()))
    }
}
