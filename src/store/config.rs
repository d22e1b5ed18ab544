use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_SQLITE_PATH: &str = "./data/learning-graph.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

impl StoreBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" | "in-memory" => Some(Self::Memory),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub sqlite: SqliteConfig,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let sqlite_path_set = std::env::var("SQLITE_PATH")
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);

        let backend = match std::env::var("STORE_BACKEND") {
            Ok(raw) if !raw.trim().is_empty() => {
                StoreBackend::parse(&raw).ok_or(ConfigError::Invalid {
                    key: "STORE_BACKEND",
                    value: raw,
                })?
            }
            _ if sqlite_path_set => StoreBackend::Sqlite,
            _ => StoreBackend::Memory,
        };

        Ok(Self {
            backend,
            sqlite: SqliteConfig::from_env(),
        })
    }

    pub fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            sqlite: SqliteConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SQLITE_PATH),
            max_connections: 5,
            busy_timeout: Duration::from_secs(30),
        }
    }
}

impl SqliteConfig {
    fn from_env() -> Self {
        let defaults = Self::default();

        let path = std::env::var("SQLITE_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.path);

        let max_connections = env_u64("SQLITE_MAX_CONNECTIONS")
            .map(|v| v.clamp(1, 64) as u32)
            .unwrap_or(defaults.max_connections);

        let busy_timeout = env_u64("SQLITE_BUSY_TIMEOUT_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.busy_timeout);

        Self {
            path,
            max_connections,
            busy_timeout,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<u64>().ok())
}
