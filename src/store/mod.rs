//! Key-value storage port.
//!
//! `Store` is the single handle opened at process start and shared through `AppState`.
//! Values are JSON text; prefix scans return entries in lexicographic key order.

pub mod config;
pub mod keys;
pub mod memory;
pub mod sqlite;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::store::config::{StoreBackend, StoreConfig};
use crate::store::memory::MemoryStore;
use crate::store::sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: String, value: String },
    Delete { key: String },
}

impl BatchOp {
    pub fn delete(key: String) -> Self {
        Self::Delete { key }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    pub limit: Option<usize>,
    pub reverse: bool,
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub async fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        match config.backend {
            StoreBackend::Memory => {
                tracing::info!("opening in-memory store");
                Ok(Self::Memory(MemoryStore::new()))
            }
            StoreBackend::Sqlite => {
                tracing::info!(path = %config.sqlite.path.display(), "opening sqlite store");
                Ok(Self::Sqlite(SqliteStore::open(&config.sqlite).await?))
            }
        }
    }

    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Sqlite(_) => "sqlite",
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.get(key).await),
            Self::Sqlite(store) => store.get(key).await,
        }
    }

    pub async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => {
                store.put(key.to_string(), value).await;
                Ok(())
            }
            Self::Sqlite(store) => store.put(key, &value).await,
        }
    }

    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => {
                store.delete(key).await;
                Ok(())
            }
            Self::Sqlite(store) => store.delete(key).await,
        }
    }

    /// Applies every op as one atomic unit.
    pub async fn batch(&self, ops: Vec<BatchOp>) -> Result<(), StoreError> {
        if ops.is_empty() {
            return Ok(());
        }
        match self {
            Self::Memory(store) => {
                store.batch(ops).await;
                Ok(())
            }
            Self::Sqlite(store) => store.batch(ops).await,
        }
    }

    pub async fn scan_prefix(
        &self,
        prefix: &str,
        options: ScanOptions,
    ) -> Result<Vec<(String, String)>, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.scan_prefix(prefix, options).await),
            Self::Sqlite(store) => store.scan_prefix(prefix, options).await,
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let payload = serde_json::to_string(value)?;
        self.put(key, payload).await
    }

    pub async fn scan_json<T: DeserializeOwned>(
        &self,
        prefix: &str,
        options: ScanOptions,
    ) -> Result<Vec<T>, StoreError> {
        let entries = self.scan_prefix(prefix, options).await?;
        entries
            .into_iter()
            .map(|(_, value)| serde_json::from_str(&value).map_err(StoreError::from))
            .collect()
    }

    pub async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let entries = self.scan_prefix(prefix, ScanOptions::default()).await?;
        Ok(entries.into_iter().map(|(key, _)| key).collect())
    }
}
