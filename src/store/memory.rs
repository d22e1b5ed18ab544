use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{BatchOp, ScanOptions};

#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn put(&self, key: String, value: String) {
        self.entries.write().await.insert(key, value);
    }

    pub async fn delete(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// All ops run under one write guard, so readers never observe a partial batch.
    pub async fn batch(&self, ops: Vec<BatchOp>) {
        let mut guard = self.entries.write().await;
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    guard.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    guard.remove(&key);
                }
            }
        }
    }

    pub async fn scan_prefix(&self, prefix: &str, options: ScanOptions) -> Vec<(String, String)> {
        let guard = self.entries.read().await;
        let matching = guard
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()));

        let limit = options.limit.unwrap_or(usize::MAX);
        if options.reverse {
            let mut all: Vec<_> = matching.collect();
            all.reverse();
            all.truncate(limit);
            all
        } else {
            matching.take(limit).collect()
        }
    }
}
