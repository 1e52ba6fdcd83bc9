//! An in-process `DataStore` keeping documents in memory.
//! 在内存中保存文档的进程内 `DataStore`。

use super::{DataStore, Document};
use crate::{core::target::ConnectionTarget, error::Result};
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, trace};

/// Documents per `(database, collection)`, plus open counts per target key.
/// 每个 `(数据库, 集合)` 的文档，以及每个目标键的打开计数。
#[derive(Debug, Default)]
pub struct MemoryStore {
    open_targets: DashMap<String, usize>,
    collections: DashMap<(String, String), Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while at least one connection holds `key` open.
    /// 当至少有一个连接保持 `key` 打开时返回 `true`。
    pub fn is_open(&self, key: &str) -> bool {
        self.open_targets.get(key).is_some_and(|count| *count > 0)
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn open(&self, target: &ConnectionTarget) -> Result<()> {
        let mut count = self.open_targets.entry(target.key()).or_insert(0);
        *count += 1;
        debug!(key = %target, open = *count, "Memory store opened");
        Ok(())
    }

    async fn close(&self, target: &ConnectionTarget) -> Result<()> {
        let key = target.key();
        if let Some(mut count) = self.open_targets.get_mut(&key) {
            *count = count.saturating_sub(1);
        }
        self.open_targets.remove_if(&key, |_, count| *count == 0);
        debug!(%key, "Memory store closed");
        Ok(())
    }

    async fn insert(&self, database: &str, collection: &str, document: Document) -> Result<Document> {
        self.collections
            .entry((database.to_string(), collection.to_string()))
            .or_default()
            .push(document.clone());
        trace!(database, collection, "Document inserted");
        Ok(document)
    }

    async fn count(&self, database: &str, collection: &str) -> Result<usize> {
        Ok(self
            .collections
            .get(&(database.to_string(), collection.to_string()))
            .map_or(0, |docs| docs.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::TargetDefaults, core::target::ConnectArgs};
    use serde_json::json;

    fn target(uri: &str) -> ConnectionTarget {
        ConnectArgs::from(uri)
            .normalize(&TargetDefaults::default())
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_close_counts() {
        let store = MemoryStore::new();
        let target = target("mongodb://localhost/db");

        store.open(&target).await.unwrap();
        store.open(&target).await.unwrap();
        assert!(store.is_open(&target.key()));

        store.close(&target).await.unwrap();
        assert!(store.is_open(&target.key()));
        store.close(&target).await.unwrap();
        assert!(!store.is_open(&target.key()));

        // Closing an unknown target is harmless.
        store.close(&target).await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_count_per_collection() {
        let store = MemoryStore::new();
        let doc = json!({"name": "one"}).as_object().cloned().unwrap();

        let stored = store.insert("db", "simple", doc.clone()).await.unwrap();
        assert_eq!(stored, doc);
        store.insert("db", "simple", doc.clone()).await.unwrap();
        store.insert("other", "simple", doc).await.unwrap();

        assert_eq!(store.count("db", "simple").await.unwrap(), 2);
        assert_eq!(store.count("other", "simple").await.unwrap(), 1);
        assert_eq!(store.count("db", "missing").await.unwrap(), 0);
    }
}
