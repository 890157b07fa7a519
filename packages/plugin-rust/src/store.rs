//! In-memory [`ConfigStore`] implementation backed by [`DashMap`].
//!
//! Each plugin's configuration document is stored as one value, so a save
//! replaces every key at once and readers never observe a partial write.

use async_trait::async_trait;
use dashmap::DashMap;
use fieldlens_core::RawConfig;

use crate::traits::ConfigStore;

/// Configuration documents keyed by plugin identifier.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    documents: DashMap<String, RawConfig>,
}

impl MemoryConfigStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with one plugin's document.
    #[must_use]
    pub fn with_document(plugin_id: &str, config: RawConfig) -> Self {
        let store = Self::new();
        store.documents.insert(plugin_id.to_string(), config);
        store
    }

    /// Number of plugins with a saved document.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self, plugin_id: &str) -> anyhow::Result<RawConfig> {
        Ok(self
            .documents
            .get(plugin_id)
            .map(|doc| doc.clone())
            .unwrap_or_default())
    }

    async fn save(&self, plugin_id: &str, config: RawConfig) -> anyhow::Result<()> {
        self.documents.insert(plugin_id.to_string(), config);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[tokio::test]
    async fn load_of_unknown_plugin_is_empty() {
        let store = MemoryConfigStore::new();
        let config = store.load("plugin-a").await.unwrap();
        assert!(config.is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn save_replaces_whole_document() {
        let store = MemoryConfigStore::with_document(
            "plugin-a",
            HashMap::from([
                ("targets".to_string(), "[]".to_string()),
                ("notes".to_string(), "{}".to_string()),
            ]),
        );

        store
            .save(
                "plugin-a",
                HashMap::from([("maxTokens".to_string(), "3".to_string())]),
            )
            .await
            .unwrap();

        let config = store.load("plugin-a").await.unwrap();
        assert_eq!(config.len(), 1);
        assert_eq!(config.get("maxTokens").map(String::as_str), Some("3"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn documents_are_isolated_per_plugin() {
        let store = MemoryConfigStore::new();
        store
            .save("a", HashMap::from([("k".to_string(), "1".to_string())]))
            .await
            .unwrap();
        store
            .save("b", HashMap::from([("k".to_string(), "2".to_string())]))
            .await
            .unwrap();

        assert_eq!(store.load("a").await.unwrap()["k"], "1");
        assert_eq!(store.load("b").await.unwrap()["k"], "2");
    }
}
