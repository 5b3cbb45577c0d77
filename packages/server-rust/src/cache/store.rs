//! Key-value seam for the layergroup cache.

use async_trait::async_trait;

/// External key-value store holding serialized layergroups.
///
/// Wrapped in `Arc<dyn ConfigStore>` for sharing across tasks.
#[async_trait]
pub trait ConfigStore: Send + Sync + 'static {
    /// Stores `value` under `key` unless the key is taken. Returns whether
    /// this call stored it. Must be atomic with respect to concurrent calls
    /// for the same key.
    async fn set_if_absent(&self, key: &str, value: String) -> anyhow::Result<bool>;

    /// Value under `key`, or `None`.
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Whether `key` is present.
    async fn exists(&self, key: &str) -> anyhow::Result<bool>;

    /// Removes `key`. Returns whether it was present.
    async fn delete(&self, key: &str) -> anyhow::Result<bool>;
}
