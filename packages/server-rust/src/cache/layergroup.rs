//! Token-addressed layergroup storage.

use std::sync::Arc;

use layergroup_core::MapConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::store::ConfigStore;
use crate::error::CacheError;

/// Prefix of every layergroup key.
pub const MAP_CONFIG_KEY_PREFIX: &str = "map_cfg|";

/// Store key for `token`.
#[must_use]
pub fn map_config_key(token: &str) -> String {
    format!("{MAP_CONFIG_KEY_PREFIX}{token}")
}

/// Handle returned to clients after a layergroup is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layergroup {
    /// Token addressing the layergroup; equal to the map config id.
    #[serde(rename = "layergroupid")]
    pub token: String,
    /// Number of layers.
    #[serde(rename = "layercount")]
    pub layer_count: usize,
}

/// Stores and retrieves map configs by token.
#[derive(Clone)]
pub struct LayergroupCache {
    store: Arc<dyn ConfigStore>,
}

impl LayergroupCache {
    /// Creates a cache over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    /// Stores `map_config` under its id unless already present.
    ///
    /// Saving an already-stored layergroup is not an error and leaves the
    /// stored record untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Store`] if serialization or the store fails.
    pub async fn save(&self, map_config: &MapConfig) -> Result<Layergroup, CacheError> {
        let token = map_config.id();
        let blob = serde_json::to_string(map_config).map_err(anyhow::Error::from)?;
        let created = self.store.set_if_absent(&map_config_key(token), blob).await?;
        if created {
            info!(layergroup = token, layers = map_config.layer_count(), "stored layergroup");
        } else {
            debug!(layergroup = token, "layergroup already stored");
        }
        Ok(Layergroup {
            token: token.to_string(),
            layer_count: map_config.layer_count(),
        })
    }

    /// Loads and re-validates the layergroup stored under `token`.
    ///
    /// # Errors
    ///
    /// - [`CacheError::UnknownToken`] if nothing is stored under `token`.
    /// - [`CacheError::Corrupt`] if the stored blob is not a valid map config
    ///   or its id differs from `token`.
    /// - [`CacheError::Store`] if the store fails.
    pub async fn load(&self, token: &str) -> Result<MapConfig, CacheError> {
        let blob = self
            .store
            .get(&map_config_key(token))
            .await?
            .ok_or_else(|| CacheError::UnknownToken(token.to_string()))?;
        let map_config = MapConfig::from_json(&blob).map_err(|e| CacheError::Corrupt {
            token: token.to_string(),
            reason: e.to_string(),
        })?;
        if map_config.id() != token {
            return Err(CacheError::Corrupt {
                token: token.to_string(),
                reason: format!("content id is {}", map_config.id()),
            });
        }
        Ok(map_config)
    }

    /// Whether a layergroup is stored under `token`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Store`] if the store fails.
    pub async fn exists(&self, token: &str) -> Result<bool, CacheError> {
        Ok(self.store.exists(&map_config_key(token)).await?)
    }

    /// Removes the layergroup stored under `token`. Returns whether it was
    /// present.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Store`] if the store fails.
    pub async fn delete(&self, token: &str) -> Result<bool, CacheError> {
        Ok(self.store.delete(&map_config_key(token)).await?)
    }
}
