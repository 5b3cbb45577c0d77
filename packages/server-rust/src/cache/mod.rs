//! Layergroup cache.
//!
//! Layergroups are stored by token under `map_cfg|<token>` in a
//! [`ConfigStore`]. The token is the map config's content id, so storing
//! the same layergroup twice is a no-op.

pub mod engines;
pub mod layergroup;
pub mod store;

pub use engines::MemoryConfigStore;
pub use layergroup::{map_config_key, Layergroup, LayergroupCache, MAP_CONFIG_KEY_PREFIX};
pub use store::ConfigStore;
