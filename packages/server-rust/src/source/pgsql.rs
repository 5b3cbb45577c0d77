//! Database-backed vector tiles.
//!
//! Each tile is built by running every layer's SQL against the database,
//! encoding each result set as a vector tile layer, and merging the layers
//! into one tile. Encoding and merging belong to the rendering engine's
//! geometry library, reached through [`TileAssembler`]. Without an
//! assembler the source reports [`SourceError::NotImplemented`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use layergroup_core::MapConfig;
use tracing::debug;

use super::{TileCoord, TileInfo, VectorTileSource};
use crate::error::SourceError;

/// One layer's name and the SQL that produces its features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerQuery {
    /// Output layer name inside the tile.
    pub name: String,
    /// Effective SQL, filters included.
    pub sql: String,
}

/// Builds a merged, encoded tile from per-layer queries.
#[async_trait]
pub trait TileAssembler: Send + Sync {
    /// Returns the whole tile or an error. Partial tiles are not allowed.
    async fn assemble(&self, coord: TileCoord, layers: &[LayerQuery]) -> anyhow::Result<Bytes>;
}

/// Assembles tiles on demand from a map config's layer SQL.
#[derive(Clone)]
pub struct PgsqlVectorTileSource {
    layers: Vec<LayerQuery>,
    assembler: Option<Arc<dyn TileAssembler>>,
    info: TileInfo,
}

impl fmt::Debug for PgsqlVectorTileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgsqlVectorTileSource")
            .field("layers", &self.layers)
            .field("assembler", &self.assembler.is_some())
            .finish()
    }
}

impl PgsqlVectorTileSource {
    /// Creates a source for `map_config`. Layer `i` is named `layer{i}`.
    #[must_use]
    pub fn new(map_config: &MapConfig, assembler: Option<Arc<dyn TileAssembler>>) -> Self {
        let layers = map_config
            .layers()
            .iter()
            .enumerate()
            .map(|(index, layer)| LayerQuery {
                name: format!("layer{index}"),
                sql: layer.effective_sql(),
            })
            .collect();
        Self {
            layers,
            assembler,
            info: TileInfo::default(),
        }
    }

    /// Per-layer queries run for each tile.
    #[must_use]
    pub fn layers(&self) -> &[LayerQuery] {
        &self.layers
    }
}

#[async_trait]
impl VectorTileSource for PgsqlVectorTileSource {
    async fn get_tile(&self, coord: TileCoord) -> Result<Bytes, SourceError> {
        let Some(assembler) = &self.assembler else {
            return Err(SourceError::NotImplemented("PgsqlVectorTileSource.getTile"));
        };
        debug!(z = coord.z, x = coord.x, y = coord.y, layers = self.layers.len(), "assembling tile");
        assembler
            .assemble(coord, &self.layers)
            .await
            .map_err(|e| SourceError::Render(e.to_string()))
    }

    fn info(&self) -> TileInfo {
        self.info
    }
}
