//! Pre-built vector tiles behind a file or HTTP template.

use async_trait::async_trait;
use bytes::Bytes;
use layergroup_core::MapConfig;
use tracing::debug;

use super::fetch::{normalize_tile, TileFetcher};
use super::{TileCoord, TileInfo, VectorTileSource};
use crate::datasource::{encode_layer_names, TileTemplate};
use crate::error::SourceError;

/// Serves tiles from a [`TileTemplate`].
///
/// `{layers}` is fixed at construction from the map config's layer SQL
/// names; `{z}`, `{x}` and `{y}` are filled per tile.
#[derive(Debug, Clone)]
pub struct StaticVectorTileSource {
    template: TileTemplate,
    layers: String,
    fetcher: TileFetcher,
    info: TileInfo,
}

impl StaticVectorTileSource {
    /// Creates a source for `map_config`'s layers.
    #[must_use]
    pub fn new(template: TileTemplate, map_config: &MapConfig, fetcher: TileFetcher) -> Self {
        let layers = encode_layer_names(map_config.layer_names());
        debug!(template = template.as_str(), layers = %layers, "static vector tile source");
        Self {
            template,
            layers,
            fetcher,
            info: TileInfo::default(),
        }
    }

    /// Encoded `{layers}` value.
    #[must_use]
    pub fn layers(&self) -> &str {
        &self.layers
    }
}

#[async_trait]
impl VectorTileSource for StaticVectorTileSource {
    async fn get_tile(&self, coord: TileCoord) -> Result<Bytes, SourceError> {
        let location = self.template.render(coord, &self.layers)?;
        let payload = self.fetcher.fetch(&location).await?;
        normalize_tile(payload)
    }

    fn info(&self) -> TileInfo {
        self.info
    }
}
