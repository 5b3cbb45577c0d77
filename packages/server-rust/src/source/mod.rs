//! Vector tile sources.
//!
//! A [`TileSource`] is opened per layergroup by the
//! [`DatasourceHandler`](crate::datasource::DatasourceHandler) and returns
//! raw tile bytes for `(z, x, y)`. The concrete kind is selected from the
//! resolved [`DatasourceDescriptor`](crate::datasource::DatasourceDescriptor).

pub mod fetch;
pub mod pgsql;
pub mod static_tiles;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use crate::error::SourceError;

pub use fetch::{normalize_tile, TileFetcher, UNCOMPRESSED_TILE_MARKER};
pub use pgsql::{LayerQuery, PgsqlVectorTileSource, TileAssembler};
pub use static_tiles::StaticVectorTileSource;

/// Deepest zoom level accepted.
pub const MAX_ZOOM: u8 = 30;

/// Validated tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Zoom level.
    pub z: u8,
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl TileCoord {
    /// Creates a coordinate, checking `x` and `y` fit the zoom level's grid.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidTileCoord`] if `z > MAX_ZOOM` or
    /// `x`/`y` are not below `2^z`.
    pub fn new(z: u8, x: u32, y: u32) -> Result<Self, SourceError> {
        let side = 1u64 << z.min(MAX_ZOOM);
        if z > MAX_ZOOM || u64::from(x) >= side || u64::from(y) >= side {
            return Err(SourceError::InvalidTileCoord { z, x, y });
        }
        Ok(Self { z, x, y })
    }
}

/// Static metadata reported by a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TileInfo {
    /// Lowest zoom with data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<u8>,
    /// Highest zoom with data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<u8>,
    /// Zoom above which tiles are overzoomed from this level.
    #[serde(rename = "maskLevel", skip_serializing_if = "Option::is_none")]
    pub mask_level: Option<u8>,
}

/// Source of raw vector tile bytes.
#[async_trait]
pub trait VectorTileSource: Send + Sync {
    /// Fetches or assembles one tile.
    async fn get_tile(&self, coord: TileCoord) -> Result<Bytes, SourceError>;

    /// Static metadata. Never fails.
    fn info(&self) -> TileInfo;
}

/// A tile source of one of the supported kinds.
#[derive(Debug)]
pub enum TileSource {
    /// Pre-built tiles behind a template.
    Static(StaticVectorTileSource),
    /// Tiles assembled from layer SQL.
    Postgres(PgsqlVectorTileSource),
}

#[async_trait]
impl VectorTileSource for TileSource {
    async fn get_tile(&self, coord: TileCoord) -> Result<Bytes, SourceError> {
        match self {
            Self::Static(source) => source.get_tile(coord).await,
            Self::Postgres(source) => source.get_tile(coord).await,
        }
    }

    fn info(&self) -> TileInfo {
        match self {
            Self::Static(source) => source.info(),
            Self::Postgres(source) => source.info(),
        }
    }
}
