//! Error types for datasource resolution, tile acquisition, and the
//! layergroup cache.

/// Errors raised while resolving datasources or producing tile bytes.
///
/// Fetch and render failures are returned through the same `Result` as a
/// successful tile. A failed tile never yields partial bytes.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The datasource name is not in the descriptor table, or a descriptor
    /// is of an unrecognized kind.
    #[error("{0}")]
    UnknownDatasource(String),
    /// A source was opened without a resolved map config.
    #[error("Missing mapconfig in Datasource constructor")]
    MissingMapConfig,
    /// A descriptor could not be loaded (unreadable file, bad JSON, bad
    /// tile template).
    #[error("invalid datasource configuration: {0}")]
    InvalidDescriptor(String),
    /// Tile coordinates outside the zoom level's grid.
    #[error("invalid tile coordinates {z}/{x}/{y}")]
    InvalidTileCoord { z: u8, x: u32, y: u32 },
    /// The tile resource could not be read or returned a non-200 status.
    #[error("failed to fetch {uri}: {reason}")]
    Fetch { uri: String, reason: String },
    /// The source kind cannot assemble tiles yet.
    #[error("{0} not implemented yet")]
    NotImplemented(&'static str),
    /// Opaque failure reported by the rendering collaborator.
    #[error("render failed: {0}")]
    Render(String),
    /// Re-deflating an uncompressed tile failed.
    #[error("tile recompression failed: {0}")]
    Recompress(#[from] std::io::Error),
    /// The shared HTTP client could not be built.
    #[error("http client setup failed: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl SourceError {
    pub(crate) fn unknown_name(name: &str) -> Self {
        Self::UnknownDatasource(format!("Unknown datasource name '{name}'"))
    }

    pub(crate) fn fetch(uri: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised by the layergroup cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// No layergroup is stored under the token.
    #[error("layergroup '{0}' not found")]
    UnknownToken(String),
    /// The stored blob no longer parses into a valid map config.
    #[error("stored layergroup '{token}' is corrupt: {reason}")]
    Corrupt { token: String, reason: String },
    /// The external store failed.
    #[error("cache store failure: {0}")]
    Store(#[from] anyhow::Error),
}
