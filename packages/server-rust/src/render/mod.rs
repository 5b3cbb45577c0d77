//! Hand-off to the external rendering pipeline.
//!
//! The pipeline is reached through [`RenderLoader`], which turns a
//! [`RenderUri`] into whatever renderer the engine uses. Custom datasources
//! bind themselves to the URI through a [`SourceBinding`]; the engine later
//! passes that binding back to
//! [`DatasourceHandler::open`](crate::datasource::DatasourceHandler::open)
//! to fetch tile bytes.

pub mod style;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use layergroup_core::MapConfig;

pub use style::{DatasourceDeclaration, StyleDocument, StyleLayer, WEB_MERCATOR_SRS};

/// Protocol tag of a render URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderProtocol {
    /// Default raster pipeline reading the style's own datasources.
    Mapnik,
    /// Vector-tile pipeline reading from a bound datasource.
    Vector,
}

impl RenderProtocol {
    /// Wire form of the protocol tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mapnik => "mapnik:",
            Self::Vector => "vector:",
        }
    }
}

impl fmt::Display for RenderProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Datasource binding attached to a render URI.
#[derive(Debug, Clone)]
pub struct SourceBinding {
    /// Name of the bound datasource in the descriptor table.
    pub datasource: String,
    /// Layergroup the tiles are produced for.
    pub map_config: Option<Arc<MapConfig>>,
}

impl SourceBinding {
    /// Binding for `map_config`'s own datasource.
    #[must_use]
    pub fn for_map_config(map_config: Arc<MapConfig>) -> Self {
        Self {
            datasource: map_config.datasource().unwrap_or_default().to_string(),
            map_config: Some(map_config),
        }
    }
}

/// Everything the rendering pipeline needs to build a renderer.
#[derive(Debug, Clone)]
pub struct RenderUri {
    /// Pipeline selector.
    pub protocol: RenderProtocol,
    /// Compiled style.
    pub style: StyleDocument,
    /// Bound datasource, set only for custom datasources.
    pub source: Option<SourceBinding>,
}

impl RenderUri {
    /// A default-pipeline URI for `style`.
    #[must_use]
    pub fn mapnik(style: StyleDocument) -> Self {
        Self {
            protocol: RenderProtocol::Mapnik,
            style,
            source: None,
        }
    }
}

/// The external render-source loader.
#[async_trait]
pub trait RenderLoader: Send + Sync {
    /// Renderer produced by the engine.
    type Renderer: Send;

    /// Builds a renderer for `uri`.
    async fn load(&self, uri: RenderUri) -> anyhow::Result<Self::Renderer>;
}
