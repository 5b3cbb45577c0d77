//! Binds layergroups to tile sources.
//!
//! [`DatasourceFactory`] is the injection point for the descriptor table.
//! It rewrites render URIs for layergroups whose datasource is configured
//! and hands out [`DatasourceHandler`]s that open per-request
//! [`TileSource`]s.

use std::collections::BTreeMap;
use std::sync::Arc;

use layergroup_core::MapConfig;
use tracing::{debug, info};

use super::descriptor::{DatasourceDescriptor, DatasourceTable};
use crate::config::ServerConfig;
use crate::error::SourceError;
use crate::render::{RenderLoader, RenderProtocol, RenderUri, SourceBinding, WEB_MERCATOR_SRS};
use crate::source::{PgsqlVectorTileSource, StaticVectorTileSource, TileAssembler, TileFetcher, TileSource};

/// Routes layergroups to the default loader or a custom datasource.
pub struct DatasourceFactory {
    handler: DatasourceHandler,
}

impl DatasourceFactory {
    /// Creates a factory over `table`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::HttpClient`] if the shared HTTP client cannot
    /// be built.
    pub fn new(table: Arc<DatasourceTable>, config: &ServerConfig) -> Result<Self, SourceError> {
        Ok(Self {
            handler: DatasourceHandler {
                table,
                fetcher: TileFetcher::new(config)?,
                assembler: None,
            },
        })
    }

    /// Sets the collaborator that assembles database-backed tiles.
    #[must_use]
    pub fn with_assembler(mut self, assembler: Arc<dyn TileAssembler>) -> Self {
        self.handler.assembler = Some(assembler);
        self
    }

    /// The descriptor table.
    #[must_use]
    pub fn table(&self) -> &DatasourceTable {
        &self.handler.table
    }

    /// Handler the rendering pipeline uses to open sources.
    #[must_use]
    pub fn handler(&self) -> DatasourceHandler {
        self.handler.clone()
    }

    /// Prepares `uri` for `map_config` and builds a renderer with `loader`.
    ///
    /// Layergroups without a configured datasource get `uri` unchanged.
    /// Otherwise the style document is rewritten for the vector pipeline
    /// and a [`SourceBinding`] is attached.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Render`] if the loader fails.
    pub async fn load_uri<L: RenderLoader>(
        &self,
        map_config: Arc<MapConfig>,
        mut uri: RenderUri,
        loader: &L,
    ) -> Result<L::Renderer, SourceError> {
        let descriptor = map_config
            .datasource()
            .and_then(|name| self.handler.table.get(name));

        if let Some(descriptor) = descriptor {
            if matches!(descriptor, DatasourceDescriptor::Static { .. }) {
                let renames: BTreeMap<String, String> = map_config
                    .layer_names()
                    .into_iter()
                    .enumerate()
                    .map(|(index, name)| (format!("layer{index}"), name.to_string()))
                    .collect();
                uri.style.rename_layers(&renames);
            }
            uri.style.strip_datasources();
            uri.style.force_srs(WEB_MERCATOR_SRS);
            uri.protocol = RenderProtocol::Vector;
            uri.source = Some(SourceBinding::for_map_config(Arc::clone(&map_config)));
            info!(
                layergroup = map_config.id(),
                datasource = map_config.datasource().unwrap_or_default(),
                kind = descriptor.kind(),
                "binding layergroup to custom datasource"
            );
        } else {
            debug!(layergroup = map_config.id(), "using default render source");
        }

        loader
            .load(uri)
            .await
            .map_err(|e| SourceError::Render(e.to_string()))
    }
}

/// Opens tile sources for bound render URIs. Cheap to clone.
#[derive(Clone)]
pub struct DatasourceHandler {
    table: Arc<DatasourceTable>,
    fetcher: TileFetcher,
    assembler: Option<Arc<dyn TileAssembler>>,
}

impl std::fmt::Debug for DatasourceHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasourceHandler")
            .field("datasources", &self.table.len())
            .field("assembler", &self.assembler.is_some())
            .finish_non_exhaustive()
    }
}

impl DatasourceHandler {
    /// Opens the source named by `binding`'s map config.
    ///
    /// # Errors
    ///
    /// - [`SourceError::MissingMapConfig`] if the binding has no map config.
    /// - [`SourceError::UnknownDatasource`] if the map config's datasource
    ///   is absent or not configured.
    pub fn open(&self, binding: &SourceBinding) -> Result<TileSource, SourceError> {
        let map_config = binding
            .map_config
            .as_ref()
            .ok_or(SourceError::MissingMapConfig)?;
        self.open_for(map_config)
    }

    /// Opens the source for `map_config`'s datasource.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::UnknownDatasource`] if the datasource is absent
    /// or not configured.
    pub fn open_for(&self, map_config: &MapConfig) -> Result<TileSource, SourceError> {
        let name = map_config.datasource().unwrap_or_default();
        let source = match self.table.resolve(name)? {
            DatasourceDescriptor::Static { template } => TileSource::Static(
                StaticVectorTileSource::new(template.clone(), map_config, self.fetcher.clone()),
            ),
            DatasourceDescriptor::Postgres => TileSource::Postgres(PgsqlVectorTileSource::new(
                map_config,
                self.assembler.clone(),
            )),
        };
        debug!(datasource = name, layergroup = map_config.id(), "opened tile source");
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::TileTemplate;
    use crate::render::{DatasourceDeclaration, StyleDocument, StyleLayer};
    use crate::source::{TileCoord, VectorTileSource};
    use async_trait::async_trait;
    use serde_json::json;

    struct Capture;

    #[async_trait]
    impl RenderLoader for Capture {
        type Renderer = RenderUri;

        async fn load(&self, uri: RenderUri) -> anyhow::Result<RenderUri> {
            Ok(uri)
        }
    }

    struct Broken;

    #[async_trait]
    impl RenderLoader for Broken {
        type Renderer = ();

        async fn load(&self, _uri: RenderUri) -> anyhow::Result<()> {
            anyhow::bail!("style compilation failed")
        }
    }

    fn map_config(datasource: Option<&str>) -> Arc<MapConfig> {
        let mut doc = json!({
            "version": "1.0.1",
            "layers": [
                {"options": {"sql": "roads", "cartocss": "#l{}", "cartocss_version": "2.0.1"}},
                {"options": {"sql": "rivers", "cartocss": "#l{}", "cartocss_version": "2.0.1"}}
            ]
        });
        if let Some(name) = datasource {
            doc["datasource"] = json!(name);
        }
        Arc::new(MapConfig::create(&doc).unwrap())
    }

    fn style() -> StyleDocument {
        let mut layer0 = StyleLayer::named("layer0");
        layer0.srs = Some("+init=epsg:4326".to_string());
        layer0.datasource = Some(DatasourceDeclaration {
            parameters: BTreeMap::from([("type".to_string(), "postgis".to_string())]),
        });
        StyleDocument {
            srs: "+init=epsg:4326".to_string(),
            layers: vec![layer0, StyleLayer::named("layer1")],
        }
    }

    fn factory() -> DatasourceFactory {
        let table = DatasourceTable::new()
            .with(
                "static",
                DatasourceDescriptor::Static {
                    template: TileTemplate::parse("http://tiles.local/{layers}/{z}/{x}/{y}.mvt")
                        .unwrap(),
                },
            )
            .with("mvtsql", DatasourceDescriptor::Postgres);
        DatasourceFactory::new(Arc::new(table), &ServerConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn without_datasource_uri_is_unchanged() {
        let uri = factory()
            .load_uri(map_config(None), RenderUri::mapnik(style()), &Capture)
            .await
            .unwrap();
        assert_eq!(uri.protocol, RenderProtocol::Mapnik);
        assert_eq!(uri.style, style());
        assert!(uri.source.is_none());
    }

    #[tokio::test]
    async fn unconfigured_datasource_uri_is_unchanged() {
        let uri = factory()
            .load_uri(map_config(Some("elsewhere")), RenderUri::mapnik(style()), &Capture)
            .await
            .unwrap();
        assert_eq!(uri.protocol, RenderProtocol::Mapnik);
        assert!(uri.source.is_none());
    }

    #[tokio::test]
    async fn static_datasource_renames_layers_and_binds() {
        let config = map_config(Some("static"));
        let uri = factory()
            .load_uri(Arc::clone(&config), RenderUri::mapnik(style()), &Capture)
            .await
            .unwrap();
        assert_eq!(uri.protocol, RenderProtocol::Vector);
        assert_eq!(uri.style.srs, WEB_MERCATOR_SRS);
        let names: Vec<&str> = uri.style.layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["roads", "rivers"]);
        assert!(uri.style.layers.iter().all(|l| l.datasource.is_none()));
        assert!(uri
            .style
            .layers
            .iter()
            .all(|l| l.srs.as_deref() == Some(WEB_MERCATOR_SRS)));
        let binding = uri.source.unwrap();
        assert_eq!(binding.datasource, "static");
        assert_eq!(binding.map_config.unwrap().id(), config.id());
    }

    #[tokio::test]
    async fn postgres_datasource_keeps_layer_names() {
        let uri = factory()
            .load_uri(map_config(Some("mvtsql")), RenderUri::mapnik(style()), &Capture)
            .await
            .unwrap();
        assert_eq!(uri.protocol, RenderProtocol::Vector);
        assert_eq!(uri.style.layers[0].name, "layer0");
        assert!(uri.style.layers[0].datasource.is_none());
        assert_eq!(uri.source.unwrap().datasource, "mvtsql");
    }

    #[tokio::test]
    async fn loader_failure_is_render_error() {
        let err = factory()
            .load_uri(map_config(None), RenderUri::mapnik(style()), &Broken)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Render(ref reason) if reason == "style compilation failed"));
    }

    #[test]
    fn open_without_map_config_fails() {
        let binding = SourceBinding {
            datasource: "static".to_string(),
            map_config: None,
        };
        let err = factory().handler().open(&binding).unwrap_err();
        assert!(matches!(err, SourceError::MissingMapConfig));
        assert_eq!(err.to_string(), "Missing mapconfig in Datasource constructor");
    }

    #[test]
    fn open_unknown_datasource_fails() {
        let binding = SourceBinding::for_map_config(map_config(Some("elsewhere")));
        let err = factory().handler().open(&binding).unwrap_err();
        assert_eq!(err.to_string(), "Unknown datasource name 'elsewhere'");
    }

    #[test]
    fn open_builds_matching_source() {
        let handler = factory().handler();
        let static_source = handler
            .open(&SourceBinding::for_map_config(map_config(Some("static"))))
            .unwrap();
        match static_source {
            TileSource::Static(source) => assert_eq!(source.layers(), "roads,rivers"),
            TileSource::Postgres(_) => panic!("expected static source"),
        }
        let pg_source = handler.open_for(&map_config(Some("mvtsql"))).unwrap();
        assert!(matches!(pg_source, TileSource::Postgres(_)));
    }

    #[tokio::test]
    async fn assembler_reaches_postgres_sources() {
        struct Fixed;

        #[async_trait]
        impl TileAssembler for Fixed {
            async fn assemble(
                &self,
                _coord: TileCoord,
                layers: &[crate::source::LayerQuery],
            ) -> anyhow::Result<bytes::Bytes> {
                Ok(bytes::Bytes::from(layers.len().to_string()))
            }
        }

        let handler = factory().with_assembler(Arc::new(Fixed)).handler();
        let source = handler.open_for(&map_config(Some("mvtsql"))).unwrap();
        let tile = source.get_tile(TileCoord::new(0, 0, 0).unwrap()).await.unwrap();
        assert_eq!(tile, bytes::Bytes::from("2"));
    }
}
