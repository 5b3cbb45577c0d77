//! Structured style documents handed to the rendering engine.
//!
//! The engine compiles a layergroup's styles into a map document of named
//! layers, each with a projection, style references, and an optional
//! embedded datasource declaration. Before a vector-tile hand-off the
//! document is rewritten on this structure, not on its serialized text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Web Mercator projection. Vector tiles are always served in it.
pub const WEB_MERCATOR_SRS: &str = "+init=epsg:3857";

/// Embedded datasource declaration of a style layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasourceDeclaration {
    /// Engine-specific parameters (`type`, `dbname`, `table`, ...).
    pub parameters: BTreeMap<String, String>,
}

/// One layer of a style document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleLayer {
    /// Layer name. The compiler names layer `i` as `layer{i}`.
    pub name: String,
    /// Projection of the layer's data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srs: Option<String>,
    /// Names of the styles applied to this layer.
    #[serde(default)]
    pub styles: Vec<String>,
    /// Embedded datasource, if the compiler emitted one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasource: Option<DatasourceDeclaration>,
}

impl StyleLayer {
    /// A layer named `name` using a style of the same name.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            srs: None,
            styles: vec![name.to_string()],
            datasource: None,
        }
    }
}

/// A compiled map style document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleDocument {
    /// Projection of the output map.
    pub srs: String,
    /// Layers in draw order.
    pub layers: Vec<StyleLayer>,
}

impl StyleDocument {
    /// Renames layers (and style references to them) in one pass.
    ///
    /// Each name is looked up once in `renames`, so a new name is never
    /// renamed again and `layer1` never matches `layer10`. Returns whether
    /// anything changed.
    pub fn rename_layers(&mut self, renames: &BTreeMap<String, String>) -> bool {
        let mut changed = false;
        for layer in &mut self.layers {
            if let Some(to) = renames.get(&layer.name) {
                layer.name.clone_from(to);
                changed = true;
            }
            for style in &mut layer.styles {
                if let Some(to) = renames.get(style.as_str()) {
                    style.clone_from(to);
                    changed = true;
                }
            }
        }
        changed
    }

    /// Removes every embedded datasource declaration.
    pub fn strip_datasources(&mut self) {
        for layer in &mut self.layers {
            layer.datasource = None;
        }
    }

    /// Sets the map projection and every layer's projection to `srs`.
    pub fn force_srs(&mut self, srs: &str) {
        self.srs = srs.to_string();
        for layer in &mut self.layers {
            layer.srs = Some(srs.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> StyleDocument {
        let mut layer0 = StyleLayer::named("layer0");
        layer0.srs = Some("+init=epsg:4326".to_string());
        layer0.datasource = Some(DatasourceDeclaration {
            parameters: BTreeMap::from([("type".to_string(), "postgis".to_string())]),
        });
        StyleDocument {
            srs: "+init=epsg:4326".to_string(),
            layers: vec![layer0, StyleLayer::named("layer1"), StyleLayer::named("layer10")],
        }
    }

    fn renames(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
            .collect()
    }

    #[test]
    fn rename_matches_exact_names_only() {
        let mut doc = document();
        assert!(doc.rename_layers(&renames(&[("layer1", "roads")])));
        assert_eq!(doc.layers[1].name, "roads");
        assert_eq!(doc.layers[1].styles, vec!["roads"]);
        assert_eq!(doc.layers[2].name, "layer10");
        assert!(!doc.rename_layers(&renames(&[("missing", "x")])));
    }

    #[test]
    fn rename_is_single_pass() {
        let mut doc = document();
        doc.rename_layers(&renames(&[("layer0", "layer1"), ("layer1", "rivers")]));
        assert_eq!(doc.layers[0].name, "layer1");
        assert_eq!(doc.layers[1].name, "rivers");
    }

    #[test]
    fn strip_removes_all_declarations() {
        let mut doc = document();
        doc.strip_datasources();
        assert!(doc.layers.iter().all(|l| l.datasource.is_none()));
    }

    #[test]
    fn force_srs_overrides_every_projection() {
        let mut doc = document();
        doc.force_srs(WEB_MERCATOR_SRS);
        assert_eq!(doc.srs, WEB_MERCATOR_SRS);
        assert!(doc
            .layers
            .iter()
            .all(|l| l.srs.as_deref() == Some(WEB_MERCATOR_SRS)));
    }
}
