//! Map configs: the resolved form of a client's layergroup document.
//!
//! A [`MapConfig`] is an ordered list of [`Layer`]s plus an optional
//! datasource name. Its [`id`](MapConfig::id) is a content hash of the
//! canonical serialization, so structurally equal documents share an id and
//! any change to SQL, style, widgets, or applied filters produces a new one.
//!
//! Filter application never mutates a config. [`MapConfig::apply_filters`]
//! validates the whole filter document against a copy of the layers and
//! returns a new, separately identified config.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::MapConfigError;
use crate::hash::content_id;
use crate::layer::Layer;
use crate::widget::WidgetRef;

/// Oldest supported layergroup document version.
pub const MIN_VERSION: Version = Version::new(1, 0, 0);

/// Newest supported layergroup document version.
pub const MAX_VERSION: Version = Version::new(1, 5, 0);

/// First version that accepts `widgets` on layers.
pub const WIDGETS_VERSION: Version = Version::new(1, 5, 0);

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

/// `MAJOR.MINOR.PATCH` document version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Patch component.
    pub patch: u32,
}

impl Version {
    /// Creates a version from its components.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses `MAJOR.MINOR.PATCH`. Returns `None` on any other shape.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split('.').map(|p| p.parse::<u32>().ok());
        let version = Self::new(parts.next()??, parts.next()??, parts.next()??);
        parts.next().is_none().then_some(version)
    }

    /// Whether a document of this version may be created.
    #[must_use]
    pub fn is_supported(self) -> bool {
        self >= MIN_VERSION
            && (self.major, self.minor) <= (MAX_VERSION.major, MAX_VERSION.minor)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

// ---------------------------------------------------------------------------
// MapConfig
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct MapConfigDocument {
    version: String,
    #[serde(default)]
    datasource: Option<String>,
    layers: Vec<Layer>,
}

#[derive(Serialize)]
struct MapConfigView<'a> {
    version: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    datasource: Option<&'a str>,
    layers: &'a [Layer],
}

#[derive(Deserialize)]
struct FilterDocument {
    layers: Vec<Map<String, Value>>,
}

/// A validated layergroup configuration with a content-derived id.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    version: String,
    datasource: Option<String>,
    layers: Vec<Layer>,
    id: String,
}

impl MapConfig {
    /// Validates a client document and derives its id.
    ///
    /// # Errors
    ///
    /// Returns [`MapConfigError::InvalidMapConfig`] when the document does
    /// not parse, declares an unsupported version, has no layers, a layer
    /// misses its SQL or style, or a widget definition is invalid or not
    /// available in the declared version.
    pub fn create(document: &Value) -> Result<Self, MapConfigError> {
        let doc: MapConfigDocument = serde_json::from_value(document.clone())
            .map_err(|e| MapConfigError::invalid(e.to_string()))?;
        Self::from_parts(doc.version, doc.datasource, doc.layers)
    }

    /// Parses JSON text and delegates to [`MapConfig::create`].
    ///
    /// # Errors
    ///
    /// Returns [`MapConfigError::InvalidMapConfig`] on malformed JSON or an
    /// invalid document.
    pub fn from_json(text: &str) -> Result<Self, MapConfigError> {
        let document: Value =
            serde_json::from_str(text).map_err(|e| MapConfigError::invalid(e.to_string()))?;
        Self::create(&document)
    }

    fn from_parts(
        version: String,
        datasource: Option<String>,
        layers: Vec<Layer>,
    ) -> Result<Self, MapConfigError> {
        let parsed = Version::parse(&version)
            .ok_or_else(|| MapConfigError::invalid(format!("malformed version '{version}'")))?;
        if !parsed.is_supported() {
            return Err(MapConfigError::invalid(format!(
                "unsupported version {version}"
            )));
        }
        if layers.is_empty() {
            return Err(MapConfigError::invalid("missing layers"));
        }
        if datasource.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(MapConfigError::invalid("empty datasource name"));
        }
        for (index, layer) in layers.iter().enumerate() {
            layer
                .check()
                .map_err(|reason| MapConfigError::invalid(format!("layer {index}: {reason}")))?;
            if !layer.options.widgets.is_empty() && parsed < WIDGETS_VERSION {
                return Err(MapConfigError::invalid(format!(
                    "layer {index}: widgets need version {WIDGETS_VERSION} or later"
                )));
            }
        }

        let mut config = Self {
            version,
            datasource,
            layers,
            id: String::new(),
        };
        config.id = content_id(&config.to_json()?);
        Ok(config)
    }

    /// Content-addressed identifier. Stable for the lifetime of the value.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Document version as given by the client.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Name of the custom datasource, if one was requested.
    #[must_use]
    pub fn datasource(&self) -> Option<&str> {
        self.datasource.as_deref()
    }

    /// All layers in order.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Number of layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Layer at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`MapConfigError::NotFound`] if `index` is out of range.
    pub fn layer(&self, index: usize) -> Result<&Layer, MapConfigError> {
        self.layers
            .get(index)
            .ok_or_else(|| MapConfigError::NotFound(format!("layer {index}")))
    }

    /// Widget `name` on layer `layer_index`, resolved against that layer.
    ///
    /// # Errors
    ///
    /// Returns [`MapConfigError::NotFound`] if the layer or widget is missing.
    pub fn widget(&self, layer_index: usize, name: &str) -> Result<WidgetRef<'_>, MapConfigError> {
        let layer = self.layer(layer_index)?;
        let (name, widget) = layer
            .options
            .widgets
            .get_key_value(name)
            .ok_or_else(|| widget_not_found(layer_index, name))?;
        Ok(WidgetRef {
            name,
            widget,
            layer_sql: layer.sql(),
        })
    }

    /// Layer SQL names joined with `,`, as substituted into static tile
    /// templates.
    #[must_use]
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(Layer::sql).collect()
    }

    /// Applies a filter document and returns the filtered config.
    ///
    /// The document has the shape `{layers: [{<widget>: <params>}, ...]}`,
    /// indexed by layer position. Every referenced widget is validated
    /// before anything is returned; `self` and its id are never changed.
    ///
    /// # Errors
    ///
    /// - [`MapConfigError::InvalidFilterParams`] if the document is not of
    ///   the expected shape or any filter's params are invalid.
    /// - [`MapConfigError::NotFound`] if a layer index or widget name does
    ///   not exist.
    pub fn apply_filters(&self, filters: &Value) -> Result<Self, MapConfigError> {
        let doc: FilterDocument = serde_json::from_value(filters.clone()).map_err(|_| {
            MapConfigError::filter("Filter document expects a layers array of objects")
        })?;

        let mut layers = self.layers.clone();
        for (index, layer_filters) in doc.layers.iter().enumerate() {
            if layer_filters.is_empty() {
                continue;
            }
            let layer = layers
                .get_mut(index)
                .ok_or_else(|| MapConfigError::NotFound(format!("layer {index}")))?;
            for (name, params) in layer_filters {
                let widget = layer
                    .options
                    .widgets
                    .get(name)
                    .ok_or_else(|| widget_not_found(index, name))?;
                let filtered = widget.with_filter(params)?;
                debug!(layer = index, widget = %name, "applying widget filter");
                layer.options.widgets.insert(name.clone(), filtered);
            }
        }

        Self::from_parts(self.version.clone(), self.datasource.clone(), layers)
    }

    /// Canonical document form. Round-trips through [`MapConfig::create`].
    ///
    /// # Errors
    ///
    /// Returns [`MapConfigError::InvalidMapConfig`] if a value cannot be
    /// represented as JSON.
    pub fn to_json(&self) -> Result<Value, MapConfigError> {
        serde_json::to_value(self).map_err(|e| MapConfigError::invalid(e.to_string()))
    }
}

impl Serialize for MapConfig {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        MapConfigView {
            version: &self.version,
            datasource: self.datasource.as_deref(),
            layers: &self.layers,
        }
        .serialize(serializer)
    }
}

fn widget_not_found(layer_index: usize, name: &str) -> MapConfigError {
    MapConfigError::NotFound(format!("widget '{name}' on layer {layer_index}"))
}
