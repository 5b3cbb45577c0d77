//! Layers: one renderable unit of a map config.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::widget::Widget;

/// Rendering backend hint for a layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    /// Mapnik-rendered layer. Default when `type` is omitted.
    #[default]
    Mapnik,
    /// Legacy alias of [`LayerType::Mapnik`].
    Cartodb,
}

/// Options block of a layer definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerOptions {
    /// Base query, or the logical layer name for static tile sources.
    pub sql: String,
    /// Style source.
    pub cartocss: String,
    /// Version of the style language `cartocss` is written in.
    pub cartocss_version: String,
    /// Widgets keyed by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub widgets: BTreeMap<String, Widget>,
    /// Columns exposed for interactivity. Accepts a comma-separated string
    /// or a list on input; always serialized as a list.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_interactivity"
    )]
    pub interactivity: Option<Vec<String>>,
}

/// A single layer of a map config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Backend hint.
    #[serde(rename = "type", default)]
    pub layer_type: LayerType,
    /// Query, style, and widgets.
    pub options: LayerOptions,
}

impl Layer {
    /// Base SQL as supplied by the client.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.options.sql
    }

    /// Widget by name.
    #[must_use]
    pub fn widget(&self, name: &str) -> Option<&Widget> {
        self.options.widgets.get(name)
    }

    /// SQL the layer actually renders: the base query routed through every
    /// filtered widget's subselect, in widget-name order.
    #[must_use]
    pub fn effective_sql(&self) -> String {
        self.options
            .widgets
            .values()
            .filter_map(|w| w.filter.as_ref())
            .fold(self.options.sql.clone(), |sql, filter| filter.apply(&sql))
    }

    /// Whether any widget on this layer carries a filter.
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        self.options.widgets.values().any(|w| w.filter.is_some())
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        for (field, value) in [
            ("sql", &self.options.sql),
            ("cartocss", &self.options.cartocss),
            ("cartocss_version", &self.options.cartocss_version),
        ] {
            if value.trim().is_empty() {
                return Err(format!("missing {field}"));
            }
        }
        for (name, widget) in &self.options.widgets {
            widget
                .check()
                .map_err(|reason| format!("widget '{name}': {reason}"))?;
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Interactivity {
    Joined(String),
    List(Vec<String>),
}

fn deserialize_interactivity<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Interactivity>::deserialize(deserializer)?;
    Ok(raw.map(|value| match value {
        Interactivity::Joined(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Interactivity::List(list) => list,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layer(widgets: serde_json::Value) -> Layer {
        serde_json::from_value(json!({
            "type": "mapnik",
            "options": {
                "sql": "select * from t",
                "cartocss": "#layer0 { marker-fill: red; }",
                "cartocss_version": "2.0.1",
                "widgets": widgets
            }
        }))
        .unwrap()
    }

    #[test]
    fn layer_type_defaults_to_mapnik() {
        let layer: Layer = serde_json::from_value(json!({
            "options": {"sql": "coastline", "cartocss": "#layer { }", "cartocss_version": "2.0.1"}
        }))
        .unwrap();
        assert_eq!(layer.layer_type, LayerType::Mapnik);
        assert!(layer.options.widgets.is_empty());
    }

    #[test]
    fn interactivity_accepts_string_or_list() {
        let from_string: Layer = serde_json::from_value(json!({
            "options": {
                "sql": "q", "cartocss": "c", "cartocss_version": "2.0.1",
                "interactivity": "cartodb_id, name"
            }
        }))
        .unwrap();
        assert_eq!(
            from_string.options.interactivity,
            Some(vec!["cartodb_id".to_string(), "name".to_string()])
        );

        let from_list: Layer = serde_json::from_value(json!({
            "options": {
                "sql": "q", "cartocss": "c", "cartocss_version": "2.0.1",
                "interactivity": ["cartodb_id"]
            }
        }))
        .unwrap();
        assert_eq!(from_list.options.interactivity, Some(vec!["cartodb_id".to_string()]));
    }

    #[test]
    fn effective_sql_unfiltered_is_base_sql() {
        let layer = layer(json!({}));
        assert_eq!(layer.effective_sql(), "select * from t");
        assert!(!layer.is_filtered());
    }

    #[test]
    fn effective_sql_nests_filters_in_name_order() {
        let mut layer = layer(json!({
            "country": {"type": "aggregation", "options": {"aggregation": "count", "column": "adm0name"}},
            "pop": {"type": "histogram", "options": {"column": "pop_max"}}
        }));
        for (name, params) in [
            ("pop", json!({"max": 100})),
            ("country", json!({"accept": ["Spain"]})),
        ] {
            let filtered = layer.options.widgets[name].with_filter(&params).unwrap();
            layer.options.widgets.insert(name.to_string(), filtered);
        }
        assert_eq!(
            layer.effective_sql(),
            "SELECT * FROM (SELECT * FROM (select * from t) _cdb_category_filter \
             WHERE adm0name IN ($escape_0$Spain$escape_0$)) _cdb_range_filter \
             WHERE pop_max <= 100"
        );
        assert!(layer.is_filtered());
    }

    #[test]
    fn check_reports_missing_style() {
        let mut layer = layer(json!({}));
        layer.options.cartocss = "   ".to_string();
        assert_eq!(layer.check().unwrap_err(), "missing cartocss");
    }

    #[test]
    fn check_prefixes_widget_errors() {
        let layer = layer(json!({
            "bad": {"type": "aggregation", "options": {"column": "adm0name"}}
        }));
        assert_eq!(
            layer.check().unwrap_err(),
            "widget 'bad': aggregation widgets need an aggregation"
        );
    }
}
