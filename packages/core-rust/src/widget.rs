//! Widgets: named analytical facets attached to a layer.
//!
//! A widget compiles a statement over its layer's base SQL. Aggregation
//! widgets group and count a categorical column; histogram widgets select a
//! numeric column for bucketing. Each widget owns at most one [`Filter`],
//! which routes the base query through a filtering subselect before the
//! widget's own wrapper is applied.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MapConfigError;
use crate::filter::{CategoryFilter, Filter, RangeFilter};
use crate::sql::is_identifier;

/// Subselect alias wrapping the source of an aggregation widget.
pub const AGGREGATION_ALIAS: &str = "_cdb_aggregation";

/// Subselect alias wrapping the source of a histogram widget.
pub const HISTOGRAM_ALIAS: &str = "_cdb_histogram";

/// Bucket count used when a histogram does not specify `bins`.
pub const DEFAULT_HISTOGRAM_BINS: u32 = 10;

/// Discriminant for the supported widget kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetType {
    /// Categorical count / group-by.
    Aggregation,
    /// Numeric range bucketing.
    Histogram,
}

impl WidgetType {
    /// Wire name of the widget type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aggregation => "aggregation",
            Self::Histogram => "histogram",
        }
    }
}

/// Options block of a widget definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetOptions {
    /// Grouping (aggregation) or bucketing (histogram) column.
    pub column: String,
    /// Aggregate function name, e.g. `count`. Required for aggregations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,
    /// Histogram bucket count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bins: Option<u32>,
}

/// A widget definition plus its applied filter, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    /// Widget kind.
    #[serde(rename = "type")]
    pub widget_type: WidgetType,
    /// Column and aggregation settings.
    pub options: WidgetOptions,
    /// Filter applied through [`Widget::with_filter`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
}

impl Widget {
    /// Creates an unfiltered aggregation widget.
    #[must_use]
    pub fn aggregation(column: &str, aggregation: &str) -> Self {
        Self {
            widget_type: WidgetType::Aggregation,
            options: WidgetOptions {
                column: column.to_string(),
                aggregation: Some(aggregation.to_string()),
                bins: None,
            },
            filter: None,
        }
    }

    /// Creates an unfiltered histogram widget.
    #[must_use]
    pub fn histogram(column: &str, bins: Option<u32>) -> Self {
        Self {
            widget_type: WidgetType::Histogram,
            options: WidgetOptions {
                column: column.to_string(),
                aggregation: None,
                bins,
            },
            filter: None,
        }
    }

    /// Grouping or bucketing column.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.options.column
    }

    /// Histogram bucket count, falling back to [`DEFAULT_HISTOGRAM_BINS`].
    #[must_use]
    pub fn bins(&self) -> u32 {
        self.options.bins.unwrap_or(DEFAULT_HISTOGRAM_BINS)
    }

    /// Checks the definition is complete and safe to interpolate into SQL.
    ///
    /// Returns a human-readable reason on failure; the caller attaches the
    /// widget's position.
    pub(crate) fn check(&self) -> Result<(), String> {
        if !is_identifier(&self.options.column) {
            return Err(format!(
                "column '{}' is not a valid identifier",
                self.options.column
            ));
        }
        match self.widget_type {
            WidgetType::Aggregation => match self.options.aggregation.as_deref() {
                Some(name) if is_identifier(name) => {}
                Some(name) => {
                    return Err(format!("aggregation '{name}' is not a valid identifier"))
                }
                None => return Err("aggregation widgets need an aggregation".to_string()),
            },
            WidgetType::Histogram => {
                if self.options.bins == Some(0) {
                    return Err("histogram bins must be at least 1".to_string());
                }
            }
        }
        if let Some(filter) = &self.filter {
            filter.check()?;
        }
        match (&self.filter, self.widget_type) {
            (None, _) => Ok(()),
            (Some(filter), _) if filter.column() != self.options.column => Err(format!(
                "filter column '{}' does not match widget column",
                filter.column()
            )),
            (Some(Filter::Category(_)), WidgetType::Aggregation)
            | (Some(Filter::Range(_)), WidgetType::Histogram) => Ok(()),
            (Some(_), kind) => Err(format!("filter kind does not fit a {} widget", kind.as_str())),
        }
    }

    /// Validates filter `params` for this widget's kind and returns a copy
    /// of the widget carrying the new filter.
    ///
    /// Aggregation widgets take category params; histogram widgets take
    /// range params. Any previous filter is replaced. `self` is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`MapConfigError::InvalidFilterParams`] if `params` are invalid.
    pub fn with_filter(&self, params: &Value) -> Result<Self, MapConfigError> {
        let column = self.column();
        let filter = match self.widget_type {
            WidgetType::Aggregation => Filter::Category(CategoryFilter::validate(column, params)?),
            WidgetType::Histogram => Filter::Range(RangeFilter::validate(column, params)?),
        };
        Ok(Self {
            filter: Some(filter),
            ..self.clone()
        })
    }

    /// The widget's source: `layer_sql`, routed through its filter if any.
    #[must_use]
    pub fn source_sql(&self, layer_sql: &str) -> String {
        match &self.filter {
            Some(filter) => filter.apply(layer_sql),
            None => layer_sql.to_string(),
        }
    }

    /// Compiles the widget statement over `layer_sql`.
    #[must_use]
    pub fn sql(&self, layer_sql: &str) -> String {
        let source = self.source_sql(layer_sql);
        let column = self.column();
        match self.widget_type {
            WidgetType::Aggregation => {
                let aggregation = self.options.aggregation.as_deref().unwrap_or("count");
                format!(
                    "SELECT {aggregation}(*) AS count, {column} FROM ({source}) {AGGREGATION_ALIAS} \
                     GROUP BY {column} ORDER BY count DESC"
                )
            }
            WidgetType::Histogram => format!(
                "SELECT {column} FROM ({source}) {HISTOGRAM_ALIAS} WHERE {column} IS NOT NULL"
            ),
        }
    }
}

/// A widget resolved against its layer, as returned by
/// [`MapConfig::widget`](crate::MapConfig::widget).
#[derive(Debug, Clone, Copy)]
pub struct WidgetRef<'a> {
    pub(crate) name: &'a str,
    pub(crate) widget: &'a Widget,
    pub(crate) layer_sql: &'a str,
}

impl<'a> WidgetRef<'a> {
    /// Widget name, unique within its layer.
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Underlying widget definition.
    #[must_use]
    pub fn widget(&self) -> &'a Widget {
        self.widget
    }

    /// Applied filter, if any.
    #[must_use]
    pub fn filter(&self) -> Option<&'a Filter> {
        self.widget.filter.as_ref()
    }

    /// Compiled widget statement over the layer's base SQL.
    #[must_use]
    pub fn sql(&self) -> String {
        self.widget.sql(self.layer_sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LAYER_SQL: &str = "select * from populated_places_simple_reduced";

    #[test]
    fn aggregation_sql_unfiltered() {
        let widget = Widget::aggregation("adm0name", "count");
        assert_eq!(
            widget.sql(LAYER_SQL),
            "SELECT count(*) AS count, adm0name FROM \
             (select * from populated_places_simple_reduced) _cdb_aggregation \
             GROUP BY adm0name ORDER BY count DESC"
        );
    }

    #[test]
    fn aggregation_sql_with_accept_filter() {
        let widget = Widget::aggregation("adm0name", "count")
            .with_filter(&json!({"accept": ["Spain"]}))
            .unwrap();
        assert_eq!(
            widget.sql(LAYER_SQL),
            "SELECT count(*) AS count, adm0name FROM \
             (SELECT * FROM (select * from populated_places_simple_reduced) _cdb_category_filter \
             WHERE adm0name IN ($escape_0$Spain$escape_0$)) _cdb_aggregation \
             GROUP BY adm0name ORDER BY count DESC"
        );
    }

    #[test]
    fn with_filter_leaves_source_widget_untouched() {
        let widget = Widget::aggregation("adm0name", "count");
        let filtered = widget.with_filter(&json!({"reject": ["Spain"]})).unwrap();
        assert!(widget.filter.is_none());
        assert!(filtered.filter.is_some());
        assert_ne!(widget.sql(LAYER_SQL), filtered.sql(LAYER_SQL));
    }

    #[test]
    fn with_filter_replaces_previous_filter() {
        let widget = Widget::aggregation("adm0name", "count")
            .with_filter(&json!({"accept": ["Spain"]}))
            .unwrap()
            .with_filter(&json!({"accept": ["USA"]}))
            .unwrap();
        assert_eq!(
            widget.filter.unwrap().predicate(),
            "adm0name IN ($escape_0$USA$escape_0$)"
        );
    }

    #[test]
    fn histogram_takes_range_params() {
        let widget = Widget::histogram("pop_max", None)
            .with_filter(&json!({"min": 0, "max": 100}))
            .unwrap();
        assert_eq!(
            widget.sql("select * from t"),
            "SELECT pop_max FROM (SELECT * FROM (select * from t) _cdb_range_filter \
             WHERE pop_max BETWEEN 0 AND 100) _cdb_histogram WHERE pop_max IS NOT NULL"
        );
        assert_eq!(widget.bins(), DEFAULT_HISTOGRAM_BINS);
    }

    #[test]
    fn histogram_rejects_category_params() {
        let err = Widget::histogram("pop_max", Some(5))
            .with_filter(&json!({"accept": ["a"]}))
            .unwrap_err();
        assert!(matches!(err, MapConfigError::InvalidFilterParams(_)));
    }

    #[test]
    fn check_rejects_unsafe_columns() {
        let widget = Widget::aggregation("name); DROP TABLE t; --", "count");
        assert!(widget.check().is_err());
    }

    #[test]
    fn check_requires_aggregation_function() {
        let mut widget = Widget::aggregation("adm0name", "count");
        widget.options.aggregation = None;
        assert_eq!(
            widget.check().unwrap_err(),
            "aggregation widgets need an aggregation"
        );
    }

    #[test]
    fn check_rejects_zero_bins() {
        assert!(Widget::histogram("pop_max", Some(0)).check().is_err());
        assert!(Widget::histogram("pop_max", Some(1)).check().is_ok());
    }

    #[test]
    fn check_rejects_mismatched_filter_kind() {
        let mut widget = Widget::histogram("pop_max", None);
        widget.filter = Widget::aggregation("pop_max", "count")
            .with_filter(&json!({"accept": ["a"]}))
            .unwrap()
            .filter;
        assert!(widget.check().is_err());
    }

    #[test]
    fn widget_deserializes_from_client_document() {
        let widget: Widget = serde_json::from_value(json!({
            "type": "aggregation",
            "options": {"aggregation": "count", "column": "adm0name"}
        }))
        .unwrap();
        assert_eq!(widget, Widget::aggregation("adm0name", "count"));
    }

    #[test]
    fn unknown_widget_type_fails_to_deserialize() {
        let result = serde_json::from_value::<Widget>(json!({
            "type": "formula",
            "options": {"column": "adm0name"}
        }));
        assert!(result.is_err());
    }
}
