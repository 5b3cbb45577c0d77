//! Widget filters: validated user parameters compiled into SQL predicates.
//!
//! Filters are value objects built per filter-application call from the
//! request's parameter document. A [`CategoryFilter`] restricts a grouping
//! column by set membership; a [`RangeFilter`] bounds a numeric column.
//!
//! Applying a filter wraps a source query in a subselect:
//!
//! ```text
//! SELECT * FROM (<source>) _cdb_category_filter WHERE <predicate>
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::MapConfigError;
use crate::sql::{number_literal, quote_literal};

/// Subselect alias used when applying a [`CategoryFilter`].
pub const CATEGORY_FILTER_ALIAS: &str = "_cdb_category_filter";

/// Subselect alias used when applying a [`RangeFilter`].
pub const RANGE_FILTER_ALIAS: &str = "_cdb_range_filter";

const CATEGORY_MISSING_PARAMS: &str =
    "Category filter expects at least one array in accept or reject params";
const CATEGORY_NOT_STRING_ARRAYS: &str =
    "Category filter expects accept and reject params to be arrays of strings";
const CATEGORY_NO_VALUES: &str =
    "Category filter expects to have at least one value in accept or reject arrays";
const RANGE_MISSING_PARAMS: &str =
    "Range filter expects at least one of min or max numeric params";
const RANGE_NOT_NUMBERS: &str = "Range filter expects min and max params to be numbers";

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// A validated filter bound to a widget column.
///
/// Serialized alongside the widget it filters so that the filter state takes
/// part in the owning map config's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Filter {
    /// Set-membership filter for aggregation widgets.
    Category(CategoryFilter),
    /// Inclusive numeric bounds for histogram widgets.
    Range(RangeFilter),
}

impl Filter {
    /// Column the filter predicate applies to.
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Category(f) => &f.column,
            Self::Range(f) => &f.column,
        }
    }

    /// SQL predicate for the `WHERE` clause.
    #[must_use]
    pub fn predicate(&self) -> String {
        match self {
            Self::Category(f) => f.predicate(),
            Self::Range(f) => f.predicate(),
        }
    }

    /// Checks a deserialized filter upholds what `validate` enforces: a
    /// category filter has at least one value, a range filter at least one
    /// bound.
    pub(crate) fn check(&self) -> Result<(), String> {
        match self {
            Self::Category(f) if f.accept.is_empty() && f.reject.is_empty() => {
                Err(CATEGORY_NO_VALUES.to_string())
            }
            Self::Range(f) if f.min.is_none() && f.max.is_none() => {
                Err(RANGE_MISSING_PARAMS.to_string())
            }
            _ => Ok(()),
        }
    }

    /// Wraps `sql` in this filter's subselect.
    #[must_use]
    pub fn apply(&self, sql: &str) -> String {
        let alias = match self {
            Self::Category(_) => CATEGORY_FILTER_ALIAS,
            Self::Range(_) => RANGE_FILTER_ALIAS,
        };
        format!("SELECT * FROM ({sql}) {alias} WHERE {}", self.predicate())
    }
}

// ---------------------------------------------------------------------------
// CategoryFilter
// ---------------------------------------------------------------------------

/// Accept/reject set-membership filter.
///
/// When both lists are non-empty they combine with `AND`: accepted values are
/// matched first, then rejected values are excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFilter {
    /// Grouping column the filter restricts.
    pub column: String,
    /// Values to keep. Empty means no accept clause.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accept: Vec<String>,
    /// Values to exclude. Empty means no reject clause.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reject: Vec<String>,
}

impl CategoryFilter {
    /// Validates `params` (`{accept?: [string], reject?: [string]}`) for `column`.
    ///
    /// # Errors
    ///
    /// Returns [`MapConfigError::InvalidFilterParams`] when neither list is
    /// given, when a list is not an array of strings, or when every given
    /// list is empty.
    pub fn validate(column: &str, params: &Value) -> Result<Self, MapConfigError> {
        let accept = present_param(params, "accept");
        let reject = present_param(params, "reject");
        if accept.is_none() && reject.is_none() {
            return Err(MapConfigError::filter(CATEGORY_MISSING_PARAMS));
        }

        let accept = string_values(accept)?;
        let reject = string_values(reject)?;
        if accept.is_empty() && reject.is_empty() {
            return Err(MapConfigError::filter(CATEGORY_NO_VALUES));
        }

        Ok(Self {
            column: column.to_string(),
            accept,
            reject,
        })
    }

    /// Builds `<column> IN (...)` and/or `<column> NOT IN (...)`, accept first.
    #[must_use]
    pub fn predicate(&self) -> String {
        let mut clauses = Vec::with_capacity(2);
        if !self.accept.is_empty() {
            clauses.push(format!("{} IN ({})", self.column, quoted_list(&self.accept)));
        }
        if !self.reject.is_empty() {
            clauses.push(format!(
                "{} NOT IN ({})",
                self.column,
                quoted_list(&self.reject)
            ));
        }
        clauses.join(" AND ")
    }
}

fn present_param<'a>(params: &'a Value, name: &str) -> Option<&'a Value> {
    params.get(name).filter(|v| !v.is_null())
}

fn string_values(param: Option<&Value>) -> Result<Vec<String>, MapConfigError> {
    let Some(param) = param else {
        return Ok(Vec::new());
    };
    let items = param
        .as_array()
        .ok_or_else(|| MapConfigError::filter(CATEGORY_NOT_STRING_ARRAYS))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| MapConfigError::filter(CATEGORY_NOT_STRING_ARRAYS))
        })
        .collect()
}

fn quoted_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| quote_literal(v))
        .collect::<Vec<_>>()
        .join(",")
}

// ---------------------------------------------------------------------------
// RangeFilter
// ---------------------------------------------------------------------------

/// Inclusive `min`/`max` bounds on a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeFilter {
    /// Bucketing column the filter bounds.
    pub column: String,
    /// Inclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Number>,
    /// Inclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Number>,
}

impl RangeFilter {
    /// Validates `params` (`{min?: number, max?: number}`) for `column`.
    ///
    /// # Errors
    ///
    /// Returns [`MapConfigError::InvalidFilterParams`] when neither bound is
    /// given or when a given bound is not a number.
    pub fn validate(column: &str, params: &Value) -> Result<Self, MapConfigError> {
        let min = present_param(params, "min");
        let max = present_param(params, "max");
        if min.is_none() && max.is_none() {
            return Err(MapConfigError::filter(RANGE_MISSING_PARAMS));
        }

        Ok(Self {
            column: column.to_string(),
            min: numeric_bound(min)?,
            max: numeric_bound(max)?,
        })
    }

    /// Builds `>=`, `<=`, or `BETWEEN` depending on which bounds are set.
    #[must_use]
    pub fn predicate(&self) -> String {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) => format!(
                "{} BETWEEN {} AND {}",
                self.column,
                number_literal(min),
                number_literal(max)
            ),
            (Some(min), None) => format!("{} >= {}", self.column, number_literal(min)),
            (None, Some(max)) => format!("{} <= {}", self.column, number_literal(max)),
            (None, None) => "TRUE".to_string(),
        }
    }
}

fn numeric_bound(param: Option<&Value>) -> Result<Option<Number>, MapConfigError> {
    param
        .map(|v| {
            v.as_number()
                .filter(|n| n.as_f64().is_some_and(f64::is_finite))
                .cloned()
                .ok_or_else(|| MapConfigError::filter(RANGE_NOT_NUMBERS))
        })
        .transpose()
}
