//! Error type shared by map config creation and filter application.

/// Errors raised while building, querying, or filtering a [`MapConfig`](crate::MapConfig).
///
/// All variants are raised synchronously at the boundary that detects them.
/// A failed operation never leaves a `MapConfig` partially modified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapConfigError {
    /// The client document is malformed or uses an unsupported feature.
    #[error("invalid map config: {0}")]
    InvalidMapConfig(String),
    /// Filter parameters failed validation. The message names the violated rule.
    #[error("{0}")]
    InvalidFilterParams(String),
    /// A layer index or widget name does not exist.
    #[error("{0} not found")]
    NotFound(String),
}

impl MapConfigError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidMapConfig(reason.into())
    }

    pub(crate) fn filter(reason: impl Into<String>) -> Self {
        Self::InvalidFilterParams(reason.into())
    }
}
