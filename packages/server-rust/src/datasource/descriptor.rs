//! The datasource descriptor table.
//!
//! Descriptors come from process configuration, never from clients. Each
//! named entry is either a static tile template (`{"tiles": "..."}`) or a
//! database-backed source (`{"postgres": true}`). Entries are resolved into
//! [`DatasourceDescriptor`] once, when the table is loaded; the table is
//! read-only afterwards and shared behind an `Arc`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::template::TileTemplate;
use crate::error::SourceError;

/// A resolved datasource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasourceDescriptor {
    /// Pre-built tiles fetched from a file or HTTP template.
    Static {
        /// Parsed tile template.
        template: TileTemplate,
    },
    /// Tiles assembled on demand from the layers' SQL.
    Postgres,
}

impl DatasourceDescriptor {
    /// Short kind name, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Static { .. } => "tiles",
            Self::Postgres => "postgres",
        }
    }
}

#[derive(Deserialize)]
struct RawDescriptor {
    #[serde(default)]
    tiles: Option<String>,
    #[serde(default)]
    postgres: bool,
}

/// Named datasource descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasourceTable {
    entries: BTreeMap<String, DatasourceDescriptor>,
}

impl DatasourceTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry. Intended for building tables in code.
    #[must_use]
    pub fn with(mut self, name: &str, descriptor: DatasourceDescriptor) -> Self {
        self.entries.insert(name.to_string(), descriptor);
        self
    }

    /// Resolves a JSON object of named descriptors.
    ///
    /// When an entry has both `tiles` and `postgres`, `tiles` wins.
    ///
    /// # Errors
    ///
    /// - [`SourceError::InvalidDescriptor`] if `value` is not an object of
    ///   objects, or a tile template does not parse.
    /// - [`SourceError::UnknownDatasource`] if an entry is neither kind.
    pub fn from_value(value: &Value) -> Result<Self, SourceError> {
        let raw: BTreeMap<String, RawDescriptor> = serde_json::from_value(value.clone())
            .map_err(|e| SourceError::InvalidDescriptor(e.to_string()))?;

        let mut entries = BTreeMap::new();
        for (name, descriptor) in raw {
            let resolved = match (descriptor.tiles, descriptor.postgres) {
                (Some(tiles), _) => DatasourceDescriptor::Static {
                    template: TileTemplate::parse(&tiles)?,
                },
                (None, true) => DatasourceDescriptor::Postgres,
                (None, false) => {
                    return Err(SourceError::UnknownDatasource(format!(
                        "Unknown datasource type for '{name}'"
                    )))
                }
            };
            entries.insert(name, resolved);
        }
        Ok(Self { entries })
    }

    /// Parses JSON text and delegates to [`DatasourceTable::from_value`].
    ///
    /// # Errors
    ///
    /// See [`DatasourceTable::from_value`].
    pub fn from_json_str(text: &str) -> Result<Self, SourceError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| SourceError::InvalidDescriptor(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Reads a JSON file. Runs once at startup, so it reads synchronously.
    ///
    /// # Errors
    ///
    /// [`SourceError::InvalidDescriptor`] if the file cannot be read, plus
    /// everything [`DatasourceTable::from_value`] reports.
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SourceError::InvalidDescriptor(format!("{}: {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    /// Descriptor for `name`, if configured.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DatasourceDescriptor> {
        self.entries.get(name)
    }

    /// Descriptor for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::UnknownDatasource`] if `name` is not configured.
    pub fn resolve(&self, name: &str) -> Result<&DatasourceDescriptor, SourceError> {
        self.get(name).ok_or_else(|| SourceError::unknown_name(name))
    }

    /// Configured names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
