//! Configuration types for the layergroup server.

use std::path::PathBuf;
use std::time::Duration;

use crate::datasource::DatasourceTable;
use crate::error::SourceError;

/// Process-wide settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// JSON file holding the datasource descriptor table. `None` means no
    /// custom datasources; every layergroup renders through the default
    /// loader.
    pub datasources_path: Option<PathBuf>,
    /// Per-request timeout for HTTP tile fetches.
    pub fetch_timeout: Duration,
    /// `User-Agent` header sent with HTTP tile fetches.
    pub user_agent: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            datasources_path: None,
            fetch_timeout: Duration::from_secs(30),
            user_agent: format!("layergroup/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ServerConfig {
    /// Loads the descriptor table named by `datasources_path`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidDescriptor`] if the file cannot be read
    /// or parsed, or [`SourceError::UnknownDatasource`] if an entry is of an
    /// unrecognized kind.
    pub fn load_datasources(&self) -> Result<DatasourceTable, SourceError> {
        match &self.datasources_path {
            Some(path) => DatasourceTable::from_path(path),
            None => Ok(DatasourceTable::default()),
        }
    }
}
