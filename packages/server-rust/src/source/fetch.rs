//! Byte acquisition for static tile templates.
//!
//! Local files are read through `tokio::fs` and remote resources through a
//! shared `reqwest::Client`, so a slow fetch only suspends its own request.
//! Nothing is retried here: a timeout or error fails the tile.

use std::io::Write;
use std::time::Duration;

use bytes::Bytes;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::datasource::TileLocation;
use crate::error::SourceError;

/// First byte of an uncompressed vector tile (protobuf field 3, `layers`,
/// length-delimited). Some producers serve such tiles while labelling them
/// compressed.
pub const UNCOMPRESSED_TILE_MARKER: u8 = 0x1A;

/// Deflates payloads that start with [`UNCOMPRESSED_TILE_MARKER`]; returns
/// every other payload unchanged.
///
/// # Errors
///
/// Returns [`SourceError::Recompress`] if the encoder fails.
pub fn normalize_tile(payload: Bytes) -> Result<Bytes, SourceError> {
    if payload.first() != Some(&UNCOMPRESSED_TILE_MARKER) {
        return Ok(payload);
    }
    debug!(len = payload.len(), "deflating uncompressed vector tile");
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(payload.len()), Compression::default());
    encoder.write_all(&payload)?;
    Ok(Bytes::from(encoder.finish()?))
}

/// Reads tile bytes from a [`TileLocation`].
#[derive(Debug, Clone)]
pub struct TileFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl TileFetcher {
    /// Builds a fetcher with the configured timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::HttpClient`] if the HTTP client cannot be built.
    pub fn new(config: &ServerConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            timeout: config.fetch_timeout,
        })
    }

    /// Fetches the raw bytes at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Fetch`] on I/O failure, transport failure,
    /// timeout, or a non-200 status (reason `"<status>: <body>"`).
    pub async fn fetch(&self, location: &TileLocation) -> Result<Bytes, SourceError> {
        debug!(uri = %location, "fetching tile");
        let result = match location {
            TileLocation::File(path) => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|e| SourceError::fetch(location.to_string(), e)),
            TileLocation::Http(url) => self.fetch_http(url).await,
        };
        if let Err(err) = &result {
            warn!(error = %err, "tile fetch failed");
        }
        result
    }

    async fn fetch_http(&self, url: &url::Url) -> Result<Bytes, SourceError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SourceError::fetch(url.as_str(), e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| SourceError::fetch(url.as_str(), e))?;
        if status != StatusCode::OK {
            return Err(SourceError::fetch(
                url.as_str(),
                format!("{}: {}", status.as_u16(), String::from_utf8_lossy(&body)),
            ));
        }
        Ok(body)
    }
}
