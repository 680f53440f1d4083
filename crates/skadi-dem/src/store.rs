//! Remote tile store.
//!
//! Tiles are served gzip compressed from the "skadi" layout of the AWS
//! Open Data terrain bucket:
//!
//! Source: https://s3.amazonaws.com/elevation-tiles-prod/skadi/{dir}/{tile}.hgt.gz
//!
//! A [`TileStore`] only knows how to fetch one tile and how to tell whether
//! a tile is already on disk. Writing tiles is the download task's job.

use crate::address::TileId;
use crate::error::{FetchCause, FetchError};
use crate::Result;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// AWS S3 base URL for skadi elevation tiles.
pub const DEFAULT_BASE_URL: &str = "https://s3.amazonaws.com/elevation-tiles-prod/skadi";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Size of one uncompressed 3 arc-second tile (1201 x 1201 big-endian i16).
const SRTM3_TILE_BYTES: usize = 1201 * 1201 * 2;

/// Source of compressed tiles.
///
/// Implementations must be shareable with the worker thread.
pub trait TileStore: Send + Sync {
    /// Fetch one tile and return its decompressed bytes.
    ///
    /// Performs a single blocking request; there is no retry.
    fn fetch(&self, tile: &TileId) -> std::result::Result<Vec<u8>, FetchError>;

    /// Whether a materialized tile is already present at `path`.
    ///
    /// Presence is the only check made; file contents are not validated.
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// HTTP settings for [`HttpTileStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// URL prefix that tile remote paths are appended to.
    pub base_url: String,
    /// Per-request timeout, which also bounds how long a cancel can wait.
    pub timeout_secs: u64,
    /// Optional `User-Agent` header.
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: None,
        }
    }
}

impl FetchConfig {
    /// URL of the compressed tile.
    pub fn tile_url(&self, tile: &TileId) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), tile.remote_path())
    }
}

/// Download statistics for the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStats {
    /// Number of tiles downloaded this session.
    pub tiles_downloaded: usize,
    /// Total compressed bytes downloaded this session.
    pub bytes_downloaded: u64,
}

/// Tile store backed by a blocking HTTP client.
pub struct HttpTileStore {
    config: FetchConfig,
    client: reqwest::blocking::Client,
    /// Number of tiles downloaded this session (atomic for thread safety).
    tiles_downloaded: AtomicUsize,
    /// Total compressed bytes downloaded this session.
    bytes_downloaded: AtomicU64,
}

impl std::fmt::Debug for HttpTileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTileStore")
            .field("base_url", &self.config.base_url)
            .field("timeout_secs", &self.config.timeout_secs)
            .finish()
    }
}

impl HttpTileStore {
    /// Create a store with the default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(FetchConfig::default())
    }

    /// Create a store from a configuration.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs));
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let client = builder.build()?;

        Ok(Self {
            config,
            client,
            tiles_downloaded: AtomicUsize::new(0),
            bytes_downloaded: AtomicU64::new(0),
        })
    }

    /// The configuration this store was built with.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Get download statistics for this session.
    pub fn download_stats(&self) -> DownloadStats {
        DownloadStats {
            tiles_downloaded: self.tiles_downloaded.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
        }
    }
}

impl TileStore for HttpTileStore {
    fn fetch(&self, tile: &TileId) -> std::result::Result<Vec<u8>, FetchError> {
        let url = self.config.tile_url(tile);
        debug!(%tile, %url, "fetching tile");

        let mut response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| FetchError::new(*tile, FetchCause::Http(e)))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::new(*tile, FetchCause::Status(status.as_u16())));
        }

        // Buffer the compressed body first so transport failures are told
        // apart from a corrupt gzip stream.
        let expected = response.content_length();
        let mut compressed = Vec::new();
        let copied = response.copy_to(&mut compressed);
        let received = compressed.len() as u64;
        if let Some(expected) = expected {
            if received < expected {
                return Err(FetchError::new(
                    *tile,
                    FetchCause::ShortRead { expected, received },
                ));
            }
        }
        copied.map_err(|e| FetchError::new(*tile, FetchCause::Http(e)))?;

        let bytes =
            decode_gzip(compressed.as_slice()).map_err(|cause| FetchError::new(*tile, cause))?;

        self.tiles_downloaded.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded.fetch_add(received, Ordering::Relaxed);
        debug!(%tile, compressed = received, raw = bytes.len(), "fetched tile");
        Ok(bytes)
    }
}

/// Stream a gzip payload into memory.
///
/// A body that ends before the gzip trailer is reported as a decompression
/// failure rather than silently yielding a short tile.
pub fn decode_gzip<R: Read>(reader: R) -> std::result::Result<Vec<u8>, FetchCause> {
    let mut decoder = GzDecoder::new(reader);
    let mut bytes = Vec::with_capacity(SRTM3_TILE_BYTES);
    decoder
        .read_to_end(&mut bytes)
        .map_err(FetchCause::Decompress)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_tile_url() {
        let tile: TileId = "N52E013".parse().unwrap();
        let config = FetchConfig::default();
        assert_eq!(
            config.tile_url(&tile),
            "https://s3.amazonaws.com/elevation-tiles-prod/skadi/N52/N52E013.hgt.gz"
        );

        let config = FetchConfig {
            base_url: "http://localhost:8080/tiles/".to_string(),
            ..FetchConfig::default()
        };
        assert_eq!(
            config.tile_url(&tile),
            "http://localhost:8080/tiles/N52/N52E013.hgt.gz"
        );
    }

    #[test]
    fn test_decode_gzip() {
        let raw: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let decoded = decode_gzip(gzip(&raw).as_slice()).unwrap();
        assert_eq!(decoded, raw);
    }

    #[test]
    fn test_decode_truncated_gzip_fails() {
        let raw = vec![7u8; 4096];
        let compressed = gzip(&raw);
        let truncated = &compressed[..compressed.len() - 6];
        assert!(matches!(
            decode_gzip(truncated),
            Err(FetchCause::Decompress(_))
        ));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            decode_gzip(&b"<html>not found</html>"[..]),
            Err(FetchCause::Decompress(_))
        ));
    }
}
