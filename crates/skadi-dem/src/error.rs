//! Error types for the skadi-dem crate.

use crate::address::TileId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving, downloading or reading tiles.
#[derive(Debug, Error)]
pub enum TileError {
    /// Grid cell has no geographic meaning (NaN, infinite or off the globe).
    #[error("Invalid grid cell at ({min_x}, {min_y}): {reason}")]
    InvalidCell {
        /// Western edge of the cell in degrees longitude.
        min_x: f64,
        /// Southern edge of the cell in degrees latitude.
        min_y: f64,
        /// Why the cell was rejected.
        reason: &'static str,
    },

    /// Remote tile could not be fetched or decoded.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Materialized tile could not be written to disk.
    #[error("Failed to write tile {}: {source}", path.display())]
    Write {
        /// Destination (or temporary) path being written.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A local `.hgt` file is not a readable elevation raster.
    #[error("Raster not valid: {}: {reason}", path.display())]
    InvalidRaster {
        /// Offending file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// Coordinate is outside the bounds of the tile.
    #[error("Coordinate ({lat}, {lon}) is outside tile {tile}")]
    OutOfBounds {
        /// Requested latitude.
        lat: f64,
        /// Requested longitude.
        lon: f64,
        /// Tile that was queried.
        tile: TileId,
    },

    /// The sample at the coordinate is a void.
    #[error("No elevation data at coordinate ({lat}, {lon})")]
    NoData {
        /// Requested latitude.
        lat: f64,
        /// Requested longitude.
        lon: f64,
    },

    /// The download worker thread panicked before publishing an outcome.
    #[error("Download worker panicked")]
    WorkerPanicked,

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TileError {
    /// Short kind name used in user-facing notifications.
    pub fn kind(&self) -> &'static str {
        match self {
            TileError::InvalidCell { .. } => "InvalidCellError",
            TileError::Fetch(_) => "FetchError",
            TileError::Write { .. } => "WriteError",
            TileError::InvalidRaster { .. } => "InvalidRasterError",
            TileError::OutOfBounds { .. } => "OutOfBoundsError",
            TileError::NoData { .. } => "NoDataError",
            TileError::WorkerPanicked => "WorkerPanicked",
            TileError::HttpClient(_) => "HttpClientError",
            TileError::Io(_) => "IoError",
        }
    }
}

/// A single tile fetch failed.
#[derive(Debug, Error)]
#[error("Failed to fetch tile {tile}: {cause}")]
pub struct FetchError {
    /// Tile that was being fetched.
    pub tile: TileId,
    /// What went wrong.
    #[source]
    pub cause: FetchCause,
}

impl FetchError {
    /// Create a fetch error for a tile.
    pub fn new(tile: TileId, cause: FetchCause) -> Self {
        Self { tile, cause }
    }
}

/// Underlying reason for a [`FetchError`].
#[derive(Debug, Error)]
pub enum FetchCause {
    /// Connection, DNS, timeout or body transfer failure.
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with something other than 200.
    #[error("HTTP {0}")]
    Status(u16),

    /// The gzip stream was corrupt or truncated.
    #[error("decompression failed: {0}")]
    Decompress(#[source] std::io::Error),

    /// Fewer compressed bytes arrived than the server advertised.
    #[error("short read: expected {expected} bytes, received {received}")]
    ShortRead {
        /// Advertised `Content-Length`.
        expected: u64,
        /// Bytes actually read.
        received: u64,
    },
}
