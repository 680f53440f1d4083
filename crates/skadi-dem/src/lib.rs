//! # skadi-dem
//!
//! Resumable bulk download of SRTM elevation tiles, and a reader for the
//! resulting `.hgt` files.
//!
//! ## Overview
//!
//! SRTM tiles cover 1x1 degree and are keyed by their south-west corner,
//! named like `N52E013`. The AWS Open Data terrain bucket serves them gzip
//! compressed in the "skadi" layout:
//! `https://s3.amazonaws.com/elevation-tiles-prod/skadi/N52/N52E013.hgt.gz`
//!
//! A [`DownloadTask`] takes an ordered grid of [`GridCell`]s and a destination
//! root, and on a background thread fetches, decompresses and writes each
//! missing tile to `{root}/N52/N52E013.hgt`. Tiles already on disk are
//! skipped, so re-running a task resumes it.
//!
//! ## Examples
//!
//! ```no_run
//! use skadi_dem::{DownloadTask, GridCell, HttpTileStore, ResultReporter};
//! use skadi_dem::{HgtTile, RasterSink, TileError, TracingNotifier};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! struct PrintSink;
//!
//! impl RasterSink for PrintSink {
//!     fn load_raster(&self, path: &Path) -> Result<(), TileError> {
//!         let tile = HgtTile::from_file(path)?;
//!         println!("{}: {:?}", tile.id(), tile.dimensions());
//!         Ok(())
//!     }
//! }
//!
//! let grid = GridCell::covering(13.0, 52.0, 14.5, 53.0)?;
//! let store = Arc::new(HttpTileStore::with_defaults()?);
//! let reporter = ResultReporter::new(TracingNotifier, PrintSink);
//!
//! let handle = DownloadTask::new(grid, "./elevation_cache", store)
//!     .on_progress(|fraction| println!("{:.0}%", fraction * 100.0))
//!     .on_finished(move |outcome| reporter.report(outcome))
//!     .spawn()?;
//!
//! let outcome = handle.join()?;
//! println!("{} tiles on disk", outcome.files().len());
//! # Ok::<(), skadi_dem::TileError>(())
//! ```

pub mod address;
mod error;
pub mod report;
pub mod store;
pub mod task;
mod tile;

pub use address::{resolve, GridCell, ParseTileIdError, TileBounds, TileId};
pub use error::{FetchCause, FetchError, TileError};
pub use report::{Notification, NotificationLevel, Notifier, RasterSink, ResultReporter, TracingNotifier};
pub use store::{decode_gzip, DownloadStats, FetchConfig, HttpTileStore, TileStore, DEFAULT_BASE_URL};
pub use task::{CancelToken, DownloadOutcome, DownloadTask, TaskHandle, TaskState};
pub use tile::{HgtTile, VOID_SAMPLE};

/// Result type for tile operations.
pub type Result<T> = std::result::Result<T, TileError>;
