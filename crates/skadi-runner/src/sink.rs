//! Host side "load" of downloaded tiles.
//!
//! A terminal has no map canvas, so loading a tile means opening it as a
//! raster, logging a short summary and printing its path on stdout for the
//! next tool in a pipeline.

use skadi_dem::{HgtTile, RasterSink, TileError};
use std::path::Path;
use tracing::{debug, info};

/// Opens each tile with [`HgtTile`] and prints its path.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummarySink;

impl RasterSink for SummarySink {
    fn load_raster(&self, path: &Path) -> Result<(), TileError> {
        let tile = HgtTile::from_file(path)?;
        let (width, height) = tile.dimensions();
        let bounds = tile.bounds();
        let center_lat = (bounds.min_lat + bounds.max_lat) / 2.0;
        let center_lon = (bounds.min_lon + bounds.max_lon) / 2.0;

        match tile.get_elevation(center_lat, center_lon) {
            Ok(elevation) => info!(
                tile = %tile.id(),
                width,
                height,
                resolution_arcsec = tile.resolution_arcsec(),
                center_elevation_m = elevation,
                "loaded raster"
            ),
            Err(e) => {
                info!(tile = %tile.id(), width, height, "loaded raster");
                debug!(tile = %tile.id(), error = %e, "no elevation at tile center");
            }
        }

        println!("{}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_raster() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("N52E013.hgt");
        std::fs::write(&path, b"truncated").unwrap();

        let err = SummarySink.load_raster(&path).unwrap_err();
        assert_eq!(err.kind(), "InvalidRasterError");
    }

    #[test]
    fn test_loads_valid_raster() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("S04W011.hgt");
        std::fs::write(&path, vec![0u8; 1201 * 1201 * 2]).unwrap();

        SummarySink.load_raster(&path).unwrap();
    }
}
