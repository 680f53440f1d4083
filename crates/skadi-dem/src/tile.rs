//! Reading materialized `.hgt` tiles.

use crate::address::{TileBounds, TileId};
use crate::{Result, TileError};
use std::path::Path;

/// Sample value marking a void in SRTM data.
pub const VOID_SAMPLE: i16 = -32768;

/// Samples per side of a 3 arc-second tile.
const SRTM3_SIZE: u32 = 1201;

/// Samples per side of a 1 arc-second tile.
const SRTM1_SIZE: u32 = 3601;

/// A single SRTM elevation tile loaded from an `.hgt` file.
///
/// The file is a square grid of big-endian `i16` samples in meters, rows
/// running north to south. Edge rows and columns overlap the neighbouring
/// tiles, so a 1201 sample tile spans exactly one degree.
#[derive(Debug)]
pub struct HgtTile {
    /// Tile identity parsed from the file name.
    id: TileId,
    /// Elevation data in row-major order (north to south, west to east).
    data: Vec<i16>,
    /// Samples per side.
    size: u32,
}

impl HgtTile {
    /// Load a tile, taking its location from the file name (`N52E013.hgt`).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| invalid(path, "file name is not valid UTF-8"))?;
        let id: TileId = name
            .parse()
            .map_err(|e: crate::address::ParseTileIdError| invalid(path, &e.to_string()))?;

        let bytes = std::fs::read(path)?;
        Self::from_bytes(id, &bytes).map_err(|reason| invalid(path, &reason))
    }

    /// Build a tile from raw file contents.
    fn from_bytes(id: TileId, bytes: &[u8]) -> std::result::Result<Self, String> {
        let size = match bytes.len() {
            n if n == (SRTM3_SIZE * SRTM3_SIZE * 2) as usize => SRTM3_SIZE,
            n if n == (SRTM1_SIZE * SRTM1_SIZE * 2) as usize => SRTM1_SIZE,
            n => return Err(format!("unexpected size of {} bytes", n)),
        };

        let data = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_be_bytes([pair[0], pair[1]]))
            .collect();

        Ok(Self { id, data, size })
    }

    /// Tile identity.
    pub fn id(&self) -> TileId {
        self.id
    }

    /// Get the geographic bounds of this tile.
    pub fn bounds(&self) -> TileBounds {
        self.id.bounds()
    }

    /// Get the dimensions of this tile in samples.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.size, self.size)
    }

    /// Get the resolution in arc-seconds per sample.
    pub fn resolution_arcsec(&self) -> f64 {
        3600.0 / (self.size - 1) as f64
    }

    /// Get the elevation at a geographic coordinate.
    ///
    /// Uses bilinear interpolation between the four nearest samples.
    pub fn get_elevation(&self, lat: f64, lon: f64) -> Result<f32> {
        let (x, y) = self.sample_position(lat, lon)?;

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.size - 1);
        let y1 = (y0 + 1).min(self.size - 1);

        let fx = x - x0 as f64;
        let fy = y - y0 as f64;

        let v00 = self.get_sample(x0, y0, lat, lon)?;
        let v10 = self.get_sample(x1, y0, lat, lon)?;
        let v01 = self.get_sample(x0, y1, lat, lon)?;
        let v11 = self.get_sample(x1, y1, lat, lon)?;

        let elevation = v00 * (1.0 - fx) * (1.0 - fy)
            + v10 * fx * (1.0 - fy)
            + v01 * (1.0 - fx) * fy
            + v11 * fx * fy;

        Ok(elevation as f32)
    }

    /// Get the elevation of the nearest sample (no interpolation).
    pub fn get_elevation_nearest(&self, lat: f64, lon: f64) -> Result<f32> {
        let (x, y) = self.sample_position(lat, lon)?;
        let value = self.get_sample(x.round() as u32, y.round() as u32, lat, lon)?;
        Ok(value as f32)
    }

    /// Fractional sample coordinates, row 0 at the north edge.
    fn sample_position(&self, lat: f64, lon: f64) -> Result<(f64, f64)> {
        let bounds = self.bounds();
        if !bounds.contains(lat, lon) {
            return Err(TileError::OutOfBounds {
                lat,
                lon,
                tile: self.id,
            });
        }

        let span = (self.size - 1) as f64;
        let x = (lon - bounds.min_lon) * span;
        let y = (bounds.max_lat - lat) * span;
        Ok((x, y))
    }

    fn get_sample(&self, x: u32, y: u32, lat: f64, lon: f64) -> Result<f64> {
        let value = self.data[(y * self.size + x) as usize];
        if value == VOID_SAMPLE {
            return Err(TileError::NoData { lat, lon });
        }
        Ok(value as f64)
    }
}

fn invalid(path: &Path, reason: &str) -> TileError {
    TileError::InvalidRaster {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Tile whose samples rise by one meter per column and ten per row southward.
    fn ramp_bytes(size: u32) -> Vec<u8> {
        let mut bytes = Vec::with_capacity((size * size * 2) as usize);
        for row in 0..size {
            for col in 0..size {
                let value = (col + 10 * row) as i16;
                bytes.extend_from_slice(&value.to_be_bytes());
            }
        }
        bytes
    }

    #[test]
    fn test_load_srtm3_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("N52E013.hgt");
        std::fs::write(&path, ramp_bytes(SRTM3_SIZE)).unwrap();

        let tile = HgtTile::from_file(&path).unwrap();
        assert_eq!(tile.dimensions(), (1201, 1201));
        assert_eq!(tile.id().to_string(), "N52E013");
        assert_relative_eq!(tile.resolution_arcsec(), 3.0);

        // North-west corner is row 0, column 0.
        assert_relative_eq!(tile.get_elevation_nearest(53.0, 13.0).unwrap(), 0.0);
        // South-east corner is the last sample.
        assert_relative_eq!(
            tile.get_elevation_nearest(52.0, 14.0).unwrap(),
            (1200 + 10 * 1200) as f32
        );
    }

    #[test]
    fn test_bilinear_between_samples() {
        let tile = HgtTile::from_bytes("N00E000".parse().unwrap(), &ramp_bytes(SRTM3_SIZE)).unwrap();
        let half = 0.5 / 1200.0;
        // Halfway between columns 0 and 1 of the top row.
        assert_relative_eq!(tile.get_elevation(1.0, half).unwrap(), 0.5, epsilon = 1e-3);
        // Halfway between rows 0 and 1 of the first column.
        assert_relative_eq!(tile.get_elevation(1.0 - half, 0.0).unwrap(), 5.0, epsilon = 1e-3);
    }

    #[test]
    fn test_out_of_bounds() {
        let tile = HgtTile::from_bytes("S04W011".parse().unwrap(), &ramp_bytes(SRTM3_SIZE)).unwrap();
        assert!(tile.get_elevation(-3.5, -10.5).is_ok());
        assert!(matches!(
            tile.get_elevation(-2.5, -10.5),
            Err(TileError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_void_sample() {
        let mut bytes = ramp_bytes(SRTM3_SIZE);
        bytes[0..2].copy_from_slice(&VOID_SAMPLE.to_be_bytes());
        let tile = HgtTile::from_bytes("N10E010".parse().unwrap(), &bytes).unwrap();
        assert!(matches!(
            tile.get_elevation_nearest(11.0, 10.0),
            Err(TileError::NoData { .. })
        ));
    }

    #[test]
    fn test_rejects_wrong_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("N52E013.hgt");
        std::fs::write(&path, vec![0u8; 100]).unwrap();

        let err = HgtTile::from_file(&path).unwrap_err();
        assert_eq!(err.kind(), "InvalidRasterError");
    }

    #[test]
    fn test_rejects_unparseable_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("elevation.hgt");
        std::fs::write(&path, ramp_bytes(SRTM3_SIZE)).unwrap();

        assert!(matches!(
            HgtTile::from_file(&path),
            Err(TileError::InvalidRaster { .. })
        ));
    }
}
