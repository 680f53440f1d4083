//! Grid cells and canonical tile addressing.
//!
//! Tiles are 1x1 degree SRTM cells keyed by their south-west corner, named
//! like `N52E013` and grouped into one directory per latitude row (`N52`).
//! A cell resolves to its tile with `floor` on both axes, so negative
//! coordinates round toward negative infinity: `-3.2` lives in `S04`.
//!
//! ```text
//! {root}/{dir_name}/{tile_name}.hgt        local materialized tile
//! {base_url}/{dir_name}/{tile_name}.hgt.gz remote compressed tile
//! ```

use crate::{Result, TileError};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Extension of a materialized tile.
pub const HGT_EXTENSION: &str = "hgt";

/// A rectangular bounding box in degrees longitude (x) and latitude (y).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    /// Western edge.
    pub min_x: f64,
    /// Southern edge.
    pub min_y: f64,
    /// Eastern edge.
    pub max_x: f64,
    /// Northern edge.
    pub max_y: f64,
}

impl GridCell {
    /// Create a cell from its edges.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Create a 1x1 degree cell whose south-west corner is at `(lon, lat)`.
    pub fn from_corner(lon: f64, lat: f64) -> Self {
        Self::new(lon, lat, lon + 1.0, lat + 1.0)
    }

    /// Expand an extent into the 1x1 degree cells that intersect it.
    ///
    /// Cells are ordered south to north, then west to east. An extent whose
    /// edge falls exactly on a whole degree does not pull in the neighbouring
    /// row or column.
    pub fn covering(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Vec<GridCell>> {
        for v in [min_x, min_y, max_x, max_y] {
            if !v.is_finite() {
                return Err(TileError::InvalidCell {
                    min_x,
                    min_y,
                    reason: "extent coordinates must be finite",
                });
            }
        }
        if max_x < min_x || max_y < min_y {
            return Err(TileError::InvalidCell {
                min_x,
                min_y,
                reason: "extent maximum is below its minimum",
            });
        }

        if !(-90.0..=90.0).contains(&min_y) || !(-90.0..=90.0).contains(&max_y) {
            return Err(TileError::InvalidCell {
                min_x,
                min_y,
                reason: "extent latitude must be within [-90, 90]",
            });
        }
        if !(-180.0..=180.0).contains(&min_x) || !(-180.0..=180.0).contains(&max_x) {
            return Err(TileError::InvalidCell {
                min_x,
                min_y,
                reason: "extent longitude must be within [-180, 180]",
            });
        }

        // Bounded by the range checks above: at most 181 x 361 corners.
        let lat_start = min_y.floor() as i32;
        let lon_start = min_x.floor() as i32;
        let lat_end = (max_y.ceil() as i32).max(lat_start + 1);
        let lon_end = (max_x.ceil() as i32).max(lon_start + 1);

        let rows = lat_start.abs_diff(lat_end) as usize;
        let cols = lon_start.abs_diff(lon_end) as usize;
        let mut cells = Vec::with_capacity(rows.saturating_mul(cols));
        for lat in lat_start..lat_end {
            for lon in lon_start..lon_end {
                let cell = GridCell::from_corner(lon as f64, lat as f64);
                // Validates the range so that a bad extent fails here, not mid-download.
                TileId::from_cell(&cell)?;
                cells.push(cell);
            }
        }
        Ok(cells)
    }
}

/// Canonical identifier of a 1x1 degree elevation tile.
///
/// Stores the floored south-west corner; hemisphere letters and zero padding
/// are derived when formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    /// Floored latitude of the south-west corner.
    lat: i32,
    /// Floored longitude of the south-west corner.
    lon: i32,
}

impl TileId {
    /// Derive the tile for a grid cell from its south-west corner.
    pub fn from_cell(cell: &GridCell) -> Result<Self> {
        let invalid = |reason| TileError::InvalidCell {
            min_x: cell.min_x,
            min_y: cell.min_y,
            reason,
        };

        if !cell.min_x.is_finite() || !cell.min_y.is_finite() {
            return Err(invalid("coordinates must be finite"));
        }
        if !(-90.0..90.0).contains(&cell.min_y) {
            return Err(invalid("latitude must be within [-90, 90)"));
        }
        if !(-180.0..180.0).contains(&cell.min_x) {
            return Err(invalid("longitude must be within [-180, 180)"));
        }

        Ok(Self {
            lat: cell.min_y.floor() as i32,
            lon: cell.min_x.floor() as i32,
        })
    }

    /// Latitude of the south-west corner in whole degrees.
    pub fn lat(&self) -> i32 {
        self.lat
    }

    /// Longitude of the south-west corner in whole degrees.
    pub fn lon(&self) -> i32 {
        self.lon
    }

    /// `'S'` south of the equator, otherwise `'N'`.
    pub fn hemisphere_ns(&self) -> char {
        if self.lat < 0 {
            'S'
        } else {
            'N'
        }
    }

    /// `'W'` west of the prime meridian, otherwise `'E'`.
    pub fn hemisphere_ew(&self) -> char {
        if self.lon < 0 {
            'W'
        } else {
            'E'
        }
    }

    /// Directory grouping all tiles of one latitude row, e.g. `N52`.
    pub fn dir_name(&self) -> String {
        format!("{}{:02}", self.hemisphere_ns(), self.lat.unsigned_abs())
    }

    /// Tile name without extension, e.g. `N52E013`.
    pub fn tile_name(&self) -> String {
        format!(
            "{}{:02}{}{:03}",
            self.hemisphere_ns(),
            self.lat.unsigned_abs(),
            self.hemisphere_ew(),
            self.lon.unsigned_abs()
        )
    }

    /// Local path of the materialized tile under `root`.
    pub fn destination(&self, root: &Path) -> PathBuf {
        root.join(self.dir_name())
            .join(format!("{}.{}", self.tile_name(), HGT_EXTENSION))
    }

    /// Path of the compressed tile relative to the remote base URL.
    pub fn remote_path(&self) -> String {
        format!("{}/{}.{}.gz", self.dir_name(), self.tile_name(), HGT_EXTENSION)
    }

    /// Geographic extent covered by the tile.
    pub fn bounds(&self) -> TileBounds {
        TileBounds {
            min_lat: self.lat as f64,
            max_lat: (self.lat + 1) as f64,
            min_lon: self.lon as f64,
            max_lon: (self.lon + 1) as f64,
        }
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tile_name())
    }
}

/// Error parsing a tile name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid tile name: {0}")]
pub struct ParseTileIdError(String);

impl FromStr for TileId {
    type Err = ParseTileIdError;

    /// Parse `N52E013`, optionally followed by `.hgt` or `.hgt.gz`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let err = || ParseTileIdError(s.to_string());
        let name = s.split('.').next().unwrap_or(s);
        if name.len() != 7 || !name.is_ascii() {
            return Err(err());
        }

        let lat_sign = match &name[0..1] {
            "N" | "n" => 1,
            "S" | "s" => -1,
            _ => return Err(err()),
        };
        let lon_sign = match &name[3..4] {
            "E" | "e" => 1,
            "W" | "w" => -1,
            _ => return Err(err()),
        };
        let lat: i32 = name[1..3].parse().map_err(|_| err())?;
        let lon: i32 = name[4..7].parse().map_err(|_| err())?;

        let lat = lat_sign * lat;
        let lon = lon_sign * lon;
        if !(-90..90).contains(&lat) || !(-180..180).contains(&lon) {
            return Err(err());
        }
        Ok(Self { lat, lon })
    }
}

/// Geographic bounds of a tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    /// Minimum latitude (south edge).
    pub min_lat: f64,
    /// Maximum latitude (north edge).
    pub max_lat: f64,
    /// Minimum longitude (west edge).
    pub min_lon: f64,
    /// Maximum longitude (east edge).
    pub max_lon: f64,
}

impl TileBounds {
    /// Check if a coordinate is within the bounds.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

/// Resolve a grid cell to its tile and local destination path.
pub fn resolve(cell: &GridCell, root: &Path) -> Result<(TileId, PathBuf)> {
    let tile = TileId::from_cell(cell)?;
    let path = tile.destination(root);
    Ok((tile, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_of(lon: f64, lat: f64) -> String {
        TileId::from_cell(&GridCell::from_corner(lon, lat))
            .unwrap()
            .tile_name()
    }

    #[test]
    fn test_resolve_berlin_tile() {
        let (tile, path) = resolve(&GridCell::from_corner(13.2, 52.1), Path::new("/data")).unwrap();
        assert_eq!(tile.tile_name(), "N52E013");
        assert_eq!(tile.dir_name(), "N52");
        assert_eq!(path, PathBuf::from("/data/N52/N52E013.hgt"));
    }

    #[test]
    fn test_whole_square_maps_to_one_tile() {
        for i in 0..10 {
            for j in 0..10 {
                let lat = 52.0 + i as f64 * 0.0999;
                let lon = 13.0 + j as f64 * 0.0999;
                let tile = TileId::from_cell(&GridCell::from_corner(lon, lat)).unwrap();
                assert_eq!(tile.tile_name(), "N52E013", "cell ({lon}, {lat})");
                assert_eq!(tile.dir_name(), "N52");
            }
        }
    }

    #[test]
    fn test_rounding_table() {
        // Floor toward negative infinity on both axes.
        let cases = [
            (13.0, 52.0, "N52E013"),
            (13.999, 52.999, "N52E013"),
            (14.0, 53.0, "N53E014"),
            (-10.9, -3.2, "S04W011"),
            (-10.0, -3.0, "S03W010"),
            (-0.5, -0.5, "S01W001"),
            (0.0, 0.0, "N00E000"),
            (-0.0, -0.0, "N00E000"),
            (179.5, 89.5, "N89E179"),
            (-180.0, -90.0, "S90W180"),
            (8.7, 50.5, "N50E008"),
        ];
        for (lon, lat, expected) in cases {
            assert_eq!(name_of(lon, lat), expected, "cell ({lon}, {lat})");
        }
    }

    #[test]
    fn test_negative_hemisphere_directory() {
        let tile = TileId::from_cell(&GridCell::from_corner(-10.9, -3.2)).unwrap();
        assert_eq!(tile.dir_name(), "S04");
        assert_eq!(tile.hemisphere_ns(), 'S');
        assert_eq!(tile.hemisphere_ew(), 'W');
        assert_eq!(tile.remote_path(), "S04/S04W011.hgt.gz");
    }

    #[test]
    fn test_invalid_cells_rejected() {
        let bad = [
            GridCell::from_corner(f64::NAN, 10.0),
            GridCell::from_corner(10.0, f64::INFINITY),
            GridCell::from_corner(10.0, 90.0),
            GridCell::from_corner(180.0, 10.0),
            GridCell::from_corner(-180.5, 10.0),
        ];
        for cell in bad {
            let err = TileId::from_cell(&cell).unwrap_err();
            assert_eq!(err.kind(), "InvalidCellError");
        }
    }

    #[test]
    fn test_resolve_is_pure() {
        let cell = GridCell::new(-72.4, 41.7, -71.9, 42.2);
        let root = Path::new("tiles");
        assert_eq!(resolve(&cell, root).unwrap(), resolve(&cell, root).unwrap());
    }

    #[test]
    fn test_parse_tile_name() {
        let tile: TileId = "S04W011.hgt".parse().unwrap();
        assert_eq!((tile.lat(), tile.lon()), (-4, -11));
        assert_eq!(tile.to_string(), "S04W011");

        let tile: TileId = "N52E013".parse().unwrap();
        assert_eq!(tile.bounds().min_lat, 52.0);
        assert_eq!(tile.bounds().max_lon, 14.0);

        assert!("X52E013".parse::<TileId>().is_err());
        assert!("N5E013".parse::<TileId>().is_err());
        assert!("N95E013".parse::<TileId>().is_err());
    }

    #[test]
    fn test_covering_extent() {
        let cells = GridCell::covering(12.5, 51.5, 14.0, 53.0).unwrap();
        let names: Vec<String> = cells
            .iter()
            .map(|c| TileId::from_cell(c).unwrap().tile_name())
            .collect();
        assert_eq!(
            names,
            ["N51E012", "N51E013", "N52E012", "N52E013"]
        );
    }

    #[test]
    fn test_covering_point_extent() {
        let cells = GridCell::covering(8.7, 50.5, 8.7, 50.5).unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(TileId::from_cell(&cells[0]).unwrap().tile_name(), "N50E008");
    }

    #[test]
    fn test_covering_rejects_inverted_extent() {
        assert!(GridCell::covering(14.0, 50.0, 13.0, 51.0).is_err());
        assert!(GridCell::covering(f64::NAN, 50.0, 13.0, 51.0).is_err());
    }

    #[test]
    fn test_covering_rejects_extent_beyond_globe() {
        let err = GridCell::covering(0.0, 0.0, 1e9, 1e9).unwrap_err();
        assert_eq!(err.kind(), "InvalidCellError");
        assert!(GridCell::covering(-1e12, -1e12, 0.0, 0.0).is_err());
        assert!(GridCell::covering(170.0, 80.0, 181.0, 85.0).is_err());
        assert!(GridCell::covering(10.0, -91.0, 11.0, -89.0).is_err());
    }

    #[test]
    fn test_covering_whole_globe_edges() {
        let cells = GridCell::covering(179.5, 89.5, 180.0, 90.0).unwrap();
        assert_eq!(cells, vec![GridCell::from_corner(179.0, 89.0)]);
        let cells = GridCell::covering(-180.0, -90.0, -179.0, -89.0).unwrap();
        assert_eq!(cells, vec![GridCell::from_corner(-180.0, -90.0)]);
    }

    #[test]
    fn test_bounds_contains() {
        let bounds = "N47W123".parse::<TileId>().unwrap().bounds();

        assert!(bounds.contains(47.5, -122.5));
        assert!(bounds.contains(47.0, -123.0)); // Corner
        assert!(bounds.contains(48.0, -122.0)); // Corner
        assert!(!bounds.contains(46.5, -122.5));
        assert!(!bounds.contains(47.5, -121.5));
    }
}
