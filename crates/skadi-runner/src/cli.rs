//! Command line argument definitions.

use clap::{Args as ClapArgs, Parser, Subcommand};
use skadi_dem::{GridCell, TileError};
use std::path::PathBuf;

/// Download SRTM elevation tiles from the AWS terrain bucket.
#[derive(Parser, Debug)]
#[command(name = "skadi")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download every tile covering the selection
    Fetch(FetchArgs),
    /// List the tiles a selection resolves to without downloading
    Tiles(SelectionArgs),
}

/// Which cells to download.
#[derive(ClapArgs, Debug)]
pub struct SelectionArgs {
    /// Extent as MIN_LON,MIN_LAT,MAX_LON,MAX_LAT
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    pub bbox: Option<Extent>,

    /// Single cell by its south-west corner as LON,LAT (repeatable)
    #[arg(long = "cell", value_parser = parse_point, allow_hyphen_values = true)]
    pub cells: Vec<(f64, f64)>,

    /// Destination root directory
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Arguments of `skadi fetch`.
#[derive(ClapArgs, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Override the tile server base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Override the per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Do not open the tiles after a successful download
    #[arg(long)]
    pub no_load: bool,
}

/// Geographic extent in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl SelectionArgs {
    /// Build the ordered grid: extent cells first, then explicit cells.
    pub fn grid(&self) -> Result<Vec<GridCell>, TileError> {
        let mut grid = match self.bbox {
            Some(e) => GridCell::covering(e.min_lon, e.min_lat, e.max_lon, e.max_lat)?,
            None => Vec::new(),
        };
        grid.extend(
            self.cells
                .iter()
                .map(|&(lon, lat)| GridCell::from_corner(lon, lat)),
        );
        Ok(grid)
    }
}

fn parse_numbers(s: &str, expected: usize) -> Result<Vec<f64>, String> {
    let values: Vec<f64> = s
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| format!("'{}': {}", part.trim(), e))
        })
        .collect::<Result<_, _>>()?;
    if values.len() != expected {
        return Err(format!(
            "expected {} comma separated numbers, got {}",
            expected,
            values.len()
        ));
    }
    Ok(values)
}

fn parse_bbox(s: &str) -> Result<Extent, String> {
    let v = parse_numbers(s, 4)?;
    Ok(Extent {
        min_lon: v[0],
        min_lat: v[1],
        max_lon: v[2],
        max_lat: v[3],
    })
}

fn parse_point(s: &str) -> Result<(f64, f64), String> {
    let v = parse_numbers(s, 2)?;
    Ok((v[0], v[1]))
}
