//! CLI entry point for the skadi tile downloader.

mod cli;
mod config;
mod error;
mod sink;

use clap::Parser;
use cli::{Args, Command, FetchArgs, SelectionArgs};
use config::RunnerConfig;
use error::{outcome_status, RunnerError};
use sink::SummarySink;
use skadi_dem::{
    DownloadTask, HttpTileStore, ResultReporter, TileStore, TracingNotifier,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info, warn};

fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let result = RunnerConfig::load(args.config.as_deref()).and_then(|config| match &args.command {
        Command::Fetch(fetch) => run_fetch(config, fetch),
        Command::Tiles(selection) => run_tiles(config, selection),
    });

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn run_fetch(mut config: RunnerConfig, args: &FetchArgs) -> Result<ExitCode, RunnerError> {
    config.apply_fetch_args(args);
    let grid = args.selection.grid()?;
    if grid.is_empty() {
        return Err(RunnerError::EmptySelection);
    }

    let store = Arc::new(HttpTileStore::new(config.fetch.clone())?);
    let reporter =
        ResultReporter::new(TracingNotifier, SummarySink).load_on_success(config.load);
    let total = grid.len();

    info!(
        tiles = total,
        output = %config.output_dir.display(),
        server = %config.fetch.base_url,
        "downloading elevation tiles"
    );

    let handle = DownloadTask::new(grid, &config.output_dir, store.clone())
        .on_tile_started(move |index, tile| {
            debug!(%tile, "downloading tile {}/{}", index + 1, total);
        })
        .on_progress(move |fraction| {
            let done = (fraction * total as f64).round() as usize;
            info!("{}/{} tiles ({:.0}%)", done, total, fraction * 100.0);
        })
        .on_finished(move |outcome| reporter.report(outcome))
        .spawn()?;

    let cancel = handle.cancel_token();
    ctrlc::set_handler(move || {
        warn!("received interrupt, stopping after the current tile");
        cancel.cancel();
    })?;

    let outcome = handle.join()?;
    let stats = store.download_stats();
    info!(
        fetched = stats.tiles_downloaded,
        bytes = stats.bytes_downloaded,
        "session download statistics"
    );

    Ok(ExitCode::from(outcome_status(&outcome)))
}

fn run_tiles(config: RunnerConfig, args: &SelectionArgs) -> Result<ExitCode, RunnerError> {
    let root = args.out.clone().unwrap_or(config.output_dir);
    let grid = args.grid()?;
    if grid.is_empty() {
        return Err(RunnerError::EmptySelection);
    }

    let store = HttpTileStore::new(config.fetch)?;
    for cell in &grid {
        let (tile, path) = skadi_dem::resolve(cell, &root)?;
        let status = if store.exists(&path) { "present" } else { "missing" };
        println!("{}\t{}\t{}", tile, status, store.config().tile_url(&tile));
        debug!(%tile, path = %path.display(), "resolved cell");
    }
    Ok(ExitCode::SUCCESS)
}
