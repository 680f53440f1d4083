//! Runner errors.

use skadi_dem::{DownloadOutcome, TileError};
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Exit status for bad configuration or an unusable selection.
pub const EXIT_USAGE: u8 = 2;

/// Exit status of a run stopped with Ctrl-C.
pub const EXIT_CANCELED: u8 = 130;

/// Errors that stop the runner before or outside a download task.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Configuration file could not be read.
    #[error("Failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid YAML for the runner.
    #[error("Invalid config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Nothing to download.
    #[error("No tiles selected; pass --bbox or --cell")]
    EmptySelection,

    /// Ctrl-C handler could not be installed.
    #[error("Failed to set signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    /// Error from the tile library.
    #[error(transparent)]
    Tile(#[from] TileError),
}

impl RunnerError {
    /// Process exit status for this error.
    pub fn status(&self) -> u8 {
        match self {
            RunnerError::ConfigRead { .. }
            | RunnerError::ConfigParse { .. }
            | RunnerError::EmptySelection => EXIT_USAGE,
            RunnerError::Tile(e) => tile_error_status(e),
            RunnerError::Signal(_) => 1,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.status())
    }
}

/// Exit status for a finished download task.
///
/// A task that failed on an invalid cell exits like a selection rejected
/// before the task started.
pub fn outcome_status(outcome: &DownloadOutcome) -> u8 {
    match outcome {
        DownloadOutcome::Succeeded { .. } => 0,
        DownloadOutcome::Canceled { .. } => EXIT_CANCELED,
        DownloadOutcome::Failed { error, .. } => tile_error_status(error),
    }
}

fn tile_error_status(error: &TileError) -> u8 {
    match error {
        TileError::InvalidCell { .. } => EXIT_USAGE,
        _ => 1,
    }
}
