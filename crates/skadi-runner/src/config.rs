//! YAML configuration for the runner.
//!
//! ```yaml
//! output_dir: ./elevation_cache
//! load: true
//! fetch:
//!   base_url: https://s3.amazonaws.com/elevation-tiles-prod/skadi
//!   timeout_secs: 60
//!   user_agent: skadi/0.1
//! ```
//!
//! Every key is optional. Command line flags take precedence.

use crate::cli::FetchArgs;
use crate::error::RunnerError;
use serde::{Deserialize, Serialize};
use skadi_dem::FetchConfig;
use std::path::{Path, PathBuf};

/// Destination used when neither the config nor the command line names one.
pub const DEFAULT_OUTPUT_DIR: &str = "elevation_cache";

/// Runner configuration file contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// HTTP settings for the tile store.
    pub fetch: FetchConfig,
    /// Destination root.
    pub output_dir: PathBuf,
    /// Open each tile after a successful download.
    pub load: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            load: true,
        }
    }
}

impl RunnerConfig {
    /// Load from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, RunnerError> {
        let text = std::fs::read_to_string(path).map_err(|source| RunnerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| RunnerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Load the file if one was given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, RunnerError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Apply command line overrides for `skadi fetch`.
    pub fn apply_fetch_args(&mut self, args: &FetchArgs) {
        if let Some(out) = &args.selection.out {
            self.output_dir = out.clone();
        }
        if let Some(base_url) = &args.base_url {
            self.fetch.base_url = base_url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.fetch.timeout_secs = timeout;
        }
        if args.no_load {
            self.load = false;
        }
    }
}
