//! Background bulk download of a grid of tiles.
//!
//! A [`DownloadTask`] walks its grid in order on a single worker thread:
//!
//! 1. every cell is resolved up front, so a malformed cell fails the batch
//!    before any I/O happens;
//! 2. before each cell the cancel flag is polled;
//! 3. tiles already on disk are recorded without touching the network;
//! 4. missing tiles are fetched, written to a `.part` sibling and renamed
//!    into place once flushed;
//! 5. the first error stops the batch; files already written stay on disk.
//!
//! Each cell start is announced with its index and tile. Progress is
//! reported after each cell as `completed / total`, and exactly one finished
//! callback is made after the last progress callback.
//!
//! Cancellation is cooperative. A fetch already in flight runs to completion
//! (bounded by the store's own timeout); no new cell starts once the flag
//! has been observed.
//!
//! One task owns its destination root. Running two tasks over overlapping
//! grids into the same root is not coordinated and races on the presence
//! check.

use crate::address::{self, GridCell, TileId};
use crate::store::TileStore;
use crate::{Result, TileError};
use parking_lot::Mutex;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Suffix of a tile that is still being written.
const PART_EXTENSION: &str = "hgt.part";

/// Lifecycle of a download task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Created but not started.
    Pending,
    /// Worker loop is processing cells.
    Running,
    /// Stopped at a cancel request.
    Canceled,
    /// Stopped at the first error.
    Failed,
    /// Every cell was materialized.
    Succeeded,
}

impl TaskState {
    /// Whether the task can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Canceled | TaskState::Failed | TaskState::Succeeded
        )
    }
}

/// Terminal result of a download task.
///
/// `files` lists, in grid order, every destination path that exists on disk
/// at the end of the task, whether downloaded now or found already present.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// All cells were processed.
    Succeeded {
        /// Materialized tiles.
        files: Vec<PathBuf>,
    },
    /// A cancel request was observed before all cells were processed.
    Canceled {
        /// Tiles completed before the request was observed.
        files: Vec<PathBuf>,
    },
    /// Processing stopped at the first error.
    Failed {
        /// Tiles completed before the failing cell.
        files: Vec<PathBuf>,
        /// The error that stopped the task.
        error: TileError,
    },
}

impl DownloadOutcome {
    /// Terminal state matching this outcome.
    pub fn state(&self) -> TaskState {
        match self {
            DownloadOutcome::Succeeded { .. } => TaskState::Succeeded,
            DownloadOutcome::Canceled { .. } => TaskState::Canceled,
            DownloadOutcome::Failed { .. } => TaskState::Failed,
        }
    }

    /// Materialized tiles, in grid order.
    pub fn files(&self) -> &[PathBuf] {
        match self {
            DownloadOutcome::Succeeded { files }
            | DownloadOutcome::Canceled { files }
            | DownloadOutcome::Failed { files, .. } => files,
        }
    }

    /// Take ownership of the file list.
    pub fn into_files(self) -> Vec<PathBuf> {
        match self {
            DownloadOutcome::Succeeded { files }
            | DownloadOutcome::Canceled { files }
            | DownloadOutcome::Failed { files, .. } => files,
        }
    }

    /// The error that failed the task, if any.
    pub fn error(&self) -> Option<&TileError> {
        match self {
            DownloadOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Shared cancel flag, checked by the worker before each cell.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not canceled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Called before each cell is processed with its zero based index and tile.
pub type TileStartedCallback = Box<dyn FnMut(usize, &TileId) + Send>;

/// Called after each cell with the completed fraction in `(0, 1]`.
pub type ProgressCallback = Box<dyn FnMut(f64) + Send>;

/// Called once with the terminal outcome.
pub type FinishedCallback = Box<dyn FnOnce(&DownloadOutcome) + Send>;

/// State visible from outside the worker.
#[derive(Debug, Clone, Copy)]
struct Status {
    state: TaskState,
    completed: usize,
    total: usize,
}

/// A single-use task downloading every tile of a grid into a root directory.
pub struct DownloadTask {
    grid: Vec<GridCell>,
    root: PathBuf,
    store: Arc<dyn TileStore>,
    status: Arc<Mutex<Status>>,
    on_tile_started: Option<TileStartedCallback>,
    on_progress: Option<ProgressCallback>,
    on_finished: Option<FinishedCallback>,
}

impl std::fmt::Debug for DownloadTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadTask")
            .field("cells", &self.grid.len())
            .field("root", &self.root)
            .field("state", &self.status.lock().state)
            .finish()
    }
}

impl DownloadTask {
    /// Create a pending task.
    pub fn new<P: Into<PathBuf>>(grid: Vec<GridCell>, root: P, store: Arc<dyn TileStore>) -> Self {
        let total = grid.len();
        Self {
            grid,
            root: root.into(),
            store,
            status: Arc::new(Mutex::new(Status {
                state: TaskState::Pending,
                completed: 0,
                total,
            })),
            on_tile_started: None,
            on_progress: None,
            on_finished: None,
        }
    }

    /// Register a callback made as each cell starts, before any fetch.
    pub fn on_tile_started<F>(mut self, callback: F) -> Self
    where
        F: FnMut(usize, &TileId) + Send + 'static,
    {
        self.on_tile_started = Some(Box::new(callback));
        self
    }

    /// Register the progress callback.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(f64) + Send + 'static,
    {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Register the finished callback.
    pub fn on_finished<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&DownloadOutcome) + Send + 'static,
    {
        self.on_finished = Some(Box::new(callback));
        self
    }

    /// Number of cells in the grid.
    pub fn total(&self) -> usize {
        self.grid.len()
    }

    /// Destination root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current state.
    pub fn state(&self) -> TaskState {
        self.status.lock().state
    }

    /// Run the task on a dedicated worker thread.
    pub fn spawn(self) -> Result<TaskHandle> {
        let cancel = CancelToken::new();
        let status = Arc::clone(&self.status);
        let worker_cancel = cancel.clone();

        let thread = thread::Builder::new()
            .name("skadi-download".to_string())
            .spawn(move || self.run(&worker_cancel))?;

        Ok(TaskHandle {
            cancel,
            status,
            thread: Some(thread),
        })
    }

    /// Run the task to completion on the current thread.
    pub fn run(mut self, cancel: &CancelToken) -> DownloadOutcome {
        self.set_state(TaskState::Running);
        info!(
            tiles = self.grid.len(),
            root = %self.root.display(),
            "started tile download task"
        );

        let outcome = self.execute(cancel);

        match &outcome {
            DownloadOutcome::Succeeded { files } => {
                info!(tiles = files.len(), "finished downloading tiles")
            }
            DownloadOutcome::Canceled { files } => {
                info!(tiles = files.len(), "canceled tile download task")
            }
            DownloadOutcome::Failed { files, error } => {
                warn!(tiles = files.len(), %error, "tile download task failed")
            }
        }

        self.set_state(outcome.state());
        if let Some(callback) = self.on_finished.take() {
            callback(&outcome);
        }
        outcome
    }

    fn execute(&mut self, cancel: &CancelToken) -> DownloadOutcome {
        let total = self.grid.len();

        let mut targets = Vec::with_capacity(total);
        for cell in &self.grid {
            match address::resolve(cell, &self.root) {
                Ok(target) => targets.push(target),
                Err(error) => {
                    return DownloadOutcome::Failed {
                        files: Vec::new(),
                        error,
                    }
                }
            }
        }

        let mut files = Vec::with_capacity(total);
        for (index, (tile, path)) in targets.into_iter().enumerate() {
            if cancel.is_canceled() {
                debug!(index, "cancel request observed");
                return DownloadOutcome::Canceled { files };
            }
            if let Some(callback) = self.on_tile_started.as_mut() {
                callback(index, &tile);
            }

            if let Err(error) = self.materialize(&tile, &path) {
                return DownloadOutcome::Failed { files, error };
            }
            files.push(path);

            let completed = index + 1;
            self.status.lock().completed = completed;
            if let Some(callback) = self.on_progress.as_mut() {
                callback(completed as f64 / total as f64);
            }
        }

        DownloadOutcome::Succeeded { files }
    }

    /// Make sure `tile` exists at `path`, fetching it if needed.
    fn materialize(&self, tile: &TileId, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| TileError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        if self.store.exists(path) {
            debug!(%tile, "already downloaded tile");
            return Ok(());
        }

        let bytes = self.store.fetch(tile)?;
        write_atomic(path, &bytes)?;
        debug!(%tile, bytes = bytes.len(), "materialized tile");
        Ok(())
    }

    fn set_state(&self, state: TaskState) {
        self.status.lock().state = state;
    }
}

/// Write `bytes` to a `.part` sibling of `path`, then rename it into place.
///
/// The file is synced before the rename, so a tile visible under its final
/// name is always complete.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let part = path.with_extension(PART_EXTENSION);

    let result = write_synced(&part, bytes).and_then(|()| fs::rename(&part, path));
    if let Err(source) = result {
        if let Err(e) = fs::remove_file(&part) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %part.display(), error = %e, "failed to remove partial tile");
            }
        }
        return Err(TileError::Write {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Handle to a task running on its worker thread.
///
/// Dropping the handle requests cancellation without waiting for the worker.
#[derive(Debug)]
pub struct TaskHandle {
    cancel: CancelToken,
    status: Arc<Mutex<Status>>,
    thread: Option<JoinHandle<DownloadOutcome>>,
}

impl TaskHandle {
    /// Request cancellation; takes effect before the next cell starts.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A clone of the task's cancel flag, e.g. for a signal handler.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Current state.
    pub fn state(&self) -> TaskState {
        self.status.lock().state
    }

    /// Completed fraction of the grid, `1.0` for an empty grid.
    pub fn progress(&self) -> f64 {
        let status = *self.status.lock();
        if status.total == 0 {
            1.0
        } else {
            status.completed as f64 / status.total as f64
        }
    }

    /// Whether the worker has published its outcome.
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Wait for the worker and take its outcome.
    pub fn join(mut self) -> Result<DownloadOutcome> {
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| TileError::WorkerPanicked),
            None => Err(TileError::WorkerPanicked),
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.cancel.cancel();
        }
    }
}
