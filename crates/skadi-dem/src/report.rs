//! Turning a task outcome into host notifications.

use crate::task::DownloadOutcome;
use crate::TileError;
use std::path::Path;
use tracing::{error, info, warn};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Normal completion.
    Info,
    /// The task stopped early at the user's request.
    Warning,
    /// The task failed.
    Critical,
}

/// A single user-facing message about a finished task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Human readable text.
    pub message: String,
}

/// Host side that shows notifications to the user.
pub trait Notifier: Send {
    /// Show one notification.
    fn notify(&self, notification: &Notification);
}

/// Host side that displays materialized tiles.
pub trait RasterSink: Send {
    /// Load one tile. Failures are logged by the reporter, not propagated.
    fn load_raster(&self, path: &Path) -> Result<(), TileError>;
}

/// Notifier writing to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification) {
        match notification.level {
            NotificationLevel::Info => info!("{}", notification.message),
            NotificationLevel::Warning => warn!("{}", notification.message),
            NotificationLevel::Critical => error!("{}", notification.message),
        }
    }
}

/// Translates a [`DownloadOutcome`] into one notification and, on success,
/// asks the sink to load every file.
pub struct ResultReporter {
    notifier: Box<dyn Notifier>,
    sink: Box<dyn RasterSink>,
    load_on_success: bool,
}

impl std::fmt::Debug for ResultReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultReporter")
            .field("load_on_success", &self.load_on_success)
            .finish()
    }
}

impl ResultReporter {
    /// Create a reporter that loads tiles on success.
    pub fn new<N, S>(notifier: N, sink: S) -> Self
    where
        N: Notifier + 'static,
        S: RasterSink + 'static,
    {
        Self {
            notifier: Box::new(notifier),
            sink: Box::new(sink),
            load_on_success: true,
        }
    }

    /// Enable or disable loading tiles after a successful run.
    pub fn load_on_success(mut self, load: bool) -> Self {
        self.load_on_success = load;
        self
    }

    /// Build the notification for an outcome.
    pub fn notification(outcome: &DownloadOutcome) -> Notification {
        match outcome {
            DownloadOutcome::Succeeded { files } => Notification {
                level: NotificationLevel::Info,
                message: format!(
                    "Finished downloading tiles. {} tiles downloaded.",
                    files.len()
                ),
            },
            DownloadOutcome::Canceled { files } => Notification {
                level: NotificationLevel::Warning,
                message: format!(
                    "Canceled download task. {} tiles downloaded.",
                    files.len()
                ),
            },
            DownloadOutcome::Failed { error, .. } => Notification {
                level: NotificationLevel::Critical,
                message: format!(
                    "An error occurred during downloading: {}: {}",
                    error.kind(),
                    error
                ),
            },
        }
    }

    /// Notify the host and, on success, load the files in result order.
    pub fn report(&self, outcome: &DownloadOutcome) {
        self.notifier.notify(&Self::notification(outcome));

        if let DownloadOutcome::Succeeded { files } = outcome {
            if !self.load_on_success {
                return;
            }
            for path in files {
                if let Err(e) = self.sink.load_raster(path) {
                    warn!(path = %path.display(), error = %e, "failed to load raster");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::TileId;
    use crate::error::{FetchCause, FetchError};
    use parking_lot::Mutex;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Recorder {
        notes: Arc<Mutex<Vec<Notification>>>,
        loaded: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl Notifier for Recorder {
        fn notify(&self, notification: &Notification) {
            self.notes.lock().push(notification.clone());
        }
    }

    impl RasterSink for Recorder {
        fn load_raster(&self, path: &Path) -> Result<(), TileError> {
            self.loaded.lock().push(path.to_path_buf());
            if path.ends_with("bad.hgt") {
                return Err(TileError::InvalidRaster {
                    path: path.to_path_buf(),
                    reason: "unexpected size".to_string(),
                });
            }
            Ok(())
        }
    }

    fn files() -> Vec<PathBuf> {
        vec![
            PathBuf::from("N50/N50E008.hgt"),
            PathBuf::from("N52/bad.hgt"),
            PathBuf::from("N52/N52E013.hgt"),
        ]
    }

    #[test]
    fn test_success_notifies_and_loads_in_order() {
        let recorder = Recorder::default();
        let reporter = ResultReporter::new(recorder.clone(), recorder.clone());

        reporter.report(&DownloadOutcome::Succeeded { files: files() });

        let notes = recorder.notes.lock();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Info);
        assert!(notes[0].message.contains("3 tiles"));
        // A failing load does not stop the remaining ones.
        assert_eq!(*recorder.loaded.lock(), files());
    }

    #[test]
    fn test_success_without_loading() {
        let recorder = Recorder::default();
        let reporter =
            ResultReporter::new(recorder.clone(), recorder.clone()).load_on_success(false);

        reporter.report(&DownloadOutcome::Succeeded { files: files() });

        assert_eq!(recorder.notes.lock().len(), 1);
        assert!(recorder.loaded.lock().is_empty());
    }

    #[test]
    fn test_canceled_warns_with_count() {
        let recorder = Recorder::default();
        let reporter = ResultReporter::new(recorder.clone(), recorder.clone());

        reporter.report(&DownloadOutcome::Canceled {
            files: vec![PathBuf::from("N50/N50E008.hgt")],
        });

        let notes = recorder.notes.lock();
        assert_eq!(notes[0].level, NotificationLevel::Warning);
        assert!(notes[0].message.contains("1 tiles downloaded"));
        assert!(recorder.loaded.lock().is_empty());
    }

    #[test]
    fn test_failure_names_error_kind() {
        let recorder = Recorder::default();
        let reporter = ResultReporter::new(recorder.clone(), recorder.clone());
        let tile: TileId = "N52E013".parse().unwrap();

        reporter.report(&DownloadOutcome::Failed {
            files: files(),
            error: FetchError::new(tile, FetchCause::Status(503)).into(),
        });

        let notes = recorder.notes.lock();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Critical);
        assert!(notes[0].message.contains("FetchError"));
        assert!(notes[0].message.contains("N52E013"));
        assert!(notes[0].message.contains("HTTP 503"));
        assert!(recorder.loaded.lock().is_empty());
    }
}
