//! Recent-capture gallery with selection and batch delete.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use camrig_client::{BackendClient, ClientError, ClientResult};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::activity::ActivityLog;
use crate::error::{SessionError, SessionResult};
use crate::known_files::KnownFiles;

/// Source tag for files discovered by the gallery poll.
pub const POLL_SOURCE: &str = "poll";

/// Result of a batch delete.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteReport {
    /// Count reported by the backend
    pub deleted_count: u32,
    /// Requested files confirmed gone
    pub deleted: Vec<String>,
    /// Requested files named in the backend's errors
    pub failed: Vec<String>,
    pub errors: Vec<String>,
}

impl DeleteReport {
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Treat a partial delete as a failure.
    pub fn into_result(self) -> ClientResult<Self> {
        if self.is_partial() {
            Err(ClientError::PartialFailure {
                deleted: self.deleted_count,
                errors: self.errors,
            })
        } else {
            Ok(self)
        }
    }
}

/// Gallery over the session's known files.
pub struct Gallery {
    client: BackendClient,
    known_files: KnownFiles,
    activity: ActivityLog,
    selection: Mutex<BTreeSet<String>>,
}

impl Gallery {
    pub fn new(client: BackendClient, known_files: KnownFiles, activity: ActivityLog) -> Self {
        Self {
            client,
            known_files,
            activity,
            selection: Mutex::new(BTreeSet::new()),
        }
    }

    /// Recent files, most recent first.
    pub fn files(&self) -> Vec<String> {
        self.known_files.recent()
    }

    /// Fetch the backend's recent captures and surface the unknown ones.
    ///
    /// Returns the newly surfaced files, most recent first.
    pub async fn refresh(&self) -> SessionResult<Vec<String>> {
        let files = self.client.list_captures().await?;

        // Oldest first, so the newest ends up on top
        let mut new_files = files
            .iter()
            .rev()
            .filter(|f| self.known_files.surface(f, POLL_SOURCE))
            .cloned()
            .collect::<Vec<_>>();
        new_files.reverse();

        if !new_files.is_empty() {
            debug!(count = new_files.len(), "Gallery picked up new files");
        }
        Ok(new_files)
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Flip a file's selection; returns whether it is now selected.
    pub fn toggle(&self, filename: &str) -> bool {
        let mut selection = self.lock_selection();
        if selection.remove(filename) {
            false
        } else {
            selection.insert(filename.to_string());
            true
        }
    }

    pub fn select_all(&self) {
        let files = self.files();
        self.lock_selection().extend(files);
    }

    pub fn deselect_all(&self) {
        self.lock_selection().clear();
    }

    pub fn is_selected(&self, filename: &str) -> bool {
        self.lock_selection().contains(filename)
    }

    pub fn selected(&self) -> Vec<String> {
        self.lock_selection().iter().cloned().collect()
    }

    pub fn selected_count(&self) -> usize {
        self.lock_selection().len()
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete the selected files after `confirm` approves the count.
    ///
    /// Returns `Ok(None)` when the operator declines. Only files the
    /// backend did not report as failed leave the known set; the gallery is
    /// re-polled afterwards.
    pub async fn delete_selected<F>(&self, confirm: F) -> SessionResult<Option<DeleteReport>>
    where
        F: FnOnce(usize) -> bool,
    {
        let requested = self.selected();
        if requested.is_empty() {
            return Err(SessionError::validation("No images selected"));
        }
        if !confirm(requested.len()) {
            return Ok(None);
        }

        let response = match self.client.delete_images(&requested).await {
            Ok(response) => response,
            Err(e) => {
                self.activity
                    .error(format!("Delete failed: {}", e.user_message()));
                return Err(e.into());
            }
        };

        let (deleted, failed) = response.partition(&requested);
        self.known_files.remove(deleted.iter().copied());
        {
            let mut selection = self.lock_selection();
            for name in &deleted {
                selection.remove(*name);
            }
        }

        let report = DeleteReport {
            deleted_count: response.deleted_count,
            deleted: deleted.iter().map(|s| s.to_string()).collect(),
            failed: failed.iter().map(|s| s.to_string()).collect(),
            errors: response.errors,
        };

        info!(
            deleted = report.deleted_count,
            failed = report.failed.len(),
            "Deleted images"
        );
        self.activity
            .info(format!("Deleted {} images.", report.deleted_count));
        for error in &report.errors {
            self.activity.error(error.clone());
        }

        if let Err(e) = self.refresh().await {
            warn!("Gallery refresh after delete failed: {}", e);
        }
        Ok(Some(report))
    }

    /// Poll the backend on a fixed interval as a fallback to push events.
    pub fn spawn_poller(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Starting gallery poller (interval: {:?})", every);
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh().await {
                    debug!("Gallery poll failed: {}", e);
                }
            }
        })
    }

    fn lock_selection(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        self.selection.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
