//! De-duplicated index of capture files surfaced to the operator.
//!
//! Files arrive from direct capture responses, the live event channel and
//! the gallery poll. Each filename is surfaced at most once until it is
//! explicitly removed.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tracing::debug;

use crate::metrics::record_file_surfaced;

/// A file that became visible to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfacedFile {
    pub filename: String,
    pub source: String,
}

#[derive(Debug, Default)]
struct FileIndex {
    known: HashSet<String>,
    /// Most recent first
    recent: VecDeque<String>,
}

/// Shared known-file set plus the bounded recent list shown in the gallery.
#[derive(Clone)]
pub struct KnownFiles {
    inner: Arc<Mutex<FileIndex>>,
    limit: usize,
    tx: broadcast::Sender<SurfacedFile>,
}

impl KnownFiles {
    pub fn new(limit: usize) -> Self {
        let (tx, _) = broadcast::channel(128);
        Self {
            inner: Arc::new(Mutex::new(FileIndex::default())),
            limit: limit.max(1),
            tx,
        }
    }

    /// Record a file; returns `true` only the first time it is seen.
    ///
    /// Check and insert happen under one lock.
    pub fn surface(&self, filename: &str, source: &str) -> bool {
        {
            let mut index = self.lock();
            if !index.known.insert(filename.to_string()) {
                return false;
            }
            index.recent.push_front(filename.to_string());
            index.recent.truncate(self.limit);
        }

        debug!(filename = %filename, source = %source, "Surfaced new file");
        record_file_surfaced(source);
        let _ = self.tx.send(SurfacedFile {
            filename: filename.to_string(),
            source: source.to_string(),
        });
        true
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.lock().known.contains(filename)
    }

    /// Forget files so they may be surfaced again.
    pub fn remove<'a>(&self, filenames: impl IntoIterator<Item = &'a str>) {
        let mut index = self.lock();
        for name in filenames {
            index.known.remove(name);
            index.recent.retain(|f| f != name);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recent files, most recent first.
    pub fn recent(&self) -> Vec<String> {
        self.lock().recent.iter().cloned().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SurfacedFile> {
        self.tx.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FileIndex> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
