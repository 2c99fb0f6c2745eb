//! Operator-facing activity log.
//!
//! Every entry is also emitted through `tracing`, so headless runs keep
//! the same record in their logs.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{error, info};

const DEFAULT_CAPACITY: usize = 200;

/// One line of the activity log.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub is_error: bool,
}

impl std::fmt::Display for ActivityEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let marker = if self.is_error { " ERROR:" } else { "" };
        write!(f, "[{}]{} {}", self.timestamp.format("%H:%M:%S"), marker, self.message)
    }
}

/// Bounded, shared activity log with live subscription.
#[derive(Clone)]
pub struct ActivityLog {
    entries: Arc<Mutex<VecDeque<ActivityEntry>>>,
    capacity: usize,
    tx: broadcast::Sender<ActivityEntry>,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ActivityLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
            tx,
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "camrig::activity", "{}", message);
        self.push(message, false);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        error!(target: "camrig::activity", "{}", message);
        self.push(message, true);
    }

    /// Snapshot of the retained entries, oldest first.
    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn last(&self) -> Option<ActivityEntry> {
        self.lock().back().cloned()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActivityEntry> {
        self.tx.subscribe()
    }

    fn push(&self, message: String, is_error: bool) {
        let entry = ActivityEntry {
            timestamp: Utc::now(),
            message,
            is_error,
        };
        {
            let mut entries = self.lock();
            if entries.len() == self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry.clone());
        }
        // No subscribers is fine
        let _ = self.tx.send(entry);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<ActivityEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
