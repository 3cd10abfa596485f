//! Action log service
//!
//! Records what a workflow run actually did: every external command line,
//! soft conflicts that were tolerated, and the outcome. The entries are
//! written to the debug report when a run fails.

use bocker_core::domain::log::{LogEntry, LogLevel};
use std::sync::{Arc, Mutex, PoisonError};

/// Service for recording workflow actions
pub trait ActionLog: Send + Sync {
    /// Appends an entry
    fn record(&self, entry: LogEntry);

    /// Returns every recorded entry in order
    fn entries(&self) -> Vec<LogEntry>;

    fn info(&self, message: String) {
        self.record(LogEntry::now(LogLevel::Info, message));
    }

    fn warning(&self, message: String) {
        self.record(LogEntry::now(LogLevel::Warning, message));
    }

    fn error(&self, message: String) {
        self.record(LogEntry::now(LogLevel::Error, message));
    }
}

/// In-memory implementation of ActionLog
///
/// Uses Arc<Mutex<Vec<LogEntry>>> so stage closures and the CLI can share it.
#[derive(Clone, Default)]
pub struct InMemoryActionLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl InMemoryActionLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActionLog for InMemoryActionLog {
    fn record(&self, entry: LogEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.push(entry);
    }

    fn entries(&self) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.clone()
    }
}
