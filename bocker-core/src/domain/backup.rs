//! Backup artifact naming
//!
//! The write path names files after the source database and a per-invocation
//! timestamp; that timestamp is also the image tag. The read path recomputes
//! the same names from the tag, so both sides must go through this type.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// `chrono` format of the per-invocation timestamp, e.g. `2024-01-01_00-00-00`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Deterministic file names for one backup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupNaming {
    source: String,
    timestamp: String,
}

impl BackupNaming {
    /// Names for a backup of `source` taken at `timestamp` (or restored from tag `timestamp`)
    pub fn new(source: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Names for a backup of `source` stamped with the current local time
    pub fn now(source: impl Into<String>) -> Self {
        Self::at(source, Local::now())
    }

    pub fn at(source: impl Into<String>, when: DateTime<Local>) -> Self {
        Self::new(source, when.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// `{source}_{timestamp}_backup.psql`
    pub fn backup_file(&self) -> String {
        format!("{}_{}_backup.psql", self.source, self.timestamp)
    }

    /// `{source}_{timestamp}_roles_backup.sql`
    pub fn roles_file(&self) -> String {
        format!("{}_{}_roles_backup.sql", self.source, self.timestamp)
    }
}
