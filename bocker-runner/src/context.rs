//! Run context
//!
//! State owned by one backup or restore invocation:
//! - Run id shared by every snapshot
//! - Scratch working directory, removed when the context is dropped
//! - Action log feeding the post-mortem report

use bocker_core::Result;
use bocker_core::domain::log::LogEntry;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::info;
use uuid::Uuid;

use crate::process::ToolRunner;
use crate::service::{ActionLog, InMemoryActionLog};

/// File name of the report written when a run fails
pub const DEBUG_REPORT_FILE: &str = "bocker-debug.log";

/// Execution context for a single workflow run
pub struct RunContext {
    run_id: Uuid,
    work_dir: TempDir,
    log: Arc<InMemoryActionLog>,
}

impl RunContext {
    /// Creates a context with a fresh working directory under the system temp dir
    pub fn new() -> Result<Self> {
        let work_dir = tempfile::Builder::new().prefix("bocker-").tempdir()?;
        Ok(Self::with_work_dir(work_dir))
    }

    pub fn with_work_dir(work_dir: TempDir) -> Self {
        let run_id = Uuid::new_v4();
        info!("Run {} using {}", run_id, work_dir.path().display());
        Self {
            run_id,
            work_dir,
            log: Arc::new(InMemoryActionLog::new()),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    pub fn log(&self) -> Arc<InMemoryActionLog> {
        Arc::clone(&self.log)
    }

    /// Tool runner recording into this run's action log
    pub fn runner(&self) -> ToolRunner {
        ToolRunner::new(self.log.clone())
    }

    /// Renders the post-mortem report for a failed run
    pub fn render_report(&self, error: &dyn std::fmt::Display) -> String {
        render_report(self.run_id, &self.log.entries(), error)
    }

    /// Writes the post-mortem report to `path`
    pub fn write_report(&self, path: &Path, error: &dyn std::fmt::Display) -> Result<()> {
        std::fs::write(path, self.render_report(error))?;
        Ok(())
    }
}

fn render_report(run_id: Uuid, entries: &[LogEntry], error: &dyn std::fmt::Display) -> String {
    let mut report = String::new();
    let _ = writeln!(
        report,
        "Ran at: {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(report, "Run id: {}", run_id);
    let _ = writeln!(report);
    let _ = writeln!(report, "Actions:");
    if entries.is_empty() {
        let _ = writeln!(report, "  (none)");
    }
    for entry in entries {
        let _ = writeln!(
            report,
            "  [{}] {:<5} {}",
            entry.timestamp.format("%H:%M:%S"),
            entry.level.to_string(),
            entry.message
        );
    }
    let _ = writeln!(report);
    let _ = writeln!(
        report,
        "Re-run the failing command by hand to inspect it in detail."
    );
    let _ = writeln!(report);
    let _ = writeln!(report, "Error: {}", error);
    report
}
