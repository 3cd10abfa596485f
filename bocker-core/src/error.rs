//! Error types shared across bocker crates

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bocker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a backup or restore workflow
#[derive(Debug, Error)]
pub enum Error {
    /// A required external binary is absent from the search path
    #[error("Required tool '{tool}' was not found. Is it installed and on PATH?")]
    ToolNotFound { tool: String },

    /// An external process returned non-zero
    #[error("{tool} failed (exit code {code}): {diagnostics}")]
    ToolExecutionFailed {
        tool: String,
        code: i32,
        /// Combined stdout/stderr of the process, verbatim
        diagnostics: String,
    },

    /// Manifest missing/empty, member not found, extraction failed
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// A tool reported a condition the workflow treats as success
    #[error("Soft conflict: {0}")]
    SoftConflict(String),

    /// A required credential or parameter is absent
    #[error("Missing configuration: {0}")]
    ConfigurationMissing(String),

    /// A pipeline stage returned an error and halted the pipeline
    #[error("Stage '{stage}' failed: {message}")]
    StageFailed { stage: String, message: String },

    /// The operator interrupted the pipeline between stages
    #[error("Pipeline cancelled by operator")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a tool failure from an exit code and its captured output
    pub fn tool_failed(tool: impl Into<String>, code: i32, diagnostics: impl Into<String>) -> Self {
        Self::ToolExecutionFailed {
            tool: tool.into(),
            code,
            diagnostics: diagnostics.into(),
        }
    }

    /// Create a missing-configuration error
    pub fn missing(what: impl Into<String>) -> Self {
        Self::ConfigurationMissing(what.into())
    }

    /// Check if this error is a soft conflict
    pub fn is_soft_conflict(&self) -> bool {
        matches!(self, Self::SoftConflict(_))
    }

    /// Check if this error came from the archive layer
    pub fn is_archive_error(&self) -> bool {
        matches!(self, Self::Archive(_))
    }
}

/// Errors raised while reading saved-image archives
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive not found: {}", .0.display())]
    ArchiveNotFound(PathBuf),

    #[error("Member '{member}' not found in {}", archive.display())]
    MemberNotFound { archive: PathBuf, member: String },

    #[error("Failed to extract '{member}' from {}: {diagnostics}", archive.display())]
    ExtractionFailed {
        archive: PathBuf,
        member: String,
        diagnostics: String,
    },

    #[error("manifest.json not found in {}", .0.display())]
    ManifestMissing(PathBuf),

    #[error("Image manifest has no entries")]
    ManifestEmpty,

    #[error("Image manifest is not valid: {0}")]
    ManifestInvalid(String),

    #[error("Image manifest entry lists no layers")]
    NoLayers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_failed_keeps_diagnostics_verbatim() {
        let err = Error::tool_failed("pg_dump", 1, "pg_dump: error: connection refused\n");
        let text = err.to_string();
        assert!(text.contains("pg_dump failed (exit code 1)"));
        assert!(text.contains("connection refused"));
    }

    #[test]
    fn test_archive_error_is_transparent() {
        let err: Error = ArchiveError::ManifestEmpty.into();
        assert!(err.is_archive_error());
        assert_eq!(err.to_string(), "Image manifest has no entries");
    }

    #[test]
    fn test_soft_conflict_detection() {
        assert!(Error::SoftConflict("database exists".into()).is_soft_conflict());
        assert!(!Error::Cancelled.is_soft_conflict());
    }
}
