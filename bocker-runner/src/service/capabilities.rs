//! Capabilities service
//!
//! Verifies that the external binaries a workflow needs are installed
//! before any stage runs.

use bocker_core::Result;
use tracing::info;

use crate::process::ToolRunner;

/// Service trait for tool preflight
pub trait CapabilitiesService: Send + Sync {
    /// Checks that every tool in `tools` answers `--version`
    ///
    /// # Errors
    /// `ToolNotFound` for the first missing tool
    fn require(&self, tools: &[String]) -> Result<()>;
}

/// Standard implementation of CapabilitiesService
pub struct StandardCapabilitiesService {
    runner: ToolRunner,
}

impl StandardCapabilitiesService {
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }
}

impl CapabilitiesService for StandardCapabilitiesService {
    fn require(&self, tools: &[String]) -> Result<()> {
        for tool in tools {
            let version = self.runner.check_available(tool)?;
            info!("{} is available: {}", tool, version.trim());
        }
        Ok(())
    }
}
