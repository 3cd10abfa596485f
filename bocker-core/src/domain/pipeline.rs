//! Pipeline domain types
//!
//! State carried by the pipeline engine and published to renderers. The
//! engine itself lives in `bocker-runner`; these types are the read-only view
//! any front end (terminal, log line, JSON stream) consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a single stage: `Pending -> Active -> {Complete | Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    Pending,
    Active,
    Complete,
    Failed,
}

impl StageState {
    pub fn is_terminal(self) -> bool {
        matches!(self, StageState::Complete | StageState::Failed)
    }
}

impl std::fmt::Display for StageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageState::Pending => write!(f, "Pending"),
            StageState::Active => write!(f, "Active"),
            StageState::Complete => write!(f, "Complete"),
            StageState::Failed => write!(f, "Failed"),
        }
    }
}

/// Lifecycle of a whole pipeline: `Idle -> Running -> {Done | Halted | Cancelled}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Running,
    /// Every stage reached `Complete`
    Done,
    /// A stage failed; no further stages ran
    Halted,
    /// The operator interrupted the run between stages
    Cancelled,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Done | PipelineState::Halted | PipelineState::Cancelled
        )
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "Idle"),
            PipelineState::Running => write!(f, "Running"),
            PipelineState::Done => write!(f, "Done"),
            PipelineState::Halted => write!(f, "Halted"),
            PipelineState::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Point-in-time view of one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSnapshot {
    pub name: String,
    pub state: StageState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full, consistent view of every stage in a pipeline
///
/// Published after every transition so renderers can redraw the whole list
/// without tracking diffs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    pub run_id: Uuid,
    pub name: String,
    pub state: PipelineState,
    pub stages: Vec<StageSnapshot>,
    pub taken_at: DateTime<Utc>,
}

impl PipelineSnapshot {
    /// The stage currently executing, if any
    pub fn active_stage(&self) -> Option<&StageSnapshot> {
        self.stages.iter().find(|s| s.state == StageState::Active)
    }

    /// The stage that halted the pipeline, if any
    pub fn failed_stage(&self) -> Option<&StageSnapshot> {
        self.stages.iter().find(|s| s.state == StageState::Failed)
    }

    /// Number of stages in the given state
    pub fn count(&self, state: StageState) -> usize {
        self.stages.iter().filter(|s| s.state == state).count()
    }
}
