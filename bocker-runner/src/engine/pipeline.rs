//! Pipeline state machine

use bocker_core::domain::pipeline::{PipelineSnapshot, PipelineState, StageState};
use bocker_core::{Error, Result};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::observer::{CancelFlag, PipelineObserver};
use super::stage::Stage;

/// Ordered, fail-fast sequence of stages
///
/// Each call to [`tick`](Pipeline::tick) performs exactly one transition:
/// - `Idle -> Running` (or straight to `Done` when there are no stages)
/// - the next stage `Pending -> Active`
/// - the active stage `Active -> Complete | Failed`, moving the pipeline to
///   `Done` or `Halted` in the same step
///
/// A snapshot is published to every observer after each transition.
pub struct Pipeline {
    run_id: Uuid,
    name: String,
    stages: Vec<Stage>,
    cursor: usize,
    state: PipelineState,
    observers: Vec<Box<dyn PipelineObserver>>,
}

impl Pipeline {
    pub fn new(run_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            run_id,
            name: name.into(),
            stages: Vec::new(),
            cursor: 0,
            state: PipelineState::Idle,
            observers: Vec::new(),
        }
    }

    /// Appends a stage; stages run in insertion order
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Registers an observer for every subsequent transition
    pub fn subscribe(&mut self, observer: impl PipelineObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn subscribe_boxed(&mut self, observer: Box<dyn PipelineObserver>) {
        self.observers.push(observer);
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The failed stage and its error, once the pipeline has halted
    pub fn failure(&self) -> Option<(&str, &Error)> {
        self.stages
            .iter()
            .find_map(|s| s.error().map(|e| (s.name(), e)))
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            run_id: self.run_id,
            name: self.name.clone(),
            state: self.state,
            stages: self.stages.iter().map(Stage::snapshot).collect(),
            taken_at: chrono::Utc::now(),
        }
    }

    /// Advances the pipeline by one transition
    ///
    /// Ticking a finished pipeline changes nothing and publishes nothing.
    pub fn tick(&mut self) -> PipelineSnapshot {
        match self.state {
            PipelineState::Idle => {
                self.state = if self.stages.is_empty() {
                    PipelineState::Done
                } else {
                    PipelineState::Running
                };
                debug!("Pipeline '{}' is {}", self.name, self.state);
                self.publish()
            }
            PipelineState::Running => self.advance_stage(),
            _ => self.snapshot(),
        }
    }

    /// Stops the pipeline before the next stage runs
    ///
    /// A stage that was activated but not yet executed returns to `Pending`.
    pub fn cancel(&mut self) -> PipelineSnapshot {
        if self.state.is_terminal() {
            return self.snapshot();
        }

        if let Some(stage) = self.stages.get_mut(self.cursor) {
            if stage.state() == StageState::Active {
                stage.reset();
            }
        }

        warn!("Pipeline '{}' cancelled", self.name);
        self.state = PipelineState::Cancelled;
        self.publish()
    }

    /// Ticks until the pipeline is `Done`, `Halted` or `Cancelled`
    ///
    /// `cancel` is checked before every tick.
    ///
    /// # Errors
    /// - `StageFailed` naming the stage that halted the pipeline
    /// - `Cancelled` when the flag was raised
    pub fn run(&mut self, cancel: &CancelFlag) -> Result<()> {
        while !self.state.is_terminal() {
            if cancel.is_cancelled() {
                self.cancel();
                break;
            }
            self.tick();
        }

        match self.state {
            PipelineState::Done => Ok(()),
            PipelineState::Cancelled => Err(Error::Cancelled),
            _ => {
                let (stage, message) = self
                    .failure()
                    .map(|(stage, e)| (stage.to_string(), e.to_string()))
                    .unwrap_or_else(|| (self.name.clone(), "pipeline halted".to_string()));
                Err(Error::StageFailed { stage, message })
            }
        }
    }

    fn advance_stage(&mut self) -> PipelineSnapshot {
        let total = self.stages.len();
        let index = self.cursor;
        let Some(stage) = self.stages.get_mut(index) else {
            self.state = PipelineState::Done;
            return self.publish();
        };

        if stage.state() == StageState::Pending {
            info!("Executing stage {}/{}: {}", index + 1, total, stage.name());
            stage.activate();
            return self.publish();
        }

        let skipped = stage.execute();
        if skipped {
            debug!("Stage '{}' skipped", stage.name());
        }

        match stage.state() {
            StageState::Complete => {
                self.cursor += 1;
                if self.cursor == total {
                    info!("Pipeline '{}' done", self.name);
                    self.state = PipelineState::Done;
                }
            }
            _ => {
                if let Some(e) = stage.error() {
                    warn!("Stage '{}' failed: {}", stage.name(), e);
                }
                self.state = PipelineState::Halted;
            }
        }

        self.publish()
    }

    fn publish(&mut self) -> PipelineSnapshot {
        let snapshot = self.snapshot();
        for observer in &mut self.observers {
            observer.on_snapshot(&snapshot);
        }
        snapshot
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("run_id", &self.run_id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("stages", &self.stages)
            .finish()
    }
}
