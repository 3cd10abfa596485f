//! Pipeline stages

use bocker_core::Result;
use bocker_core::domain::pipeline::{StageSnapshot, StageState};

/// Fallible unit of work run by a stage
pub type StageAction = Box<dyn FnMut() -> Result<()> + Send>;

/// Decides whether a stage is a no-op for this run
pub type SkipPredicate = Box<dyn Fn() -> bool + Send>;

/// One named, possibly conditional unit of work
///
/// Created `Pending`; only the engine moves it forward.
pub struct Stage {
    name: String,
    action: StageAction,
    skip: SkipPredicate,
    state: StageState,
    error: Option<bocker_core::Error>,
}

impl Stage {
    /// Creates a stage that always runs its action
    pub fn new(
        name: impl Into<String>,
        action: impl FnMut() -> Result<()> + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            action: Box::new(action),
            skip: Box::new(|| false),
            state: StageState::Pending,
            error: None,
        }
    }

    /// Makes the stage complete without running its action when `skip` is true
    pub fn skip_when(mut self, skip: impl Fn() -> bool + Send + 'static) -> Self {
        self.skip = Box::new(skip);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> StageState {
        self.state
    }

    /// Error recorded when the action failed
    pub fn error(&self) -> Option<&bocker_core::Error> {
        self.error.as_ref()
    }

    pub(crate) fn activate(&mut self) {
        self.state = StageState::Active;
    }

    pub(crate) fn reset(&mut self) {
        self.state = StageState::Pending;
    }

    /// Runs the stage to a terminal state
    ///
    /// Returns whether the skip predicate short-circuited the action.
    pub(crate) fn execute(&mut self) -> bool {
        if (self.skip)() {
            self.state = StageState::Complete;
            return true;
        }

        match (self.action)() {
            Ok(()) => self.state = StageState::Complete,
            Err(e) => {
                self.error = Some(e);
                self.state = StageState::Failed;
            }
        }
        false
    }

    pub(crate) fn snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            name: self.name.clone(),
            state: self.state,
            error: self.error.as_ref().map(|e| e.to_string()),
        }
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("error", &self.error)
            .finish()
    }
}
