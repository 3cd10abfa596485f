//! Snapshot observers and cancellation

use bocker_core::domain::pipeline::PipelineSnapshot;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Receives a full pipeline snapshot after every transition
pub trait PipelineObserver: Send {
    fn on_snapshot(&mut self, snapshot: &PipelineSnapshot);
}

impl<F> PipelineObserver for F
where
    F: FnMut(&PipelineSnapshot) + Send,
{
    fn on_snapshot(&mut self, snapshot: &PipelineSnapshot) {
        self(snapshot)
    }
}

/// Shared interrupt flag checked by the engine before each tick
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; the engine stops before the next tick
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
