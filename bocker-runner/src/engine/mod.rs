//! Pipeline engine
//!
//! Drives an ordered list of stages one at a time, halting on the first
//! failure and publishing a snapshot to every observer after each
//! transition. Stages are plain values built per invocation.

mod observer;
mod pipeline;
mod stage;

pub use observer::{CancelFlag, PipelineObserver};
pub use pipeline::Pipeline;
pub use stage::{SkipPredicate, Stage, StageAction};
