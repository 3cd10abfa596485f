//! Bocker Runner
//!
//! Runs the backup and restore workflows.
//!
//! Architecture:
//! - Engine: ordered, fail-fast pipeline of stages with snapshot publishing
//! - Collaborators: container runtime and PostgreSQL tools behind traits
//! - Services: action log, tool preflight
//! - Workflows: the two concrete stage sequences
//!
//! A workflow assembles a [`Pipeline`](engine::Pipeline) whose stages close
//! over explicitly injected collaborators; the engine drives them one at a
//! time inside a [`RunContext`](context::RunContext) that owns the working
//! directory.

pub mod config;
pub mod context;
pub mod docker;
pub mod engine;
pub mod postgres;
pub mod process;
pub mod service;
pub mod workflow;

pub use context::RunContext;
pub use engine::{CancelFlag, Pipeline, PipelineObserver, Stage};
