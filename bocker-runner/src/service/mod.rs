//! Service layer
//!
//! Cross-cutting services used by the workflows: the action log that feeds
//! the post-mortem report and the tool preflight check.
//!
//! All services are trait-based to enable testing and dependency injection.

mod action_log;
mod capabilities;

pub use action_log::{ActionLog, InMemoryActionLog};
pub use capabilities::{CapabilitiesService, StandardCapabilitiesService};
