//! Core domain types
//!
//! This module contains the domain structures shared by the engine, the
//! image codec and the CLI front end.

pub mod backup;
pub mod credentials;
pub mod image;
pub mod log;
pub mod pipeline;
