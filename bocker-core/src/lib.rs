//! Bocker Core
//!
//! Core types and abstractions shared by the bocker crates.
//!
//! This crate contains:
//! - Domain types: pipeline state, backup naming, image manifests, log entries
//! - DTOs: wire types for the Docker Hub API
//! - The error taxonomy every workflow reports through

pub mod domain;
pub mod dto;
pub mod error;

pub use error::{ArchiveError, Error, Result};
