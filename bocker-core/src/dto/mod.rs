//! Data Transfer Objects
//!
//! Wire types for the Docker Hub API used to list published backups.

pub mod hub;
