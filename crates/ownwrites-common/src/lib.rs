//! Shared plumbing for the ownwrites crates: configuration files, error types
//! for that plumbing, and tracing setup.

pub mod config;
pub mod error;
pub mod telemetry;

pub use crate::error::CommonError;
