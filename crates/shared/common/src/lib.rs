//! Common utilities shared across the workspace.
//!
//! This crate provides:
//! - Unified store error handling
//! - Configuration structures loaded from the environment
//! - Tracing bootstrap for hosting applications and tests

pub mod config;
pub mod constants;
pub mod error;
pub mod telemetry;

pub use config::*;
pub use error::{StoreError, StoreResult};
