//! Common types and utilities shared across the simulation.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`PoolConfig`](config::PoolConfig)
//! - Error types
//! - Identifiers ([`BufferId`])

mod buffer_id;
pub mod config;
pub mod error;

pub use buffer_id::BufferId;
pub use config::PoolConfig;
pub use error::{Error, Result};
