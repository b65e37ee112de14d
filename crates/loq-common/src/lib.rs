#![deny(missing_docs)]

//! Shared configuration, error types, and observability primitives for loq crates.
//!
//! Architecture role:
//! - defines engine/runtime configuration passed across layers
//! - provides common [`LoqError`] / [`Result`] contracts
//! - hosts the per-query memory budget tracker and metrics utilities
//!
//! Key modules:
//! - [`config`]
//! - [`error`]
//! - [`memory`]
//! - [`metrics`]

/// Shared engine/runtime configuration types.
pub mod config;
/// Shared error taxonomy.
pub mod error;
/// Per-query memory budget tracking.
pub mod memory;
/// Metrics registry and Prometheus rendering helpers.
pub mod metrics;

pub use config::EngineConfig;
pub use error::{LoqError, Result};
pub use memory::MemoryTracker;
pub use metrics::MetricsRegistry;
