//! Infrastructure - configuration, metrics, and time
//!
//! This module contains infrastructure concerns:
//! - `config` - Application configuration (TOML loading, defaults)
//! - `metrics` - Lock-free metrics collection
//! - `clock` - Wall clock seam for manual commands

pub mod clock;
pub mod config;
pub mod metrics;

// Re-export commonly used types
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use metrics::Metrics;
