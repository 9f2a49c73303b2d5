//! Services - business logic and state management
//!
//! This module contains the core business logic services:
//! - `commute_engine` - Commute detection state machine
//! - `location_filter` - Accuracy admission control for raw samples

pub mod commute_engine;
pub mod location_filter;

// Re-export commonly used types
pub use commute_engine::{CommuteEngine, EngineError, SortOrder};
pub use location_filter::LocationFilter;
