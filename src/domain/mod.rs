//! Domain models - core commute types
//!
//! This module contains the canonical data types used throughout the system:
//! - `Commute` - one journey between home and work
//! - `Endpoint` - a named place with its entry/exit windows
//! - `Schedule` - weekday hour window predicate
//! - `Location`, `RegionEvent`, `EngineInput` - inputs from the location subsystem

pub mod commute;
pub mod endpoint;
pub mod schedule;
pub mod types;

pub use commute::{Commute, ACTIVE_KEY};
pub use endpoint::{Endpoint, Region};
pub use schedule::{Schedule, ScheduleError};
pub use types::{Command, CrossingKind, EndpointId, EngineInput, Location, RegionEvent};
