//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `store` - Persistence contract and the in-memory store
//! - `json_store` - Single-document JSON file store
//! - `notifier` - Typed channel for commute lifecycle notifications
//! - `provider` - Geofencing and location update provider seam
//! - `replay` - JSONL event file replay into the engine

pub mod json_store;
pub mod notifier;
pub mod provider;
pub mod replay;
pub mod store;

// Re-export commonly used types
pub use json_store::JsonFileStore;
pub use notifier::{create_notification_channel, CommuteEvent, CommuteNotifier};
pub use provider::{LocationProvider, LoggingProvider};
pub use replay::{replay_file, replay_reader};
pub use store::{CommuteMap, CommuteStore, MemoryStore, StoreError};
