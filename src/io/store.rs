//! Commute store contract and the in-memory implementation
//!
//! The store is a keyed mapping from commute identifier to commute, with the
//! reserved `"active"` key holding the commute in progress. Endpoints are
//! stored alongside under their identifiers. Admitted location samples are
//! also kept in a flat log so they can be matched to commutes later.

use crate::domain::commute::{Commute, ACTIVE_KEY};
use crate::domain::endpoint::Endpoint;
use crate::domain::types::{EndpointId, Location};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Errors raised by store implementations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read/write store file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode/decode store document: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type CommuteMap = HashMap<String, Commute>;

/// Persistence contract the engine relies on.
///
/// Every call is synchronous and must be all-or-nothing: a failed write
/// leaves the previously stored state visible.
pub trait CommuteStore: Send + Sync {
    fn load_commutes(&self) -> Result<CommuteMap, StoreError>;

    fn save_commutes(&self, commutes: &CommuteMap) -> Result<(), StoreError>;

    fn load_endpoint(&self, identifier: EndpointId) -> Result<Option<Endpoint>, StoreError>;

    fn save_endpoint(&self, endpoint: &Endpoint) -> Result<(), StoreError>;

    fn append_location(&self, location: &Location) -> Result<(), StoreError>;

    fn load_locations(&self) -> Result<Vec<Location>, StoreError>;

    fn commute(&self, key: &str) -> Result<Option<Commute>, StoreError> {
        Ok(self.load_commutes()?.remove(key))
    }

    /// Save one commute under its store key (`"active"` while unfinished)
    fn save_commute(&self, commute: &Commute) -> Result<(), StoreError> {
        let mut commutes = self.load_commutes()?;
        commutes.insert(commute.store_key().to_string(), commute.clone());
        self.save_commutes(&commutes)
    }

    /// File a finished commute under its permanent identifier and drop the
    /// `"active"` entry in the same write
    fn finalize_commute(&self, commute: &Commute) -> Result<(), StoreError> {
        let mut commutes = self.load_commutes()?;
        commutes.remove(ACTIVE_KEY);
        commutes.insert(commute.identifier.clone(), commute.clone());
        self.save_commutes(&commutes)
    }

    /// Remove the commute stored under `key`. Returns whether one existed;
    /// nothing is written when it did not.
    fn delete_commute(&self, key: &str) -> Result<bool, StoreError> {
        let mut commutes = self.load_commutes()?;
        if commutes.remove(key).is_none() {
            return Ok(false);
        }
        self.save_commutes(&commutes)?;
        Ok(true)
    }

    /// Logged samples that fall inside the commute's time span
    fn locations_for(
        &self,
        commute: &Commute,
        now: DateTime<Utc>,
    ) -> Result<Vec<Location>, StoreError> {
        let mut locations = self.load_locations()?;
        locations.retain(|l| commute.covers(&l.timestamp, now));
        Ok(locations)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    commutes: CommuteMap,
    endpoints: HashMap<EndpointId, Endpoint>,
    locations: Vec<Location>,
}

/// In-process store. Clones share the same data, so a second engine built
/// from a clone sees what the first one wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with both endpoints
    pub fn with_endpoints(home: Endpoint, work: Endpoint) -> Self {
        let store = Self::new();
        {
            let mut state = store.inner.lock();
            state.endpoints.insert(home.identifier, home);
            state.endpoints.insert(work.identifier, work);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.inner.lock().commutes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a record directly under `key`, bypassing the engine
    pub fn insert(&self, key: &str, commute: Commute) {
        self.inner.lock().commutes.insert(key.to_string(), commute);
    }
}

impl CommuteStore for MemoryStore {
    fn load_commutes(&self) -> Result<CommuteMap, StoreError> {
        Ok(self.inner.lock().commutes.clone())
    }

    fn save_commutes(&self, commutes: &CommuteMap) -> Result<(), StoreError> {
        self.inner.lock().commutes = commutes.clone();
        Ok(())
    }

    fn load_endpoint(&self, identifier: EndpointId) -> Result<Option<Endpoint>, StoreError> {
        Ok(self.inner.lock().endpoints.get(&identifier).cloned())
    }

    fn save_endpoint(&self, endpoint: &Endpoint) -> Result<(), StoreError> {
        self.inner.lock().endpoints.insert(endpoint.identifier, endpoint.clone());
        Ok(())
    }

    fn append_location(&self, location: &Location) -> Result<(), StoreError> {
        self.inner.lock().locations.push(*location);
        Ok(())
    }

    fn load_locations(&self) -> Result<Vec<Location>, StoreError> {
        Ok(self.inner.lock().locations.clone())
    }
}
