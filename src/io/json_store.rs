//! File-backed commute store
//!
//! Commutes and endpoints live in one JSON document rewritten on every save.
//! Writes go to a sibling temp file first and are renamed over the target, so
//! readers see either the old or the new document.
//!
//! The raw location log is a separate append-only JSONL file next to the
//! document (`commutes.json` -> `commutes.locations.jsonl`), one sample per
//! line, so logging a sample never rewrites the document.

use crate::domain::endpoint::Endpoint;
use crate::domain::types::{EndpointId, Location};
use crate::io::store::{CommuteMap, CommuteStore, StoreError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    commutes: CommuteMap,
    #[serde(default)]
    endpoints: HashMap<EndpointId, Endpoint>,
}

/// Store persisted as a single JSON file
pub struct JsonFileStore {
    path: PathBuf,
    locations_path: PathBuf,
    /// Serializes read-modify-write cycles from this process
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let locations_path = path.with_extension("locations.jsonl");
        info!(
            file_path = %path.display(),
            locations_path = %locations_path.display(),
            "json_store_initialized"
        );
        Self { path, locations_path, lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn locations_path(&self) -> &Path {
        &self.locations_path
    }

    fn ensure_parent(path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    fn read(&self) -> Result<StoreDocument, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoreDocument::default())
            }
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(StoreDocument::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write(&self, document: &StoreDocument) -> Result<(), StoreError> {
        Self::ensure_parent(&self.path)?;

        let json = serde_json::to_vec_pretty(document)?;
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        debug!(file = %self.path.display(), bytes = %json.len(), "store_written");
        Ok(())
    }

    fn update<F>(&self, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut StoreDocument),
    {
        let _guard = self.lock.lock();
        let mut document = self.read()?;
        apply(&mut document);
        self.write(&document)
    }
}

impl CommuteStore for JsonFileStore {
    fn load_commutes(&self) -> Result<CommuteMap, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.read()?.commutes)
    }

    fn save_commutes(&self, commutes: &CommuteMap) -> Result<(), StoreError> {
        self.update(|doc| doc.commutes = commutes.clone())
    }

    fn load_endpoint(&self, identifier: EndpointId) -> Result<Option<Endpoint>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.read()?.endpoints.remove(&identifier))
    }

    fn save_endpoint(&self, endpoint: &Endpoint) -> Result<(), StoreError> {
        self.update(|doc| {
            doc.endpoints.insert(endpoint.identifier, endpoint.clone());
        })
    }

    fn append_location(&self, location: &Location) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        Self::ensure_parent(&self.locations_path)?;

        let mut line = serde_json::to_vec(location)?;
        line.push(b'\n');
        let mut file =
            fs::OpenOptions::new().create(true).append(true).open(&self.locations_path)?;
        file.write_all(&line)?;
        Ok(())
    }

    fn load_locations(&self) -> Result<Vec<Location>, StoreError> {
        let _guard = self.lock.lock();
        let content = match fs::read_to_string(&self.locations_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut locations = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(location) => locations.push(location),
                // a torn final line after a crash
                Err(e) => warn!(line = %(index + 1), error = %e, "location_log_line_invalid"),
            }
        }
        Ok(locations)
    }
}
