//! Commute detection state machine
//!
//! The engine is the single owner of the "active commute" slot. It consumes
//! location samples, geofence crossings and manual commands one at a time:
//! - Idle: no commute open. Exits during an exit window, or admitted samples
//!   inside a commute window, open one.
//! - Active: one commute stored under the reserved `"active"` key. Samples
//!   are appended; an entry during the entry window closes it.
//!
//! Lifecycle changes are published on the notification channel and the
//! location provider is switched on and off with the active slot.

mod handlers;

use crate::domain::commute::{Commute, ACTIVE_KEY};
use crate::domain::endpoint::Endpoint;
use crate::domain::schedule::Schedule;
use crate::domain::types::{EndpointId, EngineInput, Location};
use crate::infra::clock::{Clock, SystemClock};
use crate::infra::metrics::Metrics;
use crate::io::notifier::CommuteNotifier;
use crate::io::provider::LocationProvider;
use crate::io::store::{CommuteStore, StoreError};
use crate::services::location_filter::LocationFilter;
use chrono::{DateTime, Local, Timelike, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("no endpoint configured for '{0}'")]
    MissingEndpoint(EndpointId),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Ordering for [`CommuteEngine::fetch_commutes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    /// Most recent first
    #[default]
    Descending,
}

/// Commute detection engine over a store `S`
pub struct CommuteEngine<S: CommuteStore> {
    pub(crate) store: S,
    pub(crate) home: Endpoint,
    pub(crate) work: Endpoint,
    pub(crate) filter: LocationFilter,
    /// Cached copy of the open commute, if any
    pub(crate) active: Option<Commute>,
    pub(crate) notifier: Option<CommuteNotifier>,
    pub(crate) provider: Option<Box<dyn LocationProvider>>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) metrics: Arc<Metrics>,
}

impl<S: CommuteStore> CommuteEngine<S> {
    /// Build an engine over `store`.
    ///
    /// Both endpoints must already be in the store. An unfinished commute
    /// found there is resumed.
    pub fn new(store: S, filter: LocationFilter) -> Result<Self> {
        let home = store
            .load_endpoint(EndpointId::Home)?
            .ok_or(EngineError::MissingEndpoint(EndpointId::Home))?;
        let work = store
            .load_endpoint(EndpointId::Work)?
            .ok_or(EngineError::MissingEndpoint(EndpointId::Work))?;

        let mut engine = Self {
            store,
            home,
            work,
            filter,
            active: None,
            notifier: None,
            provider: None,
            clock: Arc::new(SystemClock),
            metrics: Arc::new(Metrics::new()),
        };
        engine.refresh_active()?;

        info!(
            home_entry = %engine.home.entry_window,
            home_exit = %engine.home.exit_window,
            work_entry = %engine.work.entry_window,
            work_exit = %engine.work.exit_window,
            accuracy_filter_m = %engine.filter.accuracy_filter_m(),
            resumed = ?engine.active.as_ref().map(|c| c.identifier.as_str()),
            "commute_engine_initialized"
        );
        Ok(engine)
    }

    pub fn with_notifier(mut self, notifier: CommuteNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_provider(mut self, provider: Box<dyn LocationProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self.metrics.set_commute_active(self.active.is_some());
        self
    }

    /// Consume inputs until the channel closes
    pub async fn run(&mut self, mut input_rx: mpsc::Receiver<EngineInput>) {
        while let Some(input) = input_rx.recv().await {
            let kind = input.as_str();
            if let Err(e) = self.handle(input) {
                error!(input = %kind, error = %e, "engine_input_failed");
            }
        }
        debug!("engine_input_channel_closed");
    }

    /// Register both endpoint regions with the provider and resume location
    /// updates if a commute was recovered from the store
    pub fn begin_monitoring(&mut self) {
        let regions = [self.home.region(), self.work.region()];
        let active = self.active.is_some();
        if let Some(provider) = self.provider.as_mut() {
            for region in &regions {
                provider.monitor(region);
            }
            if active {
                provider.start_updating();
            }
        }
    }

    /// Persist a reconfigured endpoint and re-register its region
    pub fn update_endpoint(&mut self, endpoint: Endpoint) -> Result<()> {
        self.persist(|store| store.save_endpoint(&endpoint))?;
        if let Some(provider) = self.provider.as_mut() {
            provider.monitor(&endpoint.region());
        }
        info!(endpoint = %endpoint.identifier, "endpoint_updated");
        match endpoint.identifier {
            EndpointId::Home => self.home = endpoint,
            EndpointId::Work => self.work = endpoint,
        }
        Ok(())
    }

    pub fn active_commute(&self) -> Option<&Commute> {
        self.active.as_ref()
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn endpoint(&self, identifier: EndpointId) -> &Endpoint {
        match identifier {
            EndpointId::Home => &self.home,
            EndpointId::Work => &self.work,
        }
    }

    pub fn home(&self) -> &Endpoint {
        &self.home
    }

    pub fn work(&self) -> &Endpoint {
        &self.work
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Manual start.
    ///
    /// The origin comes from whichever commute window is open now. With no
    /// window open, `force` picks the endpoint whose exit window is closest
    /// by time of day (ties go to home); without `force` nothing happens.
    /// A forced start while active ends and saves the current commute first.
    /// Returns whether a commute was started.
    pub fn start_commute(&mut self, force: bool) -> Result<bool> {
        let now = self.clock.now();

        if self.active.is_some() && !force {
            debug!("manual_start_ignored_already_active");
            return Ok(false);
        }

        let origin = match (self.manual_origin(&now), force) {
            (Some(origin), _) => origin,
            (None, true) => self.closest_origin(now.with_timezone(&Local).hour()),
            (None, false) => {
                debug!(now = %now, "manual_start_ignored_outside_windows");
                return Ok(false);
            }
        };

        self.start_commute_from(origin, now)?;
        Ok(true)
    }

    /// Start a commute from `origin` at `at`, ending (and saving) any open one
    pub fn start_commute_from(&mut self, origin: EndpointId, at: DateTime<Utc>) -> Result<()> {
        if self.active.is_some() {
            info!("commute_restart");
            self.end_commute_at(true, at)?;
        }
        self.begin_commute(origin, at)
    }

    /// End the open commute now. See [`CommuteEngine::end_commute_at`].
    pub fn end_commute(&mut self, save: bool) -> Result<Option<Commute>> {
        let now = self.clock.now();
        self.end_commute_at(save, now)
    }

    /// Close the open commute with `end = at`.
    ///
    /// With `save` the record is filed under its permanent identifier. Without
    /// it the in-progress record is dropped from the store and the finished
    /// commute only reaches observers. Observers get the ended notification
    /// either way. No-op when idle.
    pub fn end_commute_at(&mut self, save: bool, at: DateTime<Utc>) -> Result<Option<Commute>> {
        let Some(current) = self.active.as_ref() else {
            debug!("end_ignored_no_active_commute");
            return Ok(None);
        };

        let mut finished = current.clone();
        finished.finish(at);

        if save {
            self.persist(|store| store.finalize_commute(&finished))?;
        } else {
            self.persist(|store| {
                store.delete_commute(ACTIVE_KEY)?;
                // a commute resumed from its own key is unfinished there as well
                if store.commute(&finished.identifier)?.is_some_and(|c| c.is_active()) {
                    store.delete_commute(&finished.identifier)?;
                }
                Ok(())
            })?;
        }

        info!(
            commute = %finished.identifier,
            saved = %save,
            locations = %finished.locations.len(),
            duration_secs = %finished.duration(at).num_seconds(),
            "commute_ended"
        );

        self.active = None;
        self.metrics.record_commute_ended();
        if let Some(notifier) = &self.notifier {
            notifier.ended(&finished);
        }
        self.refresh_active()?;
        self.sync_updating();
        Ok(Some(finished))
    }

    /// Delete a commute by identifier. The open commute can be addressed by
    /// its identifier or by `"active"`; deleting it returns the engine to
    /// idle without an ended notification.
    pub fn delete(&mut self, identifier: &str) -> Result<bool> {
        let targets_active = identifier == ACTIVE_KEY
            || self.active.as_ref().is_some_and(|c| c.identifier == identifier);

        let removed = if targets_active {
            let active_id = self.active.as_ref().map(|c| c.identifier.clone());
            let mut removed = self.persist(|store| store.delete_commute(ACTIVE_KEY))?;
            // a resumed commute may still sit under its own identifier too
            if let Some(id) = active_id.filter(|id| id != ACTIVE_KEY) {
                removed |= self.persist(|store| store.delete_commute(&id))?;
            }
            self.active = None;
            self.refresh_active()?;
            self.sync_updating();
            removed
        } else {
            self.persist(|store| store.delete_commute(identifier))?
        };

        if removed {
            self.metrics.record_commute_deleted();
            info!(commute = %identifier, active = %targets_active, "commute_deleted");
        } else {
            debug!(commute = %identifier, "delete_ignored_not_found");
        }
        Ok(removed)
    }

    /// Stored commutes, optionally limited to those starting inside
    /// `schedule`, sorted by start time
    pub fn fetch_commutes(
        &self,
        schedule: Option<&Schedule>,
        order: SortOrder,
    ) -> Result<Vec<Commute>> {
        let mut commutes: Vec<Commute> = self
            .store
            .load_commutes()?
            .into_values()
            .filter(|c| schedule.map_or(true, |s| s.contains(&c.start)))
            .collect();

        commutes.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.identifier.cmp(&b.identifier)));
        if order == SortOrder::Descending {
            commutes.reverse();
        }
        Ok(commutes)
    }

    /// Samples from the raw location log that fall inside `commute`
    pub fn locations_for(&self, commute: &Commute) -> Result<Vec<Location>> {
        Ok(self.store.locations_for(commute, self.clock.now())?)
    }

    /// Open a new commute. Caller guarantees the engine is idle.
    pub(crate) fn begin_commute(&mut self, origin: EndpointId, at: DateTime<Utc>) -> Result<()> {
        debug_assert!(self.active.is_none());
        let mut commute = Commute::new(at, origin);
        commute.identifier = self.unused_identifier(&commute.identifier)?;

        self.persist(|store| store.save_commute(&commute))?;

        info!(
            commute = %commute.identifier,
            from = %commute.start_point,
            to = %commute.end_point,
            "commute_started"
        );

        self.metrics.record_commute_started();
        if let Some(notifier) = &self.notifier {
            notifier.started(&commute);
        }
        self.active = Some(commute);
        self.sync_updating();
        Ok(())
    }

    /// `base`, or `base #n` for the first `n` not already used as a store key.
    /// Identifiers carry whole seconds only, so starts within one second
    /// collide without the suffix.
    fn unused_identifier(&self, base: &str) -> Result<String> {
        let commutes = self.persist(|store| store.load_commutes())?;
        let taken = |id: &str| {
            commutes.contains_key(id) || commutes.values().any(|c| c.identifier == id)
        };
        if !taken(base) {
            return Ok(base.to_string());
        }
        let identifier = (2..)
            .map(|n| format!("{base} #{n}"))
            .find(|id| !taken(id))
            .unwrap_or_else(|| base.to_string());
        debug!(identifier = %identifier, "commute_identifier_deduplicated");
        Ok(identifier)
    }

    /// Origin for a manual start: an open exit window names it directly,
    /// otherwise an open entry window names its counterpart
    pub(crate) fn manual_origin(&self, at: &DateTime<Utc>) -> Option<EndpointId> {
        let endpoints = [&self.home, &self.work];
        endpoints
            .iter()
            .find(|e| e.exit_window.contains(at))
            .map(|e| e.identifier)
            .or_else(|| {
                endpoints
                    .iter()
                    .find(|e| e.entry_window.contains(at))
                    .map(|e| e.identifier.counterpart())
            })
    }

    /// Origin implied by a sample taken at `at` while idle
    pub(crate) fn origin_for(&self, at: &DateTime<Utc>) -> Option<EndpointId> {
        if self.home.exit_window.contains(at) || self.work.entry_window.contains(at) {
            Some(EndpointId::Home)
        } else if self.work.exit_window.contains(at) || self.home.entry_window.contains(at) {
            Some(EndpointId::Work)
        } else {
            None
        }
    }

    /// Origin whose exit window is nearest to `hour`; ties go to home
    pub(crate) fn closest_origin(&self, hour: u32) -> EndpointId {
        let home = self.home.exit_window.hour_distance(hour);
        let work = self.work.exit_window.hour_distance(hour);
        if work < home {
            EndpointId::Work
        } else {
            EndpointId::Home
        }
    }

    /// Re-read the open commute from the store: the `"active"` entry first,
    /// otherwise the most recently started record without an end
    pub(crate) fn refresh_active(&mut self) -> Result<()> {
        let mut commutes = self.store.load_commutes()?;
        self.active = match commutes.remove(ACTIVE_KEY) {
            Some(active) => Some(active),
            None => commutes.into_values().filter(Commute::is_active).max_by_key(|c| c.start),
        };
        self.metrics.set_commute_active(self.active.is_some());
        Ok(())
    }

    /// Run a store operation, counting and logging failures
    pub(crate) fn persist<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&S) -> std::result::Result<T, StoreError>,
    {
        op(&self.store).map_err(|e| {
            self.metrics.record_store_failure();
            warn!(error = %e, "store_operation_failed");
            EngineError::Store(e)
        })
    }

    /// Keep the provider's continuous updates in line with the active slot
    fn sync_updating(&mut self) {
        let active = self.active.is_some();
        self.metrics.set_commute_active(active);
        if let Some(provider) = self.provider.as_mut() {
            if active {
                provider.start_updating();
            } else {
                provider.stop_updating();
            }
        }
    }
}
