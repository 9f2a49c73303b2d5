//! Input handlers for the CommuteEngine
//!
//! One handler per input kind. Each runs to completion before the next input
//! is taken from the channel.

use super::{CommuteEngine, Result};
use crate::domain::types::{Command, CrossingKind, EndpointId, EngineInput, Location};
use crate::io::store::CommuteStore;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

impl<S: CommuteStore> CommuteEngine<S> {
    /// Dispatch a single input
    pub fn handle(&mut self, input: EngineInput) -> Result<()> {
        match input {
            EngineInput::Location(location) => self.process_location(location),
            EngineInput::Region(event) => match event.kind {
                CrossingKind::Enter => self.entered_region(&event.endpoint, event.timestamp),
                CrossingKind::Exit => self.exited_region(&event.endpoint, event.timestamp),
            },
            EngineInput::Command(command) => self.handle_command(command),
        }
    }

    /// Handle a raw location sample
    ///
    /// Rejected samples change nothing. Admitted samples go to the raw log;
    /// while idle they may open a commute if a window covers their timestamp,
    /// then they are appended to the open commute.
    pub fn process_location(&mut self, location: Location) -> Result<()> {
        self.metrics.record_location_received();

        if !self.filter.admits(&location) {
            self.metrics.record_location_rejected();
            return Ok(());
        }

        // raw log failures are counted by persist and not propagated
        let _ = self.persist(|store| store.append_location(&location));

        if self.active.is_none() {
            match self.origin_for(&location.timestamp) {
                Some(origin) => {
                    debug!(origin = %origin, at = %location.timestamp, "commute_opened_by_location");
                    self.begin_commute(origin, location.timestamp)?;
                }
                None => {
                    self.metrics.record_location_unmatched();
                    debug!(at = %location.timestamp, "location_dropped_outside_windows");
                    return Ok(());
                }
            }
        }

        let Some(commute) = self.active.as_mut() else {
            return Ok(());
        };
        commute.add_location(location);

        // on failure the sample stays in the cached commute and is written
        // with the next successful save
        if let Err(e) = self.store.save_commute(commute) {
            self.metrics.record_store_failure();
            warn!(commute = %commute.identifier, error = %e, "location_append_not_persisted");
            return Err(e.into());
        }

        self.metrics.record_location_appended();
        if let Some(notifier) = &self.notifier {
            notifier.updated(commute);
        }
        Ok(())
    }

    /// Handle arrival at an endpoint. Ends the open commute at `at` if the
    /// endpoint's entry window covers it.
    pub fn entered_region(&mut self, endpoint: &str, at: DateTime<Utc>) -> Result<()> {
        let Some(identifier) = self.region_endpoint(endpoint) else {
            return Ok(());
        };

        if !self.endpoint(identifier).entry_window.contains(&at) {
            self.metrics.record_region_event_ignored();
            debug!(endpoint = %identifier, at = %at, "entry_ignored_outside_window");
            return Ok(());
        }
        if self.active.is_none() {
            self.metrics.record_region_event_ignored();
            debug!(endpoint = %identifier, at = %at, "entry_ignored_no_active_commute");
            return Ok(());
        }

        info!(endpoint = %identifier, at = %at, "arrived_at_endpoint");
        self.end_commute_at(true, at)?;
        Ok(())
    }

    /// Handle departure from an endpoint. Opens a commute from it if idle and
    /// the endpoint's exit window covers `at`.
    pub fn exited_region(&mut self, endpoint: &str, at: DateTime<Utc>) -> Result<()> {
        let Some(identifier) = self.region_endpoint(endpoint) else {
            return Ok(());
        };

        if let Some(active) = &self.active {
            self.metrics.record_region_event_ignored();
            debug!(
                endpoint = %identifier,
                commute = %active.identifier,
                "exit_ignored_already_active"
            );
            return Ok(());
        }
        if !self.endpoint(identifier).exit_window.contains(&at) {
            self.metrics.record_region_event_ignored();
            debug!(endpoint = %identifier, at = %at, "exit_ignored_outside_window");
            return Ok(());
        }

        info!(endpoint = %identifier, at = %at, "departed_endpoint");
        self.begin_commute(identifier, at)
    }

    /// Handle a manual command from the host application
    pub fn handle_command(&mut self, command: Command) -> Result<()> {
        debug!(command = ?command, "command_received");
        match command {
            Command::Start { force } => {
                if !self.start_commute(force)? {
                    info!(force = %force, "manual_start_declined");
                }
            }
            Command::End { save } => {
                self.end_commute(save)?;
            }
            Command::Delete { id } => {
                self.delete(&id)?;
            }
        }
        Ok(())
    }

    /// Resolve a region identifier, counting every crossing
    fn region_endpoint(&self, endpoint: &str) -> Option<EndpointId> {
        self.metrics.record_region_event();
        match endpoint.parse::<EndpointId>() {
            Ok(identifier) => Some(identifier),
            Err(e) => {
                self.metrics.record_region_event_ignored();
                debug!(error = %e, "region_event_unknown_endpoint");
                None
            }
        }
    }
}
