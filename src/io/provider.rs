//! Location provider interface
//!
//! The platform geofencing/location service lives outside this crate. The
//! engine only asks it to watch endpoint regions and to turn the continuous
//! location stream on while a commute is active and off afterwards.

use crate::domain::endpoint::Region;
use tracing::info;

pub trait LocationProvider: Send {
    /// Register (or re-register) a geofence around an endpoint
    fn monitor(&mut self, region: &Region);

    /// Begin delivering continuous location samples
    fn start_updating(&mut self);

    /// Stop delivering continuous location samples
    fn stop_updating(&mut self);
}

/// Provider that only logs what it was asked to do. Used by the replay
/// binary, where samples come from a file instead of a sensor.
#[derive(Debug, Default)]
pub struct LoggingProvider {
    updating: bool,
}

impl LoggingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_updating(&self) -> bool {
        self.updating
    }
}

impl LocationProvider for LoggingProvider {
    fn monitor(&mut self, region: &Region) {
        info!(
            endpoint = %region.identifier,
            latitude = %region.latitude,
            longitude = %region.longitude,
            radius_m = %region.radius_m,
            "region_monitored"
        );
    }

    fn start_updating(&mut self) {
        if !self.updating {
            info!("location_updates_started");
        }
        self.updating = true;
    }

    fn stop_updating(&mut self) {
        if self.updating {
            info!("location_updates_stopped");
        }
        self.updating = false;
    }
}

/// Calls observed by a [`RecordingProvider`]
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderCall {
    Monitor(crate::domain::types::EndpointId),
    StartUpdating,
    StopUpdating,
}

/// Provider that records every call; clones share the log
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct RecordingProvider {
    calls: std::sync::Arc<parking_lot::Mutex<Vec<ProviderCall>>>,
}

#[cfg(test)]
impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().clone()
    }
}

#[cfg(test)]
impl LocationProvider for RecordingProvider {
    fn monitor(&mut self, region: &Region) {
        self.calls.lock().push(ProviderCall::Monitor(region.identifier));
    }

    fn start_updating(&mut self) {
        self.calls.lock().push(ProviderCall::StartUpdating);
    }

    fn stop_updating(&mut self) {
        self.calls.lock().push(ProviderCall::StopUpdating);
    }
}
