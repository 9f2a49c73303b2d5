//! Accuracy-based admission control for raw location samples

use crate::domain::types::Location;
use tracing::trace;

/// Default admission threshold in meters
pub const DEFAULT_ACCURACY_FILTER_M: f64 = 75.0;

/// Drops samples whose horizontal accuracy is worse than the threshold.
/// A sample exactly at the threshold is admitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFilter {
    accuracy_filter_m: f64,
}

impl LocationFilter {
    pub fn new(accuracy_filter_m: f64) -> Self {
        Self { accuracy_filter_m }
    }

    #[inline]
    pub fn accuracy_filter_m(&self) -> f64 {
        self.accuracy_filter_m
    }

    pub fn admits(&self, location: &Location) -> bool {
        // NaN accuracy compares false and is rejected
        let admitted = location.accuracy <= self.accuracy_filter_m;
        if !admitted {
            trace!(
                accuracy = %location.accuracy,
                limit = %self.accuracy_filter_m,
                "location_rejected_accuracy"
            );
        }
        admitted
    }
}

impl Default for LocationFilter {
    fn default() -> Self {
        Self::new(DEFAULT_ACCURACY_FILTER_M)
    }
}
