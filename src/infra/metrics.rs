//! Lock-free engine counters and periodic reporting
//!
//! NOTE: All atomics use Relaxed ordering. These are statistical counters
//! only; the engine never reads them to make decisions.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Counters shared between the engine and the reporter task
pub struct Metrics {
    started_at: Instant,
    locations_received: AtomicU64,
    locations_rejected: AtomicU64,
    locations_appended: AtomicU64,
    locations_unmatched: AtomicU64,
    region_events: AtomicU64,
    region_events_ignored: AtomicU64,
    commutes_started: AtomicU64,
    commutes_ended: AtomicU64,
    commutes_deleted: AtomicU64,
    store_failures: AtomicU64,
    /// Gauge: whether a commute is open right now
    commute_active: AtomicBool,
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSummary {
    pub uptime_secs: u64,
    pub locations_received: u64,
    pub locations_rejected: u64,
    pub locations_appended: u64,
    pub locations_unmatched: u64,
    pub region_events: u64,
    pub region_events_ignored: u64,
    pub commutes_started: u64,
    pub commutes_ended: u64,
    pub commutes_deleted: u64,
    pub store_failures: u64,
    pub commute_active: bool,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            locations_received: AtomicU64::new(0),
            locations_rejected: AtomicU64::new(0),
            locations_appended: AtomicU64::new(0),
            locations_unmatched: AtomicU64::new(0),
            region_events: AtomicU64::new(0),
            region_events_ignored: AtomicU64::new(0),
            commutes_started: AtomicU64::new(0),
            commutes_ended: AtomicU64::new(0),
            commutes_deleted: AtomicU64::new(0),
            store_failures: AtomicU64::new(0),
            commute_active: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn record_location_received(&self) {
        self.locations_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_location_rejected(&self) {
        self.locations_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_location_appended(&self) {
        self.locations_appended.fetch_add(1, Ordering::Relaxed);
    }

    /// Admitted sample that arrived while idle outside every window
    #[inline]
    pub fn record_location_unmatched(&self) {
        self.locations_unmatched.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_region_event(&self) {
        self.region_events.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_region_event_ignored(&self) {
        self.region_events_ignored.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_commute_started(&self) {
        self.commutes_started.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_commute_ended(&self) {
        self.commutes_ended.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_commute_deleted(&self) {
        self.commutes_deleted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn set_commute_active(&self, active: bool) {
        self.commute_active.store(active, Ordering::Relaxed);
    }

    /// Snapshot of all counters. Counters are monotonic and never reset.
    pub fn report(&self) -> MetricsSummary {
        MetricsSummary {
            uptime_secs: self.started_at.elapsed().as_secs(),
            locations_received: self.locations_received.load(Ordering::Relaxed),
            locations_rejected: self.locations_rejected.load(Ordering::Relaxed),
            locations_appended: self.locations_appended.load(Ordering::Relaxed),
            locations_unmatched: self.locations_unmatched.load(Ordering::Relaxed),
            region_events: self.region_events.load(Ordering::Relaxed),
            region_events_ignored: self.region_events_ignored.load(Ordering::Relaxed),
            commutes_started: self.commutes_started.load(Ordering::Relaxed),
            commutes_ended: self.commutes_ended.load(Ordering::Relaxed),
            commutes_deleted: self.commutes_deleted.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            commute_active: self.commute_active.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSummary {
    /// Share of received samples that the accuracy filter dropped (0-100)
    pub fn rejection_pct(&self) -> u64 {
        if self.locations_received == 0 {
            return 0;
        }
        self.locations_rejected * 100 / self.locations_received
    }

    pub fn log(&self) {
        info!(
            uptime_secs = %self.uptime_secs,
            locations_received = %self.locations_received,
            locations_rejected = %self.locations_rejected,
            rejection_pct = %self.rejection_pct(),
            locations_appended = %self.locations_appended,
            locations_unmatched = %self.locations_unmatched,
            region_events = %self.region_events,
            region_events_ignored = %self.region_events_ignored,
            commutes_started = %self.commutes_started,
            commutes_ended = %self.commutes_ended,
            commutes_deleted = %self.commutes_deleted,
            store_failures = %self.store_failures,
            commute_active = %self.commute_active,
            "metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.record_location_received();
        metrics.record_location_received();
        metrics.record_location_received();
        metrics.record_location_received();
        metrics.record_location_rejected();
        metrics.record_commute_started();
        metrics.set_commute_active(true);

        let summary = metrics.report();
        assert_eq!(summary.locations_received, 4);
        assert_eq!(summary.locations_rejected, 1);
        assert_eq!(summary.rejection_pct(), 25);
        assert_eq!(summary.commutes_started, 1);
        assert!(summary.commute_active);
    }

    #[test]
    fn test_report_does_not_reset() {
        let metrics = Metrics::new();
        metrics.record_region_event();
        assert_eq!(metrics.report().region_events, 1);
        assert_eq!(metrics.report().region_events, 1);
    }

    #[test]
    fn test_rejection_pct_empty() {
        assert_eq!(MetricsSummary::default().rejection_pct(), 0);
    }
}
