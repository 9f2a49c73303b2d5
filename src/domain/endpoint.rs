//! Commute endpoints (home and work)

use crate::domain::schedule::Schedule;
use crate::domain::types::EndpointId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Circular region handed to the geofencing provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Region {
    pub identifier: EndpointId,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
}

/// A named place a commute starts or ends at.
///
/// `entry_window` is when arriving here ends a commute; `exit_window` is when
/// leaving here starts one toward the counterpart endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub identifier: EndpointId,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
    pub entry_window: Schedule,
    pub exit_window: Schedule,
}

impl Endpoint {
    pub fn new(
        identifier: EndpointId,
        (latitude, longitude): (f64, f64),
        radius_m: f64,
        entry_window: Schedule,
        exit_window: Schedule,
    ) -> Self {
        Self { identifier, latitude, longitude, radius_m, entry_window, exit_window }
    }

    /// True if either window covers `date`
    pub fn is_active(&self, date: &DateTime<Utc>) -> bool {
        self.entry_window.contains(date) || self.exit_window.contains(date)
    }

    pub fn region(&self) -> Region {
        Region {
            identifier: self.identifier,
            latitude: self.latitude,
            longitude: self.longitude,
            radius_m: self.radius_m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn local(hour: u32) -> DateTime<Utc> {
        // Wednesday
        Local.with_ymd_and_hms(2024, 2, 7, hour, 15, 0).single().unwrap().with_timezone(&Utc)
    }

    fn home() -> Endpoint {
        Endpoint::new(
            EndpointId::Home,
            (45.5085, -122.6538),
            50.0,
            Schedule::new(17, 22).unwrap(),
            Schedule::new(5, 10).unwrap(),
        )
    }

    #[test]
    fn test_is_active_either_window() {
        let home = home();
        assert!(home.is_active(&local(6)));
        assert!(home.is_active(&local(18)));
        assert!(!home.is_active(&local(12)));
        assert!(!home.is_active(&local(23)));
    }

    #[test]
    fn test_region() {
        let region = home().region();
        assert_eq!(region.identifier, EndpointId::Home);
        assert_eq!(region.radius_m, 50.0);
        assert_eq!(region.latitude, 45.5085);
    }

    #[test]
    fn test_endpoint_json() {
        let json = serde_json::to_value(home()).unwrap();
        assert_eq!(json["identifier"], "home");
        assert_eq!(json["entry_window"], serde_json::json!([17, 22]));
        let back: Endpoint = serde_json::from_value(json).unwrap();
        assert_eq!(back, home());
    }
}
