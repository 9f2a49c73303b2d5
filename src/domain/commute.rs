//! Commute data model: one journey between the two endpoints

use crate::domain::types::{EndpointId, Location};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Store key reserved for the commute that is still in progress
pub const ACTIVE_KEY: &str = "active";

/// Derive the permanent identifier of a commute
pub fn commute_identifier(from: EndpointId, to: EndpointId, start: &DateTime<Utc>) -> String {
    format!("{from} -> {to} {}", start.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// A single commute record.
///
/// `end == None` means the commute is still active. Locations are kept in
/// arrival order and only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commute {
    pub identifier: String,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    pub start_point: EndpointId,
    pub end_point: EndpointId,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub description: String,
}

impl Commute {
    /// Create a new active commute from `from` toward its counterpart.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::Utc;
    /// use commute_log::domain::commute::Commute;
    /// use commute_log::domain::types::EndpointId;
    ///
    /// let commute = Commute::new(Utc::now(), EndpointId::Home);
    /// assert_eq!(commute.end_point, EndpointId::Work);
    /// assert!(commute.is_active());
    /// ```
    pub fn new(start: DateTime<Utc>, from: EndpointId) -> Self {
        let to = from.counterpart();
        Self {
            identifier: commute_identifier(from, to, &start),
            start,
            end: None,
            start_point: from,
            end_point: to,
            locations: Vec::with_capacity(64),
            description: String::new(),
        }
    }

    /// Same as [`Commute::new`] with a caller-chosen identifier
    pub fn with_identifier(identifier: &str, start: DateTime<Utc>, from: EndpointId) -> Self {
        let mut commute = Self::new(start, from);
        commute.identifier = identifier.to_string();
        commute
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.end.is_none()
    }

    pub fn add_location(&mut self, location: Location) {
        self.locations.push(location);
    }

    /// Mark the commute as finished at `end`
    pub fn finish(&mut self, end: DateTime<Utc>) {
        self.end = Some(end);
    }

    /// Elapsed time, measured to `now` while the commute is still active
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        self.end.unwrap_or(now) - self.start
    }

    /// Key the store should file this commute under
    pub fn store_key(&self) -> &str {
        if self.is_active() {
            ACTIVE_KEY
        } else {
            &self.identifier
        }
    }

    /// Whether `ts` falls inside this commute's time span
    pub fn covers(&self, ts: &DateTime<Utc>, now: DateTime<Utc>) -> bool {
        *ts >= self.start && *ts <= self.end.unwrap_or(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 7, hour, min, 0).unwrap()
    }

    #[test]
    fn test_new_commute() {
        let commute = Commute::new(t(9, 0), EndpointId::Work);

        assert_eq!(commute.identifier, "work -> home 2024-02-07T09:00:00Z");
        assert_eq!(commute.start_point, EndpointId::Work);
        assert_eq!(commute.end_point, EndpointId::Home);
        assert!(commute.is_active());
        assert!(commute.locations.is_empty());
        assert_eq!(commute.store_key(), ACTIVE_KEY);
    }

    #[test]
    fn test_finish_rekeys() {
        let mut commute = Commute::new(t(9, 0), EndpointId::Home);
        commute.finish(t(9, 40));

        assert!(!commute.is_active());
        assert_eq!(commute.store_key(), "home -> work 2024-02-07T09:00:00Z");
        assert_eq!(commute.duration(t(23, 0)), Duration::minutes(40));
    }

    #[test]
    fn test_duration_while_active() {
        let commute = Commute::new(t(9, 0), EndpointId::Home);
        assert_eq!(commute.duration(t(9, 15)), Duration::minutes(15));
    }

    #[test]
    fn test_covers() {
        let mut commute = Commute::new(t(9, 0), EndpointId::Home);
        assert!(commute.covers(&t(9, 30), t(10, 0)));
        assert!(!commute.covers(&t(8, 59), t(10, 0)));

        commute.finish(t(9, 20));
        assert!(commute.covers(&t(9, 20), t(10, 0)));
        assert!(!commute.covers(&t(9, 30), t(10, 0)));
    }

    #[test]
    fn test_json_defaults() {
        let json = r#"{
            "identifier": "legacy",
            "start": "2024-02-07T09:00:00Z",
            "start_point": "home",
            "end_point": "work"
        }"#;
        let commute: Commute = serde_json::from_str(json).unwrap();
        assert!(commute.is_active());
        assert!(commute.locations.is_empty());
        assert!(commute.description.is_empty());
    }
}
