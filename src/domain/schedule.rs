//! Weekday hour windows used to gate commute transitions

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("schedule window [{start_hour}, {end_hour}) is empty or wraps midnight")]
    Inverted { start_hour: u32, end_hour: u32 },

    #[error("schedule end hour {0} is past 24")]
    OutOfRange(u32),
}

/// Half-open hour range `[start_hour, end_hour)` that only applies on weekdays.
///
/// Windows never wrap midnight. Serialized as `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[u32; 2]", into = "[u32; 2]")]
pub struct Schedule {
    start_hour: u32,
    end_hour: u32,
}

impl Schedule {
    pub fn new(start_hour: u32, end_hour: u32) -> Result<Self, ScheduleError> {
        if end_hour > 24 {
            return Err(ScheduleError::OutOfRange(end_hour));
        }
        if start_hour >= end_hour {
            return Err(ScheduleError::Inverted { start_hour, end_hour });
        }
        Ok(Self { start_hour, end_hour })
    }

    #[inline]
    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    #[inline]
    pub fn end_hour(&self) -> u32 {
        self.end_hour
    }

    /// Whether `date`, read in the host's local time zone, is inside the window
    pub fn contains(&self, date: &DateTime<Utc>) -> bool {
        self.contains_at(&date.with_timezone(&Local))
    }

    /// Same as [`Schedule::contains`] but against the time zone `date` carries
    pub fn contains_at<Tz: TimeZone>(&self, date: &DateTime<Tz>) -> bool {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        self.contains_hour(date.hour())
    }

    #[inline]
    pub fn contains_hour(&self, hour: u32) -> bool {
        (self.start_hour..self.end_hour).contains(&hour)
    }

    /// Hours between `hour` and the closest hour inside the window, measured
    /// around the 24h clock. Zero when `hour` is inside.
    pub fn hour_distance(&self, hour: u32) -> u32 {
        if self.contains_hour(hour) {
            return 0;
        }
        let first = self.start_hour;
        let last = self.end_hour - 1;
        circular_hours(hour, first).min(circular_hours(hour, last))
    }
}

fn circular_hours(a: u32, b: u32) -> u32 {
    let diff = a.abs_diff(b) % 24;
    diff.min(24 - diff)
}

impl TryFrom<[u32; 2]> for Schedule {
    type Error = ScheduleError;

    fn try_from(hours: [u32; 2]) -> Result<Self, Self::Error> {
        Schedule::new(hours[0], hours[1])
    }
}

impl From<Schedule> for [u32; 2] {
    fn from(schedule: Schedule) -> Self {
        [schedule.start_hour, schedule.end_hour]
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:00-{:02}:00", self.start_hour, self.end_hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn at(day: u32, hour: u32) -> DateTime<FixedOffset> {
        // 2024-02-05 is a Monday
        FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2024, 2, day, hour, 30, 0).unwrap()
    }

    #[test]
    fn test_contains_weekday_hours() {
        let schedule = Schedule::new(6, 10).unwrap();
        assert!(schedule.contains_at(&at(7, 6)));
        assert!(schedule.contains_at(&at(7, 9)));
        assert!(!schedule.contains_at(&at(7, 10)));
        assert!(!schedule.contains_at(&at(7, 5)));
    }

    #[test]
    fn test_contains_rejects_weekend() {
        let schedule = Schedule::new(0, 24).unwrap();
        assert!(schedule.contains_at(&at(9, 12))); // Friday
        assert!(!schedule.contains_at(&at(10, 12))); // Saturday
        assert!(!schedule.contains_at(&at(11, 12))); // Sunday
        assert!(schedule.contains_at(&at(12, 12))); // Monday
    }

    #[test]
    fn test_contains_uses_local_time_of_offset() {
        let schedule = Schedule::new(6, 10).unwrap();
        let utc = Utc.with_ymd_and_hms(2024, 2, 7, 14, 0, 0).unwrap();
        let pacific = utc.with_timezone(&FixedOffset::west_opt(8 * 3600).unwrap());
        assert!(schedule.contains_at(&pacific));
        assert!(!schedule.contains_at(&utc));
    }

    #[test]
    fn test_rejects_wrapping_windows() {
        assert_eq!(
            Schedule::new(22, 6).unwrap_err(),
            ScheduleError::Inverted { start_hour: 22, end_hour: 6 }
        );
        assert!(Schedule::new(8, 8).is_err());
        assert_eq!(Schedule::new(20, 25).unwrap_err(), ScheduleError::OutOfRange(25));
    }

    #[test]
    fn test_hour_distance() {
        let schedule = Schedule::new(6, 10).unwrap();
        assert_eq!(schedule.hour_distance(7), 0);
        assert_eq!(schedule.hour_distance(10), 1);
        assert_eq!(schedule.hour_distance(4), 2);
        assert_eq!(schedule.hour_distance(15), 6);
        // wraps around midnight: 23 -> 6 is 7 hours
        assert_eq!(schedule.hour_distance(23), 7);
    }

    #[test]
    fn test_serde_as_pair() {
        let schedule: Schedule = serde_json::from_str("[15, 19]").unwrap();
        assert_eq!(schedule, Schedule::new(15, 19).unwrap());
        assert_eq!(serde_json::to_string(&schedule).unwrap(), "[15,19]");
        assert!(serde_json::from_str::<Schedule>("[19, 15]").is_err());
    }
}
