//! Shared types for the commute log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of one of the two commute endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointId {
    Home,
    Work,
}

impl EndpointId {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointId::Home => "home",
            EndpointId::Work => "work",
        }
    }

    /// The implied destination when leaving this endpoint (and origin when arriving)
    #[inline]
    pub fn counterpart(&self) -> EndpointId {
        match self {
            EndpointId::Home => EndpointId::Work,
            EndpointId::Work => EndpointId::Home,
        }
    }
}

impl std::fmt::Display for EndpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for region identifiers that name neither endpoint
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown endpoint identifier '{0}'")]
pub struct UnknownEndpoint(pub String);

impl std::str::FromStr for EndpointId {
    type Err = UnknownEndpoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" => Ok(EndpointId::Home),
            "work" => Ok(EndpointId::Work),
            other => Err(UnknownEndpoint(other.to_string())),
        }
    }
}

/// Immutable location sample from the location subsystem
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters (lower is better)
    pub accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

impl Location {
    #[inline]
    pub fn new(latitude: f64, longitude: f64, accuracy: f64, timestamp: DateTime<Utc>) -> Self {
        Self { latitude, longitude, accuracy, timestamp }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.6}, {:.6}) ±{:.0}m @ {}",
            self.latitude,
            self.longitude,
            self.accuracy,
            self.timestamp.to_rfc3339()
        )
    }
}

/// Direction of a geofence crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossingKind {
    Enter,
    Exit,
}

impl CrossingKind {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            CrossingKind::Enter => "enter",
            CrossingKind::Exit => "exit",
        }
    }
}

/// Region crossing signal as delivered by the geofencing provider.
///
/// The endpoint is kept as the raw region identifier; unknown identifiers
/// are ignored by the engine instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionEvent {
    pub endpoint: String,
    pub kind: CrossingKind,
    pub timestamp: DateTime<Utc>,
}

impl RegionEvent {
    pub fn new(endpoint: EndpointId, kind: CrossingKind, timestamp: DateTime<Utc>) -> Self {
        Self { endpoint: endpoint.as_str().to_string(), kind, timestamp }
    }
}

/// Manual commands routed from the host application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum Command {
    Start {
        #[serde(default)]
        force: bool,
    },
    End {
        #[serde(default = "default_save")]
        save: bool,
    },
    Delete {
        id: String,
    },
}

fn default_save() -> bool {
    true
}

/// Everything the engine consumes, one at a time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EngineInput {
    Location(Location),
    Region(RegionEvent),
    Command(Command),
}

impl EngineInput {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineInput::Location(_) => "location",
            EngineInput::Region(_) => "region",
            EngineInput::Command(_) => "command",
        }
    }
}
