//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! Endpoints are optional here. When a section is missing nothing is
//! invented: the engine falls back to whatever the store already holds and
//! refuses to start if neither has it.

use crate::domain::endpoint::Endpoint;
use crate::domain::schedule::Schedule;
use crate::domain::types::EndpointId;
use crate::services::location_filter::DEFAULT_ACCURACY_FILTER_M;
use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path of the JSON store document
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: default_store_path() }
    }
}

fn default_store_path() -> String {
    "commutes.json".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Samples with a horizontal accuracy worse than this are dropped
    #[serde(default = "default_accuracy_m")]
    pub accuracy_m: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { accuracy_m: default_accuracy_m() }
    }
}

fn default_accuracy_m() -> f64 {
    DEFAULT_ACCURACY_FILTER_M
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_radius_m")]
    pub radius_m: f64,
    /// `[start, end)` local hours during which arriving ends a commute
    pub entry_hours: [u32; 2],
    /// `[start, end)` local hours during which leaving starts a commute
    pub exit_hours: [u32; 2],
}

fn default_radius_m() -> f64 {
    50.0
}

impl EndpointConfig {
    fn into_endpoint(self, identifier: EndpointId) -> anyhow::Result<Endpoint> {
        let entry = Schedule::try_from(self.entry_hours)
            .with_context(|| format!("Invalid entry_hours for endpoint {identifier}"))?;
        let exit = Schedule::try_from(self.exit_hours)
            .with_context(|| format!("Invalid exit_hours for endpoint {identifier}"))?;
        if self.radius_m.is_nan() || self.radius_m <= 0.0 {
            return Err(anyhow!("Endpoint {identifier} radius_m must be positive"));
        }
        Ok(Endpoint::new(identifier, (self.latitude, self.longitude), self.radius_m, entry, exit))
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EndpointsConfig {
    #[serde(default)]
    pub home: Option<EndpointConfig>,
    #[serde(default)]
    pub work: Option<EndpointConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between metrics summaries in the log (0 disables)
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    store_path: String,
    accuracy_filter_m: f64,
    home: Option<Endpoint>,
    work: Option<Endpoint>,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            accuracy_filter_m: DEFAULT_ACCURACY_FILTER_M,
            home: None,
            work: None,
            metrics_interval_secs: default_metrics_interval(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Determine config file path from an explicit argument or environment
    pub fn resolve_config_path(arg: Option<&str>) -> String {
        if let Some(path) = arg {
            return path.to_string();
        }
        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }
        "config/dev.toml".to_string()
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str, source: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content)
            .with_context(|| format!("Failed to parse config file {source}"))?;

        let accuracy_m = toml_config.filter.accuracy_m;
        if accuracy_m.is_nan() || accuracy_m <= 0.0 {
            return Err(anyhow!("filter.accuracy_m must be positive in {source}"));
        }

        let home = toml_config
            .endpoints
            .home
            .map(|c| c.into_endpoint(EndpointId::Home))
            .transpose()?;
        let work = toml_config
            .endpoints
            .work
            .map(|c| c.into_endpoint(EndpointId::Work))
            .transpose()?;

        Ok(Self {
            store_path: toml_config.store.path,
            accuracy_filter_m: toml_config.filter.accuracy_m,
            home,
            work,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            config_file: source.to_string(),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    pub fn store_path(&self) -> &str {
        &self.store_path
    }

    pub fn accuracy_filter_m(&self) -> f64 {
        self.accuracy_filter_m
    }

    pub fn endpoint(&self, identifier: EndpointId) -> Option<&Endpoint> {
        match identifier {
            EndpointId::Home => self.home.as_ref(),
            EndpointId::Work => self.work.as_ref(),
        }
    }

    /// Configured endpoints, home first
    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.home.iter().chain(self.work.iter())
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[store]
path = "data/commutes.json"

[filter]
accuracy_m = 40.0

[endpoints.home]
latitude = 45.5085
longitude = -122.6538
entry_hours = [17, 22]
exit_hours = [5, 10]

[endpoints.work]
latitude = 45.5167
longitude = -122.6792
radius_m = 80.0
entry_hours = [6, 11]
exit_hours = [16, 21]
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store_path(), "commutes.json");
        assert_eq!(config.accuracy_filter_m(), 75.0);
        assert!(config.endpoint(EndpointId::Home).is_none());
        assert!(config.endpoint(EndpointId::Work).is_none());
        assert_eq!(config.endpoints().count(), 0);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml_str(FULL, "inline").unwrap();
        assert_eq!(config.store_path(), "data/commutes.json");
        assert_eq!(config.accuracy_filter_m(), 40.0);

        let home = config.endpoint(EndpointId::Home).unwrap();
        assert_eq!(home.radius_m, 50.0);
        assert_eq!(home.exit_window, Schedule::new(5, 10).unwrap());

        let work = config.endpoint(EndpointId::Work).unwrap();
        assert_eq!(work.radius_m, 80.0);
        assert_eq!(work.entry_window, Schedule::new(6, 11).unwrap());
        assert_eq!(config.config_file(), "inline");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("", "empty").unwrap();
        assert_eq!(config.store_path(), "commutes.json");
        assert_eq!(config.accuracy_filter_m(), 75.0);
        assert_eq!(config.metrics_interval_secs(), 60);
    }

    #[test]
    fn test_wrapping_window_rejected() {
        let content = r#"
[endpoints.home]
latitude = 1.0
longitude = 1.0
entry_hours = [22, 2]
exit_hours = [5, 10]
"#;
        let err = Config::from_toml_str(content, "bad").unwrap_err();
        assert!(format!("{err:#}").contains("entry_hours"));
    }

    #[test]
    fn test_non_positive_accuracy_rejected() {
        assert!(Config::from_toml_str("[filter]\naccuracy_m = 0.0\n", "bad").is_err());
    }

    #[test]
    fn test_resolve_config_path_prefers_argument() {
        assert_eq!(Config::resolve_config_path(Some("config/laptop.toml")), "config/laptop.toml");
    }
}
