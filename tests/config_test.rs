//! Integration tests for configuration loading

use commute_log::domain::types::EndpointId;
use commute_log::domain::Schedule;
use commute_log::infra::Config;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[store]
path = "/var/lib/commute-log/commutes.json"

[filter]
accuracy_m = 50.0

[endpoints.home]
latitude = 45.5085
longitude = -122.6538
radius_m = 60.0
entry_hours = [15, 21]
exit_hours = [6, 10]

[endpoints.work]
latitude = 45.5167
longitude = -122.6792
entry_hours = [6, 11]
exit_hours = [15, 19]

[metrics]
interval_secs = 15
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.store_path(), "/var/lib/commute-log/commutes.json");
    assert_eq!(config.accuracy_filter_m(), 50.0);
    assert_eq!(config.metrics_interval_secs(), 15);

    let home = config.endpoint(EndpointId::Home).unwrap();
    assert_eq!(home.radius_m, 60.0);
    assert_eq!(home.entry_window, Schedule::new(15, 21).unwrap());

    let ids: Vec<_> = config.endpoints().map(|e| e.identifier).collect();
    assert_eq!(ids, vec![EndpointId::Home, EndpointId::Work]);
}

#[test]
fn test_missing_endpoint_not_invented() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(
        temp_file,
        "[endpoints.work]\nlatitude = 1.0\nlongitude = 2.0\nentry_hours = [7, 10]\nexit_hours = [16, 18]"
    )
    .unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    assert!(config.endpoint(EndpointId::Home).is_none());
    assert!(config.endpoint(EndpointId::Work).is_some());
}

#[test]
fn test_invalid_window_is_an_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(
        temp_file,
        "[endpoints.home]\nlatitude = 1.0\nlongitude = 2.0\nentry_hours = [18, 25]\nexit_hours = [6, 9]"
    )
    .unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.store_path(), "commutes.json");
    assert_eq!(config.accuracy_filter_m(), 75.0);
    assert_eq!(config.endpoints().count(), 0);
}
