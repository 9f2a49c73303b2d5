//! End-to-end tests: engine over the JSON file store, including restarts

use chrono::{DateTime, Local, TimeZone, Utc};
use commute_log::domain::types::{CrossingKind, EndpointId, EngineInput, Location, RegionEvent};
use commute_log::domain::{Endpoint, Schedule, ACTIVE_KEY};
use commute_log::io::{CommuteStore, JsonFileStore};
use commute_log::services::{CommuteEngine, LocationFilter, SortOrder};
use tempfile::tempdir;
use tokio::sync::mpsc;

fn wed(hour: u32, min: u32) -> DateTime<Utc> {
    Local.with_ymd_and_hms(2024, 2, 7, hour, min, 0).single().unwrap().with_timezone(&Utc)
}

fn seeded_store(path: &std::path::Path) -> JsonFileStore {
    let store = JsonFileStore::new(path);
    store
        .save_endpoint(&Endpoint::new(
            EndpointId::Home,
            (45.5085, -122.6538),
            50.0,
            Schedule::new(15, 21).unwrap(),
            Schedule::new(6, 10).unwrap(),
        ))
        .unwrap();
    store
        .save_endpoint(&Endpoint::new(
            EndpointId::Work,
            (45.5167, -122.6792),
            80.0,
            Schedule::new(6, 11).unwrap(),
            Schedule::new(15, 19).unwrap(),
        ))
        .unwrap();
    store
}

#[test]
fn test_commute_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("commutes.json");

    {
        let mut engine =
            CommuteEngine::new(seeded_store(&path), LocationFilter::default()).unwrap();
        engine.exited_region("home", wed(8, 0)).unwrap();
        engine.process_location(Location::new(45.51, -122.66, 10.0, wed(8, 10))).unwrap();
    }

    let mut engine =
        CommuteEngine::new(JsonFileStore::new(&path), LocationFilter::default()).unwrap();
    let resumed = engine.active_commute().unwrap();
    assert_eq!(resumed.start, wed(8, 0));
    assert_eq!(resumed.locations.len(), 1);

    engine.entered_region("work", wed(8, 40)).unwrap();
    assert!(!engine.is_active());

    let store = JsonFileStore::new(&path);
    assert!(store.commute(ACTIVE_KEY).unwrap().is_none());
    let commutes = store.load_commutes().unwrap();
    assert_eq!(commutes.len(), 1);
    let finished = commutes.values().next().unwrap();
    assert_eq!(finished.end, Some(wed(8, 40)));
    assert_eq!(finished.start_point, EndpointId::Home);
}

#[test]
fn test_missing_endpoints_refuse_to_start() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("commutes.json"));
    assert!(CommuteEngine::new(store, LocationFilter::default()).is_err());
}

#[tokio::test]
async fn test_full_day_through_input_channel() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("commutes.json");
    let mut engine = CommuteEngine::new(seeded_store(&path), LocationFilter::default()).unwrap();

    let inputs = vec![
        EngineInput::Region(RegionEvent::new(EndpointId::Home, CrossingKind::Exit, wed(7, 45))),
        EngineInput::Location(Location::new(45.51, -122.66, 20.0, wed(7, 50))),
        EngineInput::Location(Location::new(45.51, -122.66, 300.0, wed(7, 55))),
        EngineInput::Region(RegionEvent::new(EndpointId::Work, CrossingKind::Enter, wed(8, 20))),
        EngineInput::Region(RegionEvent::new(EndpointId::Home, CrossingKind::Exit, wed(12, 0))),
        EngineInput::Region(RegionEvent::new(EndpointId::Work, CrossingKind::Exit, wed(17, 0))),
        EngineInput::Region(RegionEvent::new(EndpointId::Home, CrossingKind::Enter, wed(17, 35))),
    ];

    let (tx, rx) = mpsc::channel(16);
    for input in inputs {
        tx.send(input).await.unwrap();
    }
    drop(tx);
    engine.run(rx).await;

    let commutes = engine.fetch_commutes(None, SortOrder::Ascending).unwrap();
    assert_eq!(commutes.len(), 2);
    assert_eq!(commutes[0].start_point, EndpointId::Home);
    assert_eq!(commutes[0].locations.len(), 1);
    assert_eq!(commutes[1].start_point, EndpointId::Work);
    assert_eq!(commutes[1].end, Some(wed(17, 35)));

    let raw = engine.locations_for(&commutes[0]).unwrap();
    assert_eq!(raw.len(), 1);
}
