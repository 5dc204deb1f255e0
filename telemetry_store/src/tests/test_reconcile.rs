use crate::{
    MAX_POINTS,
    reconcile::{lap_session_from, parse_snapshot, reconcile},
    store::RollingTelemetryStore,
};
use common::{
    channel::Channel, error::TelemetryError, position::Position, sample::TelemetrySample,
    test_helper::samples::get_speed_sample,
};
use serde_json::{Value, json};
use std::time::Duration;

fn snapshot(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            json!({
                "timestamp": i as f64 * 100.0,
                "speed": i as f64,
                "latitude": 48.0 + i as f64 * 1e-5,
                "longitude": 11.0,
            })
        })
        .collect()
}

#[test]
fn replaces_with_newest_entries() {
    let mut store = RollingTelemetryStore::new();
    store.append(&get_speed_sample(999_999.0, 99.0));

    let baseline = reconcile(&mut store, &snapshot(520)).unwrap().unwrap();

    let expected: Vec<f64> = (220..520).map(|i| i as f64).collect();
    assert_eq!(store.len(), MAX_POINTS);
    assert_eq!(store.channel(Channel::Speed).to_vec(), expected);
    assert_eq!(store.path().len(), 500);
    assert_eq!(baseline.last.value(Channel::Speed), Some(519.0));
}

#[test]
fn missing_fields_are_zero_filled() {
    let mut store = RollingTelemetryStore::new();
    let entries = vec![
        json!({"timestamp": 0, "speed": 10}),
        json!({"timestamp": 100, "rpm": "fast"}),
    ];

    reconcile(&mut store, &entries).unwrap();

    assert_eq!(store.channel(Channel::Speed).to_vec(), vec![10.0, 0.0]);
    assert_eq!(store.channel(Channel::Rpm).to_vec(), vec![0.0, 0.0]);
}

#[test]
fn path_skips_placeholder_fixes() {
    let mut store = RollingTelemetryStore::new();
    let entries = vec![
        json!({"timestamp": 0, "latitude": 0.0, "longitude": 0.0}),
        json!({"timestamp": 100, "latitude": 48.0, "longitude": 11.0}),
        json!({"timestamp": 200}),
        json!({"timestamp": 300, "latitude": 0.0, "longitude": -34.88}),
        json!({"timestamp": 400, "latitude": -8.05, "longitude": 0.0}),
    ];

    reconcile(&mut store, &entries).unwrap();

    assert_eq!(store.len(), 5);
    assert_eq!(
        store.path().to_vec(),
        vec![Position {
            latitude: 48.0,
            longitude: 11.0
        }]
    );
}

#[test]
fn malformed_snapshot_leaves_store_empty() {
    let mut store = RollingTelemetryStore::new();
    store.append(&get_speed_sample(0.0, 1.0));
    let entries = vec![json!({"timestamp": 0, "speed": 10}), json!("garbage")];

    let result = reconcile(&mut store, &entries);

    assert!(matches!(
        result,
        Err(TelemetryError::SnapshotReplay { index: 1, .. })
    ));
    assert!(store.is_empty());
    assert!(store.path().is_empty());
}

#[test]
fn empty_snapshot_clears_store() {
    let mut store = RollingTelemetryStore::new();
    store.append(&get_speed_sample(0.0, 1.0));

    let baseline = reconcile(&mut store, &[]).unwrap();

    assert!(baseline.is_none());
    assert!(store.is_empty());
}

#[test]
fn parse_snapshot_validates_every_entry() {
    let samples = parse_snapshot(&snapshot(3)).unwrap();
    assert_eq!(samples.len(), 3);

    let err = parse_snapshot(&[json!([1, 2])]).unwrap_err();
    assert!(matches!(err, TelemetryError::SnapshotReplay { index: 0, .. }));
}

#[test]
fn lap_session_continues_running_lap() {
    let sample = TelemetrySample::default().with_timestamp(100_000.0).with_laps(
        3,
        Duration::from_secs(20),
        Some(Duration::from_secs(62)),
        Some(Duration::from_secs(58)),
    );

    let session = lap_session_from(&sample);

    assert_eq!(session.lap_count, 3);
    assert_eq!(session.current_lap_start, Some(80_000.0));
    assert_eq!(session.last_lap_time, Some(Duration::from_secs(62)));
    assert_eq!(session.best_lap_time, Some(Duration::from_secs(58)));
}
