use algorithm::LapDetectorConfig;
use common::{
    channel::Channel,
    lap::ArmStartFinish,
    position::Position,
    sample::{RawRecord, TelemetrySample},
    test_helper::samples::{get_fix, get_raw_record, get_speed_sample},
};
use live_session::TelemetrySession;
use serde_json::{Value, json};
use std::time::Duration;
use telemetry_store::MAX_POINTS;

fn record(value: Value) -> RawRecord {
    match value {
        Value::Object(record) => record,
        _ => panic!("record must be an object"),
    }
}

fn pos(latitude: f64, longitude: f64) -> Position {
    Position {
        latitude,
        longitude,
    }
}

#[test_log::test]
fn lap_completes_at_start_finish() {
    let mut session = TelemetrySession::new(LapDetectorConfig::default());

    session.admit(get_fix(0.0, 0.0, 0.0), 0.0);
    let line = session
        .arm(&ArmStartFinish::at(pos(0.0, 0.0), Some(10.0)), 0.0)
        .unwrap();
    let far = session.admit(get_fix(5000.0, 0.0001, 0.0), 0.0);
    let back = session.admit(get_fix(15_000.0, 0.0, 0.00005), 0.0);

    assert_eq!(line.radius_m, 10.0);
    assert!(far.lap.is_none());
    let lap = back.lap.unwrap();
    assert_eq!(lap.lap_number, 1);
    assert_eq!(lap.lap_time, Duration::from_secs(15));
    assert!(lap.best);
    assert_eq!(back.sample.lap_count(), Some(1));
    assert_eq!(back.sample.last_lap_time(), Some(Duration::from_secs(15)));
    assert_eq!(back.sample.current_lap_time(), Some(Duration::ZERO));
    assert_eq!(back.sample.value(Channel::LapDistance), Some(0.0));
    assert!(back.sample.value(Channel::TotalDistance).unwrap() > 20.0);
}

#[test_log::test]
fn arm_uses_latest_fix() {
    let mut session = TelemetrySession::new(LapDetectorConfig::default());

    assert!(session.arm(&ArmStartFinish::at_vehicle(), 0.0).is_none());
    session.admit(get_fix(0.0, 52.0, 11.0), 0.0);
    session.admit(get_speed_sample(100.0, 20.0), 0.0);
    let line = session.arm(&ArmStartFinish::at_vehicle(), 0.0).unwrap();

    assert_eq!(line.position, pos(52.0, 11.0));
    assert_eq!(line.radius_m, 10.0);
    assert_eq!(session.detector().current_lap_time(100.0), Duration::ZERO);
}

#[test_log::test]
fn derived_fields_are_added() {
    let mut session = TelemetrySession::new(LapDetectorConfig::default());

    session.on_record(&get_raw_record(0.0, 10.0, 52.0, 11.0), 0.0);
    let admitted = session.on_record(&get_raw_record(1000.0, 10.0, 52.0001, 11.0), 0.0);

    let total = admitted.sample.value(Channel::TotalDistance).unwrap();
    assert!((total - 11.12).abs() < 0.01, "total distance {total}");
    assert_eq!(admitted.sample.value(Channel::LapDistance), Some(total));
    assert_eq!(admitted.sample.lap_count(), Some(0));
    assert_eq!(admitted.sample.current_lap_time(), Some(Duration::from_secs(1)));
    assert_eq!(admitted.sample.value(Channel::EngineTemp), Some(82.5));
}

#[test_log::test]
fn missing_timestamp_uses_clock() {
    let mut session = TelemetrySession::new(LapDetectorConfig::default());

    let admitted = session.on_record(&record(json!({"speed": 12})), 4242.0);

    assert_eq!(admitted.sample.timestamp(), Some(4242.0));
    assert_eq!(session.store().timestamps().to_vec(), vec![4242.0]);
}

#[test_log::test]
fn invalid_position_keeps_other_channels() {
    let mut session = TelemetrySession::new(LapDetectorConfig::default());

    session.admit(get_fix(0.0, 52.0, 11.0), 0.0);
    let admitted = session.on_record(
        &record(json!({"timestamp": 100, "speed": 33, "latitude": 123.0, "longitude": 11.0})),
        0.0,
    );

    assert_eq!(admitted.sample.value(Channel::Speed), Some(33.0));
    assert_eq!(admitted.sample.position(), None);
    assert_eq!(session.accumulator().total_distance(), 0.0);
    assert_eq!(session.store().path().len(), 1);
    assert_eq!(session.store().len(), 2);
}

#[test_log::test]
fn upstream_lap_fields_are_authoritative() {
    let mut session = TelemetrySession::new(LapDetectorConfig::default());
    session
        .arm(&ArmStartFinish::at(pos(52.0, 11.0), None), 0.0)
        .unwrap();

    session.on_record(
        &record(json!({
            "timestamp": 100_000, "latitude": 52.0, "longitude": 11.0,
            "lap_count": 2, "current_lap_time": 30_000,
            "last_lap_time": 61_000, "best_lap_time": 59_000,
            "total_distance": 2500.0, "lap_distance": 400.0
        })),
        0.0,
    );
    let admitted = session.on_record(
        &record(json!({
            "timestamp": 131_000, "latitude": 52.0, "longitude": 11.0,
            "lap_count": 3, "current_lap_time": 0,
            "last_lap_time": 61_000, "best_lap_time": 59_000,
            "total_distance": 3500.0, "lap_distance": 0.0
        })),
        0.0,
    );

    let lap = admitted.lap.unwrap();
    assert_eq!(lap.lap_number, 3);
    assert_eq!(lap.lap_time, Duration::from_secs(61));
    assert!(!lap.best);
    assert_eq!(session.detector().session().lap_count, 3);
    assert_eq!(session.accumulator().total_distance(), 3500.0);
    assert_eq!(admitted.sample.best_lap_time(), Some(Duration::from_secs(59)));
}

#[test_log::test]
fn upstream_lap_count_resets_lap_distance() {
    let mut session = TelemetrySession::new(LapDetectorConfig::default());

    session.on_record(
        &record(json!({"timestamp": 0, "latitude": 0.0, "longitude": 0.0, "lap_count": 0})),
        0.0,
    );
    session.on_record(
        &record(json!({"timestamp": 20_000, "latitude": 0.001, "longitude": 0.0, "lap_count": 0})),
        0.0,
    );
    let completed = session.on_record(
        &record(json!({
            "timestamp": 40_000, "latitude": 0.0, "longitude": 0.0,
            "lap_count": 1, "last_lap_time": 40_000
        })),
        0.0,
    );
    let next = session.on_record(
        &record(json!({"timestamp": 60_000, "latitude": 0.001, "longitude": 0.0, "lap_count": 1})),
        0.0,
    );

    assert_eq!(completed.lap.map(|lap| lap.lap_number), Some(1));
    assert_eq!(completed.sample.value(Channel::LapDistance), Some(0.0));
    let total = completed.sample.value(Channel::TotalDistance).unwrap();
    assert!((total - 222.39).abs() < 0.01, "total distance {total}");
    let lap_distance = next.sample.value(Channel::LapDistance).unwrap();
    assert!((lap_distance - 111.19).abs() < 0.01, "lap distance {lap_distance}");
}

#[test_log::test]
fn arm_rejects_invalid_radius() {
    let mut session = TelemetrySession::new(LapDetectorConfig::default());
    session.admit(get_fix(0.0, 52.0, 11.0), 0.0);

    for radius in [-5.0, 0.0, f64::NAN, f64::INFINITY] {
        assert!(
            session
                .arm(&ArmStartFinish::at(pos(52.0, 11.0), Some(radius)), 0.0)
                .is_none()
        );
        assert!(
            session
                .arm(&ArmStartFinish { position: None, radius_m: Some(radius) }, 0.0)
                .is_none()
        );
    }
    assert!(session.detector().start_finish().is_none());

    let line = session
        .arm(&ArmStartFinish::at(pos(52.0, 11.0), Some(25.0)), 0.0)
        .unwrap();
    assert_eq!(line.radius_m, 25.0);
}

#[test_log::test]
fn history_seeds_store_and_laps() {
    let mut session = TelemetrySession::new(LapDetectorConfig::default());
    session.admit(get_speed_sample(0.0, 99.0), 0.0);
    let snapshot: Vec<Value> = (0..520)
        .map(|i| {
            json!({
                "timestamp": 1000.0 + i as f64 * 100.0,
                "speed": i,
                "latitude": 52.0,
                "longitude": 11.0 + i as f64 * 1e-6,
                "total_distance": i as f64,
                "lap_distance": 5.0,
                "lap_count": 4,
                "current_lap_time": 2000,
                "last_lap_time": 60_000,
                "best_lap_time": 58_000
            })
        })
        .collect();

    let baseline = session.on_history(&snapshot).unwrap().unwrap();

    assert_eq!(baseline.lap_session.lap_count, 4);
    assert_eq!(session.store().len(), MAX_POINTS);
    assert_eq!(session.store().channel(Channel::Speed).get(0), Some(&220.0));
    assert_eq!(session.history().len(), 500);
    assert_eq!(session.detector().session().lap_count, 4);
    assert_eq!(session.accumulator().total_distance(), 519.0);

    let admitted = session.admit(get_speed_sample(53_000.0, 1.0), 0.0);
    assert_eq!(admitted.sample.lap_count(), Some(4));
    assert_eq!(admitted.sample.current_lap_time(), Some(Duration::from_millis(2100)));
    assert_eq!(session.store().len(), MAX_POINTS);
}

#[test_log::test]
fn corrupt_history_leaves_session_empty() {
    let mut session = TelemetrySession::new(LapDetectorConfig::default());
    session.admit(get_fix(0.0, 52.0, 11.0), 0.0);

    let result = session.on_history(&[json!({"speed": 1}), json!(42)]);

    assert!(result.is_err());
    assert!(session.store().is_empty());
    assert!(session.history().is_empty());
    assert!(session.latest().is_none());
}

#[test_log::test]
fn disconnect_clears_live_state_but_keeps_line() {
    let mut session = TelemetrySession::new(LapDetectorConfig::default());
    session.on_connected();
    session.admit(get_fix(0.0, 52.0, 11.0), 0.0);
    session.arm(&ArmStartFinish::at_vehicle(), 0.0).unwrap();

    session.on_disconnected();

    assert!(!session.is_connected());
    assert!(session.store().is_empty());
    assert!(session.store().path().is_empty());
    assert_eq!(session.detector().session().lap_count, 0);
    assert!(session.detector().start_finish().is_some());

    session.clear_start_finish();
    assert!(session.detector().start_finish().is_none());
}

#[test_log::test]
fn snapshot_reports_read_model() {
    let mut session = TelemetrySession::new(LapDetectorConfig::default());
    session.on_connected();
    session.admit(get_fix(1000.0, 52.0, 11.0), 0.0);
    session.admit(
        TelemetrySample::default()
            .with_timestamp(4000.0)
            .with_value(Channel::Speed, 30.0),
        0.0,
    );

    let snapshot = session.snapshot(999_999.0);

    assert!(snapshot.connected);
    assert_eq!(snapshot.current_lap_time, Duration::from_secs(3));
    assert_eq!(snapshot.store.len(), 2);
    assert_eq!(
        snapshot.latest.as_ref().and_then(|s| s.value(Channel::Speed)),
        Some(30.0)
    );
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["current_lap_time"], json!(3000.0));
    assert_eq!(json["best_lap_time"], Value::Null);
}
