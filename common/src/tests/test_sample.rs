use crate::channel::Channel;
use crate::error::TelemetryError;
use crate::position::Position;
use crate::sample::TelemetrySample;
use crate::test_helper::samples::get_raw_record;
use serde_json::json;
use std::time::Duration;

#[test]
fn validate_firmware_record() {
    let record = get_raw_record(1_000.0, 32.0, -8.05428, -34.8813);

    let sample = TelemetrySample::from_record(&record);

    assert_eq!(sample.timestamp(), Some(1_000.0));
    assert_eq!(sample.value(Channel::Speed), Some(32.0));
    assert_eq!(sample.value(Channel::EngineTemp), Some(82.5));
    assert_eq!(sample.value(Channel::CvtTemp), Some(61.0));
    assert_eq!(sample.value(Channel::StateOfCharge), Some(87.0));
    assert_eq!(sample.value(Channel::GyroZ), Some(1.2));
    assert_eq!(
        sample.position(),
        Some(Position {
            latitude: -8.05428,
            longitude: -34.8813
        })
    );
    assert_eq!(sample.value(Channel::TotalDistance), None);
}

#[test]
fn non_numeric_fields_are_absent_not_zero() {
    let sample = TelemetrySample::from_value(&json!({
        "speed": "fast",
        "rpm": null,
        "roll": true,
        "pitch": 3.5,
    }))
    .unwrap();

    assert_eq!(sample.value(Channel::Speed), None);
    assert_eq!(sample.value(Channel::Rpm), None);
    assert_eq!(sample.value(Channel::Roll), None);
    assert_eq!(sample.value(Channel::Pitch), Some(3.5));
    assert_eq!(sample.value_or_zero(Channel::Speed), 0.0);
}

#[test]
fn out_of_range_position_keeps_other_channels() {
    let sample = TelemetrySample::from_value(&json!({
        "speed": 12.0,
        "latitude": 91.0,
        "longitude": 10.0,
    }))
    .unwrap();

    assert_eq!(sample.position(), None);
    assert_eq!(sample.value(Channel::Latitude), None);
    assert_eq!(sample.value(Channel::Longitude), None);
    assert_eq!(sample.value(Channel::Speed), Some(12.0));
}

#[test]
fn half_a_position_is_no_position() {
    let sample = TelemetrySample::from_value(&json!({ "latitude": 52.0 })).unwrap();

    assert_eq!(sample.position(), None);
    assert_eq!(sample.value(Channel::Latitude), None);
}

#[test]
fn canonical_names_win_over_wire_names() {
    let sample = TelemetrySample::from_value(&json!({
        "engine_temp": 90.0,
        "temperature": 10.0,
        "vel": 22.0,
    }))
    .unwrap();

    assert_eq!(sample.value(Channel::EngineTemp), Some(90.0));
    assert_eq!(sample.value(Channel::Speed), Some(22.0));
}

#[test]
fn iso_timestamps_are_decoded() {
    let with_offset =
        TelemetrySample::from_value(&json!({ "timestamp": "1970-01-01T00:00:01.500Z" })).unwrap();
    let naive =
        TelemetrySample::from_value(&json!({ "timestamp": "1970-01-01T00:00:02.250000" })).unwrap();
    let garbage = TelemetrySample::from_value(&json!({ "timestamp": "yesterday" })).unwrap();

    assert_eq!(with_offset.timestamp(), Some(1_500.0));
    assert_eq!(naive.timestamp(), Some(2_250.0));
    assert_eq!(garbage.timestamp(), None);
}

#[test]
fn upstream_lap_fields_are_decoded() {
    let sample = TelemetrySample::from_value(&json!({
        "lap_count": 3,
        "current_lap_time": 4_200,
        "last_lap_time": 61_000,
        "best_lap_time": 0,
        "total_distance": 1_234.5,
        "lap_distance": 34.5,
    }))
    .unwrap();

    assert!(sample.has_upstream_laps());
    assert!(sample.has_upstream_distance());
    assert_eq!(sample.lap_count(), Some(3));
    assert_eq!(sample.current_lap_time(), Some(Duration::from_millis(4_200)));
    assert_eq!(sample.last_lap_time(), Some(Duration::from_secs(61)));
    assert_eq!(sample.best_lap_time(), None);
}

#[test]
fn malformed_payloads_are_rejected() {
    assert!(matches!(
        TelemetrySample::from_json("not json"),
        Err(TelemetryError::MalformedSample(_))
    ));
    assert!(matches!(
        TelemetrySample::from_json("[1, 2, 3]"),
        Err(TelemetryError::MalformedSample(_))
    ));
}

#[test]
fn serialize_uses_canonical_names() {
    let sample = TelemetrySample::default()
        .with_timestamp(10.0)
        .with_value(Channel::GyroX, 0.5)
        .with_laps(1, Duration::from_millis(1_500), Some(Duration::from_secs(60)), None);

    let json = serde_json::to_value(&sample).unwrap();

    assert_eq!(json["timestamp"], 10.0);
    assert_eq!(json["gyro_x"], 0.5);
    assert!(json["speed"].is_null());
    assert_eq!(json["lap_count"], 1);
    assert_eq!(json["current_lap_time"], 1_500.0);
    assert_eq!(json["last_lap_time"], 60_000.0);
    assert!(json["best_lap_time"].is_null());
}
