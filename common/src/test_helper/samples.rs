// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{
    channel::Channel,
    position::Position,
    sample::{RawRecord, TelemetrySample},
};
use serde_json::json;

/// A raw record like the car firmware sends it, using the firmware wire names.
pub fn get_raw_record(timestamp: f64, speed: f64, latitude: f64, longitude: f64) -> RawRecord {
    let value = json!({
        "timestamp": timestamp,
        "speed": speed,
        "rpm": speed * 120.0,
        "temperature": 82.5,
        "temp_cvt": 61.0,
        "soc": 87.0,
        "volt": 12.8,
        "current": 210.0,
        "acc_x": 0.12,
        "acc_y": -0.05,
        "acc_z": 9.79,
        "dps_x": 0.4,
        "dps_y": -0.3,
        "dps_z": 1.2,
        "roll": 1.5,
        "pitch": -2.0,
        "latitude": latitude,
        "longitude": longitude,
    });
    match value {
        serde_json::Value::Object(record) => record,
        _ => unreachable!("json! object literal"),
    }
}

/// A sample with a timestamp and a GPS fix only.
pub fn get_fix(timestamp: f64, latitude: f64, longitude: f64) -> TelemetrySample {
    TelemetrySample::default()
        .with_timestamp(timestamp)
        .with_position(&Position {
            latitude,
            longitude,
        })
}

/// A sample with a timestamp and a speed value but no GPS fix.
pub fn get_speed_sample(timestamp: f64, speed: f64) -> TelemetrySample {
    TelemetrySample::default()
        .with_timestamp(timestamp)
        .with_value(Channel::Speed, speed)
}
