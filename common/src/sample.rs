// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{channel::Channel, error::TelemetryError, position::Position, serde::millis};
use chrono::{DateTime, NaiveDateTime};
use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::Value;
use std::time::Duration;
use strum::{EnumCount, IntoEnumIterator};
use tracing::debug;

/// A decoded but not yet validated record as it arrives from the transport.
pub type RawRecord = serde_json::Map<String, Value>;

/// One instant's reading of the vehicle.
///
/// A sample is produced by the validator from a [`RawRecord`]. Every field is
/// optional: a field that was missing, not a number or not finite is absent.
/// Absent values are zero filled only when the sample is appended to the store.
///
/// Samples are immutable, the `with_*` builders return a new sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySample {
    timestamp: Option<f64>,
    values: [Option<f64>; Channel::COUNT],
    lap_count: Option<u32>,
    current_lap_time: Option<Duration>,
    last_lap_time: Option<Duration>,
    best_lap_time: Option<Duration>,
}

impl TelemetrySample {
    /// Validates a raw record.
    ///
    /// - Channel values are accepted only if they are finite numbers. Each channel
    ///   accepts the keys listed by [`Channel::keys`], the first usable key wins.
    /// - Latitude and longitude are kept only as a pair and only if the pair is a
    ///   valid [`Position`]. Other channels are not affected by an invalid position.
    /// - The timestamp may be a millisecond number or an ISO 8601 string.
    pub fn from_record(record: &RawRecord) -> Self {
        let mut values = [None; Channel::COUNT];
        for channel in Channel::iter() {
            values[channel.index()] = channel
                .keys()
                .iter()
                .find_map(|key| record.get(*key).and_then(finite_number));
        }

        let lat = values[Channel::Latitude.index()];
        let lon = values[Channel::Longitude.index()];
        let position_valid = match (lat, lon) {
            (Some(lat), Some(lon)) => match Position::try_new(lat, lon) {
                Ok(_) => true,
                Err(e) => {
                    debug!("Dropping GPS fields of sample: {e}");
                    false
                }
            },
            _ => false,
        };
        if !position_valid {
            values[Channel::Latitude.index()] = None;
            values[Channel::Longitude.index()] = None;
        }

        TelemetrySample {
            timestamp: record.get("timestamp").and_then(timestamp_millis),
            values,
            lap_count: record
                .get("lap_count")
                .and_then(finite_number)
                .filter(|count| *count >= 0.0)
                .map(|count| count as u32),
            current_lap_time: record
                .get("current_lap_time")
                .and_then(finite_number)
                .filter(|ms| *ms >= 0.0)
                .map(millis::to_duration),
            last_lap_time: record.get("last_lap_time").and_then(lap_time),
            best_lap_time: record.get("best_lap_time").and_then(lap_time),
        }
    }

    /// Validates a decoded JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::MalformedSample`] if the value is not a JSON object.
    pub fn from_value(value: &Value) -> Result<Self, TelemetryError> {
        match value {
            Value::Object(record) => Ok(TelemetrySample::from_record(record)),
            other => Err(TelemetryError::MalformedSample(format!(
                "expected a JSON object, got {}",
                json_type_name(other)
            ))),
        }
    }

    /// Decodes and validates a JSON text message.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::MalformedSample`] if the text is not JSON or
    /// not a JSON object.
    pub fn from_json(json: &str) -> Result<Self, TelemetryError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| TelemetryError::MalformedSample(e.to_string()))?;
        TelemetrySample::from_value(&value)
    }

    /// Timestamp in milliseconds since an arbitrary epoch.
    pub fn timestamp(&self) -> Option<f64> {
        self.timestamp
    }

    /// The value of a channel, `None` if it was absent or invalid.
    pub fn value(&self, channel: Channel) -> Option<f64> {
        self.values[channel.index()]
    }

    /// The value of a channel with absent values zero filled.
    pub fn value_or_zero(&self, channel: Channel) -> f64 {
        self.value(channel).unwrap_or(0.0)
    }

    /// The GPS fix of this sample, `None` if the position was unavailable.
    pub fn position(&self) -> Option<Position> {
        match (self.value(Channel::Latitude), self.value(Channel::Longitude)) {
            (Some(latitude), Some(longitude)) => Some(Position {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }

    pub fn lap_count(&self) -> Option<u32> {
        self.lap_count
    }

    pub fn current_lap_time(&self) -> Option<Duration> {
        self.current_lap_time
    }

    pub fn last_lap_time(&self) -> Option<Duration> {
        self.last_lap_time
    }

    pub fn best_lap_time(&self) -> Option<Duration> {
        self.best_lap_time
    }

    /// Returns `true` if the producer already computed the lap fields.
    pub fn has_upstream_laps(&self) -> bool {
        self.lap_count.is_some()
    }

    /// Returns `true` if the producer already computed both distance fields.
    pub fn has_upstream_distance(&self) -> bool {
        self.value(Channel::TotalDistance).is_some() && self.value(Channel::LapDistance).is_some()
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_value(mut self, channel: Channel, value: f64) -> Self {
        self.values[channel.index()] = Some(value);
        self
    }

    pub fn with_position(self, pos: &Position) -> Self {
        self.with_value(Channel::Latitude, pos.latitude)
            .with_value(Channel::Longitude, pos.longitude)
    }

    /// Returns a copy with the lap fields replaced.
    pub fn with_laps(
        mut self,
        lap_count: u32,
        current_lap_time: Duration,
        last_lap_time: Option<Duration>,
        best_lap_time: Option<Duration>,
    ) -> Self {
        self.lap_count = Some(lap_count);
        self.current_lap_time = Some(current_lap_time);
        self.last_lap_time = last_lap_time;
        self.best_lap_time = best_lap_time;
        self
    }
}

/// Serializes the sample as a flat record with the canonical channel names.
/// Absent values are written as `null`, durations as milliseconds.
impl Serialize for TelemetrySample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Channel::COUNT + 5))?;
        map.serialize_entry("timestamp", &self.timestamp)?;
        for channel in Channel::iter() {
            map.serialize_entry(channel.keys()[0], &self.value(channel))?;
        }
        map.serialize_entry("lap_count", &self.lap_count)?;
        map.serialize_entry(
            "current_lap_time",
            &self.current_lap_time.as_ref().map(millis::from_duration),
        )?;
        map.serialize_entry(
            "last_lap_time",
            &self.last_lap_time.as_ref().map(millis::from_duration),
        )?;
        map.serialize_entry(
            "best_lap_time",
            &self.best_lap_time.as_ref().map(millis::from_duration),
        )?;
        map.end()
    }
}

fn finite_number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

/// Lap times of zero are the producer's way of saying "no lap yet".
fn lap_time(value: &Value) -> Option<Duration> {
    finite_number(value)
        .filter(|ms| *ms > 0.0)
        .map(millis::to_duration)
}

fn timestamp_millis(value: &Value) -> Option<f64> {
    match value {
        Value::Number(_) => finite_number(value),
        Value::String(text) => {
            if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
                return Some(datetime.timestamp_millis() as f64);
            }
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|datetime| datetime.and_utc().timestamp_millis() as f64)
        }
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
