// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{
    MAX_PATH_POINTS, MAX_POINTS,
    buffer::{HistoryBuffer, PathBuffer},
};
use common::{channel::Channel, position::Position, sample::TelemetrySample};
use serde::{Serialize, Serializer, ser::SerializeMap};
use strum::{EnumCount, IntoEnumIterator};

/// Bounded per channel history of the live telemetry.
///
/// All channel buffers and the timestamp buffer always have the same length:
/// [`RollingTelemetryStore::append`] is the only way to add a sample and it
/// writes one value to every buffer. The path buffer is independent, it only
/// grows with valid GPS fixes and has its own capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingTelemetryStore {
    timestamps: HistoryBuffer<f64>,
    channels: Vec<HistoryBuffer<f64>>,
    path: PathBuffer,
}

impl Default for RollingTelemetryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RollingTelemetryStore {
    /// Creates an empty store with [`MAX_POINTS`] and [`MAX_PATH_POINTS`].
    pub fn new() -> Self {
        Self::with_capacity(MAX_POINTS, MAX_PATH_POINTS)
    }

    pub fn with_capacity(max_points: usize, max_path_points: usize) -> Self {
        RollingTelemetryStore {
            timestamps: HistoryBuffer::new(max_points),
            channels: (0..Channel::COUNT)
                .map(|_| HistoryBuffer::new(max_points))
                .collect(),
            path: HistoryBuffer::new(max_path_points),
        }
    }

    /// Appends one sample to every channel buffer.
    ///
    /// Absent values (and an absent timestamp) are written as `0.0` so the
    /// buffers stay index aligned. The fix of the sample, if any, is appended
    /// to the path.
    pub fn append(&mut self, sample: &TelemetrySample) {
        self.timestamps.push(sample.timestamp().unwrap_or(0.0));
        for channel in Channel::iter() {
            self.channels[channel.index()].push(sample.value_or_zero(channel));
        }
        if let Some(pos) = sample.position() {
            self.path.push(pos);
        }
        debug_assert!(self.is_aligned());
    }

    /// Replaces every buffer with the given samples.
    ///
    /// Each buffer keeps only the newest entries that fit. The path is rebuilt
    /// from the fixes of the samples, skipping fixes with a zero coordinate.
    pub fn replace_all(&mut self, samples: &[TelemetrySample]) {
        self.timestamps
            .replace(samples.iter().map(|s| s.timestamp().unwrap_or(0.0)));
        for channel in Channel::iter() {
            self.channels[channel.index()]
                .replace(samples.iter().map(|s| s.value_or_zero(channel)));
        }
        self.path.replace(
            samples
                .iter()
                .filter_map(TelemetrySample::position)
                .filter(|pos| !pos.has_zero_coordinate()),
        );
        debug_assert!(self.is_aligned());
    }

    /// Empties every buffer.
    pub fn clear(&mut self) {
        self.timestamps.clear();
        self.channels.iter_mut().for_each(HistoryBuffer::clear);
        self.path.clear();
    }

    pub fn timestamps(&self) -> &HistoryBuffer<f64> {
        &self.timestamps
    }

    pub fn channel(&self, channel: Channel) -> &HistoryBuffer<f64> {
        &self.channels[channel.index()]
    }

    pub fn path(&self) -> &PathBuffer {
        &self.path
    }

    /// Amount of samples held by the channel buffers.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    fn is_aligned(&self) -> bool {
        self.channels
            .iter()
            .all(|buffer| buffer.len() == self.timestamps.len())
    }
}

/// Serializes the buffers as `{"timestamps": [..], "channels": {"speed": [..], ..}, "path": [[lat, lon], ..]}`.
impl Serialize for RollingTelemetryStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("timestamps", &self.timestamps)?;
        map.serialize_entry("channels", &ChannelTable(self))?;
        let path: Vec<[f64; 2]> = self
            .path
            .iter()
            .map(|Position { latitude, longitude }| [*latitude, *longitude])
            .collect();
        map.serialize_entry("path", &path)?;
        map.end()
    }
}

struct ChannelTable<'a>(&'a RollingTelemetryStore);

impl Serialize for ChannelTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Channel::COUNT))?;
        for channel in Channel::iter() {
            map.serialize_entry(&channel.to_string(), self.0.channel(channel))?;
        }
        map.end()
    }
}
