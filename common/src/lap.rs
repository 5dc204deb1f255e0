// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{
    position::Position,
    serde::{millis, optional_millis},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The operator armed start/finish geofence.
///
/// A lap can only complete while the vehicle is within `radius_m` meters of
/// `position`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartFinishLine {
    pub position: Position,
    pub radius_m: f64,
}

impl StartFinishLine {
    pub fn new(position: Position, radius_m: f64) -> Self {
        StartFinishLine { position, radius_m }
    }
}

/// Lap bookkeeping of one connection.
///
/// Timestamps are milliseconds of the sample clock, lap times are durations.
/// The current lap time is not stored, it is derived from the lap start with
/// [`LapSession::current_lap_time`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LapSession {
    pub lap_count: u32,
    /// Instant the running lap started, either the last completion or the session start.
    pub current_lap_start: Option<f64>,
    #[serde(with = "optional_millis")]
    pub last_lap_time: Option<Duration>,
    #[serde(with = "optional_millis")]
    pub best_lap_time: Option<Duration>,
}

impl LapSession {
    /// Time spent on the running lap at `now`.
    ///
    /// Returns [`Duration::ZERO`] if the lap clock is not running yet or `now`
    /// lies before the lap start.
    pub fn current_lap_time(&self, now: f64) -> Duration {
        self.current_lap_start
            .map_or(Duration::ZERO, |start| millis::to_duration(now - start))
    }

    /// Starts the lap clock at `now` unless it already runs.
    pub fn start_clock(&mut self, now: f64) {
        if self.current_lap_start.is_none() {
            self.current_lap_start = Some(now);
        }
    }

    /// Closes the running lap at `now` and starts the next one.
    ///
    /// Updates the lap count, the last lap and the best lap. Returns the
    /// completed lap time.
    pub fn complete_lap(&mut self, now: f64) -> Duration {
        let lap_time = self.current_lap_time(now);
        self.lap_count += 1;
        self.last_lap_time = Some(lap_time);
        self.best_lap_time = Some(
            self.best_lap_time
                .map_or(lap_time, |best| best.min(lap_time)),
        );
        self.current_lap_start = Some(now);
        lap_time
    }
}

/// Emitted once for every completed lap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LapCompleted {
    pub lap_number: u32,
    #[serde(with = "millis")]
    pub lap_time: Duration,
    /// Distance driven during the lap in meters.
    pub lap_distance: f64,
    /// Sample timestamp of the completion.
    pub completed_at: f64,
    /// `true` if this lap is the new best lap.
    pub best: bool,
}

/// Operator request to arm the start/finish line.
///
/// Without a position the line is armed at the latest valid fix of the
/// vehicle. Without a radius the configured radius is used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmStartFinish {
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub radius_m: Option<f64>,
}

impl ArmStartFinish {
    /// Arms at the current vehicle position with the configured radius.
    pub fn at_vehicle() -> Self {
        ArmStartFinish::default()
    }

    pub fn at(position: Position, radius_m: Option<f64>) -> Self {
        ArmStartFinish {
            position: Some(position),
            radius_m,
        }
    }
}
