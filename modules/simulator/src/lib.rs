// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use chrono::{DateTime, TimeDelta, Utc};
use common::{position::Position, sample::RawRecord};
use module_core::{Event, EventKind, Module, ModuleCtx};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::{Value, json};
use std::{
    io::{Error, ErrorKind},
    sync::Arc,
    time::Duration,
};
use tokio::sync::broadcast;
use tracing::{debug, error, info};

mod path;

pub use path::PathWalker;

/// Start of the built-in path when no path file is given.
const BASE_POSITION: Position = Position {
    latitude: -8.05428,
    longitude: -34.8813,
};

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Time between two records.
    pub interval: Duration,
    /// Closed path the vehicle drives along. Without a path the vehicle drifts
    /// slowly away from a fixed base position.
    pub path: Option<Vec<Position>>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            interval: Duration::from_millis(500),
            path: None,
        }
    }
}

/// Generates plausible telemetry records of a driving vehicle.
pub struct TelemetryGenerator<R: Rng = StdRng> {
    rng: R,
    interval: Duration,
    elapsed: Duration,
    start: DateTime<Utc>,
    previous_speed: f64,
    walker: Option<PathWalker>,
}

impl TelemetryGenerator<StdRng> {
    /// # Errors
    ///
    /// Returns an error if the path of `config` can't be projected.
    pub fn new(config: &SimulatorConfig) -> Result<Self, Error> {
        TelemetryGenerator::new_with_rng(config, StdRng::from_os_rng(), Utc::now())
    }
}

impl<R: Rng> TelemetryGenerator<R> {
    /// Creates a generator with a given random source and start time.
    ///
    /// # Errors
    ///
    /// Returns an error if the path of `config` can't be projected.
    pub fn new_with_rng(
        config: &SimulatorConfig,
        rng: R,
        start: DateTime<Utc>,
    ) -> Result<Self, Error> {
        let walker = config.path.as_deref().map(PathWalker::new).transpose()?;
        Ok(TelemetryGenerator {
            rng,
            interval: config.interval,
            elapsed: Duration::ZERO,
            start,
            previous_speed: 0.0,
            walker,
        })
    }

    /// Produces the record of the next interval.
    ///
    /// Speed in km/h follows a slow sine between 15 and 45, rpm follows the
    /// speed, temperatures rise and the battery drains over time.
    pub fn next_record(&mut self) -> RawRecord {
        self.elapsed += self.interval;
        let t = self.elapsed.as_secs_f64();
        let dt = self.interval.as_secs_f64();

        let speed = (30.0 + 15.0 * (t / 10.0).sin()).clamp(0.0, 60.0);
        let rpm = speed * 120.0 + self.rng.random_range(-200.0..=200.0);
        let acc_x = if dt > 0.0 {
            (speed - self.previous_speed) / dt
        } else {
            0.0
        };
        self.previous_speed = speed;
        let position = self.next_position(t, speed / 3.6 * dt);
        let timestamp = self.start + TimeDelta::from_std(self.elapsed).unwrap_or_default();

        let value = json!({
            "timestamp": timestamp.to_rfc3339(),
            "vel": round(speed, 2),
            "rpm": round(rpm, 2),
            "accx": round(acc_x, 2),
            "accy": round(self.rng.random_range(-0.2..=0.2), 2),
            "accz": round(self.rng.random_range(9.4..=9.8), 2),
            "dpsx": round(self.rng.random_range(-1.0..=1.0), 2),
            "dpsy": round(self.rng.random_range(-1.0..=1.0), 2),
            "dpsz": round(self.rng.random_range(-1.0..=1.0), 2),
            "roll": round(self.rng.random_range(-5.0..=5.0), 2),
            "pitch": round(self.rng.random_range(-5.0..=5.0), 2),
            "temp_motor": round((60.0 + t * 0.3).min(110.0), 1),
            "temp_cvt": round((50.0 + t * 0.25).min(95.0), 1),
            "soc": round((100.0 - t * 0.03).max(0.0), 1),
            "volt": round(13.0 - t * 0.001, 2),
            "current": round(self.rng.random_range(150.0..=300.0), 1),
            "latitude": position.map(|p| round(p.latitude, 6)),
            "longitude": position.map(|p| round(p.longitude, 6)),
        });
        match value {
            Value::Object(record) => record,
            _ => RawRecord::new(),
        }
    }

    fn next_position(&mut self, t: f64, distance: f64) -> Option<Position> {
        match &mut self.walker {
            Some(walker) => walker.advance(distance),
            None => Some(Position {
                latitude: BASE_POSITION.latitude + t * 0.00002,
                longitude: BASE_POSITION.longitude + (t / 20.0).sin() * 0.0001,
            }),
        }
    }
}

fn round(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

async fn simulator_task(
    sender: broadcast::Sender<Event>,
    mut generator: TelemetryGenerator,
    interval: Duration,
) {
    let _ = sender.send(Event {
        kind: EventKind::ConnectedEvent,
    });
    let mut timer = tokio::time::interval(interval);
    loop {
        timer.tick().await;
        let record = generator.next_record();
        debug!("Simulated record {:?}", record.get("timestamp"));
        let _ = sender.send(Event {
            kind: EventKind::TelemetryRecordEvent(Arc::new(record)),
        });
    }
}

/// Telemetry source that publishes simulated records in a fixed interval.
pub struct SimulatorModule {
    ctx: ModuleCtx,
    config: SimulatorConfig,
}

impl SimulatorModule {
    /// # Errors
    ///
    /// Returns an error if the interval is zero or the configured path is empty
    /// or can't be projected.
    pub fn new(ctx: ModuleCtx, config: SimulatorConfig) -> Result<Self, Error> {
        if config.interval.is_zero() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "simulator interval must not be zero",
            ));
        }
        if let Some(path) = &config.path {
            PathWalker::new(path)?;
        }
        Ok(SimulatorModule { ctx, config })
    }
}

#[async_trait::async_trait]
impl Module for SimulatorModule {
    async fn run(&mut self) -> Result<(), ()> {
        let generator = TelemetryGenerator::new(&self.config).map_err(|e| {
            error!("Failed to start simulator. Error: {e}");
        })?;
        info!(
            "Simulator started, one record every {:?}",
            self.config.interval
        );
        let sender = self.ctx.sender.clone();
        let interval = self.config.interval;
        let simulator_handle =
            tokio::spawn(async move { simulator_task(sender, generator, interval).await });
        loop {
            match self.ctx.receiver.recv().await {
                Ok(Event {
                    kind: EventKind::QuitEvent,
                }) => break,
                Ok(_) => (),
                Err(broadcast::error::RecvError::Lagged(_)) => (),
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        simulator_handle.abort();
        Ok(())
    }
}
