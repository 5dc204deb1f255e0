use crate::distance::is_within_radius;
use common::{
    lap::{LapCompleted, LapSession, StartFinishLine},
    position::Position,
};
use std::time::Duration;
use tracing::{debug, info};

/// Tuning of the start/finish geofence.
///
/// Different tracks and vehicles need different values, so neither value is
/// hard coded into the detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LapDetectorConfig {
    /// Radius in meters used when the operator arms the line without an explicit radius.
    pub radius_m: f64,
    /// A lap only completes after more than this time on the lap. Prevents re-triggering
    /// while the vehicle stands at the line.
    pub min_lap_time: Duration,
}

impl Default for LapDetectorConfig {
    /// 10 meters radius, 10 seconds minimum lap time.
    fn default() -> Self {
        LapDetectorConfig {
            radius_m: 10.0,
            min_lap_time: Duration::from_secs(10),
        }
    }
}

/// State of the lap detector finite state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LapDetectorState {
    /// No start/finish line is set. Time is tracked, laps never complete.
    ArmedWaiting,

    /// The line is set and the lap clock runs from the last crossing.
    Running,
}

/// Geofence based lap detector.
///
/// Owns the [`LapSession`] of the connection. Every valid fix is checked against
/// the start/finish line while [`LapDetectorState::Running`]. A lap completes if
/// the fix is inside of the radius and the running lap is longer than
/// [`LapDetectorConfig::min_lap_time`].
#[derive(Debug, Clone, Default)]
pub struct LapDetector {
    config: LapDetectorConfig,
    line: Option<StartFinishLine>,
    session: LapSession,
}

impl LapDetector {
    pub fn new(config: LapDetectorConfig) -> Self {
        LapDetector {
            config,
            line: None,
            session: LapSession::default(),
        }
    }

    pub fn config(&self) -> &LapDetectorConfig {
        &self.config
    }

    pub fn state(&self) -> LapDetectorState {
        match self.line {
            Some(_) => LapDetectorState::Running,
            None => LapDetectorState::ArmedWaiting,
        }
    }

    pub fn start_finish(&self) -> Option<&StartFinishLine> {
        self.line.as_ref()
    }

    /// Read access to the lap bookkeeping.
    pub fn session(&self) -> &LapSession {
        &self.session
    }

    /// Time spent on the running lap at `now`.
    pub fn current_lap_time(&self, now: f64) -> Duration {
        self.session.current_lap_time(now)
    }

    /// Sets the start/finish line and switches to [`LapDetectorState::Running`].
    ///
    /// Without an explicit radius the configured radius is used. Arming restarts
    /// the lap clock at `now`, completed laps are kept.
    pub fn arm(&mut self, position: Position, radius_m: Option<f64>, now: f64) -> StartFinishLine {
        let line = StartFinishLine::new(position, radius_m.unwrap_or(self.config.radius_m));
        self.line = Some(line);
        self.session.current_lap_start = Some(now);
        info!(
            "Start/finish line armed at lat: {}, lon: {}, radius: {} m",
            line.position.latitude, line.position.longitude, line.radius_m
        );
        line
    }

    /// Removes the start/finish line. Lap timing stops completing laps until the
    /// line is armed again.
    pub fn clear(&mut self) {
        if self.line.take().is_some() {
            info!("Start/finish line cleared");
        }
    }

    /// Replaces the lap bookkeeping, e.g. from a history snapshot or from lap
    /// fields computed by the producer.
    pub fn seed(&mut self, session: LapSession) {
        self.session = session;
    }

    /// Forgets the lap bookkeeping. The start/finish line stays armed.
    pub fn reset(&mut self) {
        self.session = LapSession::default();
    }

    /// Processes one sample.
    ///
    /// - `now`: the sample timestamp in milliseconds.
    /// - `fix`: the valid GPS fix of the sample, if any.
    /// - `lap_distance`: distance driven on the running lap, reported with a completion.
    ///
    /// Returns the completed lap if this sample closed one.
    pub fn observe(
        &mut self,
        now: f64,
        fix: Option<&Position>,
        lap_distance: f64,
    ) -> Option<LapCompleted> {
        self.session.start_clock(now);
        let line = self.line?;
        let fix = fix?;

        if !is_within_radius(fix, &line) {
            return None;
        }
        let elapsed = self.session.current_lap_time(now);
        if elapsed <= self.config.min_lap_time {
            debug!(
                "Inside of start/finish radius after {:?}, below minimum lap time",
                elapsed
            );
            return None;
        }

        let previous_best = self.session.best_lap_time;
        let lap_time = self.session.complete_lap(now);
        let best = previous_best.is_none_or(|best| lap_time < best);
        info!(
            "Lap {} completed in {:?}{}",
            self.session.lap_count,
            lap_time,
            if best { " (best lap)" } else { "" }
        );
        Some(LapCompleted {
            lap_number: self.session.lap_count,
            lap_time,
            lap_distance,
            completed_at: now,
            best,
        })
    }
}
