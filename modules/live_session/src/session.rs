// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use algorithm::{DistanceAccumulator, LapDetector, LapDetectorConfig};
use common::{
    channel::Channel,
    error::TelemetryError,
    lap::{ArmStartFinish, LapCompleted, LapSession, StartFinishLine},
    sample::{RawRecord, TelemetrySample},
};
use module_core::LiveTelemetry;
use serde_json::Value;
use telemetry_store::{
    HISTORY_SNAPSHOT_LIMIT,
    buffer::HistoryBuffer,
    chart::{ChartData, ChartView, prepare},
    reconcile::{HistoryBaseline, lap_session_from, parse_snapshot, reconcile_samples},
    store::RollingTelemetryStore,
};
use tracing::{debug, error, info, warn};

/// Result of admitting one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Admitted {
    /// The sample enriched with distance and lap fields, as appended to the store.
    pub sample: TelemetrySample,
    /// The lap closed by this sample, if any.
    pub lap: Option<LapCompleted>,
}

/// The state of one telemetry connection.
///
/// Every input has exactly one mutating entry point and each of them runs to
/// completion before the next input is handled. Readers only get copies taken
/// between two inputs.
#[derive(Debug, Clone)]
pub struct TelemetrySession {
    store: RollingTelemetryStore,
    accumulator: DistanceAccumulator,
    detector: LapDetector,
    recent: HistoryBuffer<TelemetrySample>,
    latest: Option<TelemetrySample>,
    connected: bool,
}

impl TelemetrySession {
    pub fn new(config: LapDetectorConfig) -> Self {
        TelemetrySession {
            store: RollingTelemetryStore::new(),
            accumulator: DistanceAccumulator::new(),
            detector: LapDetector::new(config),
            recent: HistoryBuffer::new(HISTORY_SNAPSHOT_LIMIT),
            latest: None,
            connected: false,
        }
    }

    pub fn store(&self) -> &RollingTelemetryStore {
        &self.store
    }

    pub fn detector(&self) -> &LapDetector {
        &self.detector
    }

    pub fn accumulator(&self) -> &DistanceAccumulator {
        &self.accumulator
    }

    pub fn latest(&self) -> Option<&TelemetrySample> {
        self.latest.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn on_connected(&mut self) {
        self.connected = true;
    }

    /// Drops all live state. The start/finish line stays armed.
    pub fn on_disconnected(&mut self) {
        self.connected = false;
        self.reset();
    }

    /// Empties the store and forgets distance and lap bookkeeping.
    pub fn reset(&mut self) {
        self.store.clear();
        self.accumulator.reset();
        self.detector.reset();
        self.recent.clear();
        self.latest = None;
    }

    /// Validates and admits a raw record.
    ///
    /// `now` is used for records without a usable timestamp.
    pub fn on_record(&mut self, record: &RawRecord, now: f64) -> Admitted {
        self.admit(TelemetrySample::from_record(record), now)
    }

    /// Admits a validated sample: distance, then lap, then store.
    pub fn admit(&mut self, sample: TelemetrySample, now: f64) -> Admitted {
        let timestamp = sample.timestamp().unwrap_or(now);
        let fix = sample.position();
        let previous_lap_count = self.detector.session().lap_count;
        let previous_lap_distance = self.accumulator.lap_distance();

        if let Some(fix) = &fix {
            let delta = self.accumulator.update(fix);
            debug!("Distance increment {delta:.2} m");
        }
        if sample.has_upstream_distance() {
            self.accumulator.resync(
                sample.value_or_zero(Channel::TotalDistance),
                sample.value_or_zero(Channel::LapDistance),
            );
        }

        let lap = if sample.has_upstream_laps() {
            let session = lap_session_from(&sample.clone().with_timestamp(timestamp));
            let lap = self.latest.as_ref().and_then(|_| {
                upstream_completion(&session, previous_lap_count, previous_lap_distance, timestamp)
            });
            self.detector.seed(session);
            if lap.is_some() && !sample.has_upstream_distance() {
                self.accumulator.reset_lap();
            }
            lap
        } else {
            let lap = self.detector.observe(
                timestamp,
                fix.as_ref(),
                self.accumulator.lap_distance(),
            );
            if lap.is_some() {
                self.accumulator.reset_lap();
            }
            lap
        };

        let enriched = self.enrich(sample, timestamp);
        self.store.append(&enriched);
        self.recent.push(enriched.clone());
        self.latest = Some(enriched.clone());
        Admitted {
            sample: enriched,
            lap,
        }
    }

    /// Replaces the live state with a bulk history snapshot.
    ///
    /// The lap bookkeeping and the distance totals continue from the newest
    /// record of the snapshot. A corrupt snapshot leaves the session empty.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::SnapshotReplay`] if the snapshot was rejected.
    pub fn on_history(
        &mut self,
        entries: &[Value],
    ) -> Result<Option<HistoryBaseline>, TelemetryError> {
        let samples = match parse_snapshot(entries) {
            Ok(samples) => samples,
            Err(e) => {
                error!("Discarding history snapshot. Error: {e}");
                self.reset();
                return Err(e);
            }
        };

        let baseline = reconcile_samples(&mut self.store, &samples);
        self.recent.replace(samples);
        match &baseline {
            Some(baseline) => {
                self.detector.seed(baseline.lap_session.clone());
                self.accumulator.seed(
                    baseline.total_distance(),
                    baseline.lap_distance(),
                    baseline.last.position(),
                );
                self.latest = Some(baseline.last.clone());
            }
            None => {
                self.accumulator.reset();
                self.detector.reset();
                self.latest = None;
            }
        }
        Ok(baseline)
    }

    /// Arms the start/finish line.
    ///
    /// Without an explicit position the latest valid fix is used. The lap clock
    /// restarts at the latest sample timestamp, or at `now` before the first sample.
    ///
    /// Returns `None` if no position is known yet, or if the position or the
    /// radius is invalid.
    pub fn arm(&mut self, request: &ArmStartFinish, now: f64) -> Option<StartFinishLine> {
        let Some(position) = request
            .position
            .or_else(|| self.accumulator.last_fix().copied())
        else {
            warn!("Start/finish line not armed, no position known yet");
            return None;
        };
        if !position.is_valid() {
            warn!("Start/finish line not armed, invalid position {position:?}");
            return None;
        }
        if let Some(radius) = request.radius_m
            && !(radius.is_finite() && radius > 0.0)
        {
            warn!("Start/finish line not armed, invalid radius {radius}");
            return None;
        }
        let now = self.latest_timestamp().unwrap_or(now);
        let line = self.detector.arm(position, request.radius_m, now);
        self.accumulator.reset_lap();
        Some(line)
    }

    pub fn clear_start_finish(&mut self) {
        self.detector.clear();
    }

    /// Copy of the read model.
    ///
    /// The current lap time is derived at the latest sample timestamp, so a
    /// stalled connection shows the last known state.
    pub fn snapshot(&self, now: f64) -> LiveTelemetry {
        let lap_session = self.detector.session();
        LiveTelemetry {
            connected: self.connected,
            lap_count: lap_session.lap_count,
            current_lap_time: self
                .detector
                .current_lap_time(self.latest_timestamp().unwrap_or(now)),
            last_lap_time: lap_session.last_lap_time,
            best_lap_time: lap_session.best_lap_time,
            total_distance: self.accumulator.total_distance(),
            lap_distance: self.accumulator.lap_distance(),
            start_finish: self.detector.start_finish().copied(),
            latest: self.latest.clone(),
            store: self.store.clone(),
        }
    }

    pub fn chart(&self, view: &ChartView) -> ChartData {
        prepare(&self.store, view)
    }

    /// The enriched samples of the session, oldest first.
    pub fn history(&self) -> Vec<TelemetrySample> {
        self.recent.to_vec()
    }

    fn latest_timestamp(&self) -> Option<f64> {
        self.latest.as_ref().and_then(TelemetrySample::timestamp)
    }

    fn enrich(&self, sample: TelemetrySample, timestamp: f64) -> TelemetrySample {
        let lap_session = self.detector.session();
        sample
            .with_timestamp(timestamp)
            .with_value(Channel::TotalDistance, self.accumulator.total_distance())
            .with_value(Channel::LapDistance, self.accumulator.lap_distance())
            .with_laps(
                lap_session.lap_count,
                self.detector.current_lap_time(timestamp),
                lap_session.last_lap_time,
                lap_session.best_lap_time,
            )
    }
}

/// Turns an increased upstream lap count into a completion.
fn upstream_completion(
    session: &LapSession,
    previous_lap_count: u32,
    previous_lap_distance: f64,
    timestamp: f64,
) -> Option<LapCompleted> {
    if session.lap_count <= previous_lap_count {
        return None;
    }
    let lap_time = session.last_lap_time?;
    let best = session.best_lap_time.is_none_or(|best| lap_time <= best);
    info!(
        "Lap {} reported by producer in {:?}",
        session.lap_count, lap_time
    );
    Some(LapCompleted {
        lap_number: session.lap_count,
        lap_time,
        lap_distance: previous_lap_distance,
        completed_at: timestamp,
        best,
    })
}
