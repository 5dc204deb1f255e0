// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::store::RollingTelemetryStore;
use common::{
    channel::Channel, error::TelemetryError, lap::LapSession, sample::TelemetrySample,
    serde::millis,
};
use serde_json::Value;
use tracing::{error, info};

/// The state a live session continues from after a snapshot was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBaseline {
    /// The newest record of the snapshot.
    pub last: TelemetrySample,
    /// Lap bookkeeping taken over from the newest record.
    pub lap_session: LapSession,
}

impl HistoryBaseline {
    pub fn total_distance(&self) -> f64 {
        self.last.value_or_zero(Channel::TotalDistance)
    }

    pub fn lap_distance(&self) -> f64 {
        self.last.value_or_zero(Channel::LapDistance)
    }
}

/// Validates every entry of a bulk history snapshot.
///
/// # Errors
///
/// Returns [`TelemetryError::SnapshotReplay`] for the first entry that is not a
/// record. Single fields that are not numbers do not reject the snapshot.
pub fn parse_snapshot(entries: &[Value]) -> Result<Vec<TelemetrySample>, TelemetryError> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            TelemetrySample::from_value(entry).map_err(|e| TelemetryError::SnapshotReplay {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Builds the lap bookkeeping from the lap fields of a record.
///
/// The lap start is derived back from the record timestamp and its current lap
/// time so the lap clock continues seamlessly.
pub fn lap_session_from(sample: &TelemetrySample) -> LapSession {
    let current_lap_start = sample.timestamp().map(|now| {
        now - sample
            .current_lap_time()
            .as_ref()
            .map_or(0.0, millis::from_duration)
    });
    LapSession {
        lap_count: sample.lap_count().unwrap_or(0),
        current_lap_start,
        last_lap_time: sample.last_lap_time(),
        best_lap_time: sample.best_lap_time(),
    }
}

/// Replaces the store content with a bulk history snapshot.
///
/// This is a replace, not a merge: every channel keeps the newest entries of
/// the snapshot that fit, in their original order, and the path is rebuilt from
/// the valid fixes of the snapshot. A corrupt snapshot leaves the store empty.
///
/// Returns the baseline to continue from, `None` for an empty snapshot.
///
/// # Errors
///
/// Returns [`TelemetryError::SnapshotReplay`] if the snapshot was rejected.
pub fn reconcile(
    store: &mut RollingTelemetryStore,
    entries: &[Value],
) -> Result<Option<HistoryBaseline>, TelemetryError> {
    let samples = match parse_snapshot(entries) {
        Ok(samples) => samples,
        Err(e) => {
            error!("Discarding history snapshot. Error: {e}");
            store.clear();
            return Err(e);
        }
    };
    Ok(reconcile_samples(store, &samples))
}

/// Replaces the store content with already validated samples.
pub fn reconcile_samples(
    store: &mut RollingTelemetryStore,
    samples: &[TelemetrySample],
) -> Option<HistoryBaseline> {
    store.replace_all(samples);
    info!(
        "Restored {} history samples, {} path points",
        store.len(),
        store.path().len()
    );
    samples.last().map(|last| HistoryBaseline {
        last: last.clone(),
        lap_session: lap_session_from(last),
    })
}
