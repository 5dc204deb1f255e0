// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

/// Errors produced while turning inbound records into usable telemetry.
///
/// None of these are fatal for a running session. A malformed record is dropped,
/// an invalid position only disables the GPS derived values of that sample and a
/// rejected snapshot leaves the store empty.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TelemetryError {
    /// The payload could not be decoded into a record at all.
    #[error("malformed telemetry sample: {0}")]
    MalformedSample(String),

    /// Latitude or longitude is not finite or outside of ±90 / ±180.
    #[error("invalid position (latitude: {latitude}, longitude: {longitude})")]
    InvalidPosition { latitude: f64, longitude: f64 },

    /// A bulk history snapshot contained an entry that is not a record.
    #[error("history snapshot rejected at entry {index}: {reason}")]
    SnapshotReplay { index: usize, reason: String },
}
