// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Position based algorithms of the telemetry core.
//!
//! Contains the great-circle distance, the distance accumulator and the
//! start/finish geofence lap detector.

mod distance;
mod lap_detector;

pub use distance::{DistanceAccumulator, EARTH_RADIUS_M, haversine_distance, is_within_radius};
pub use lap_detector::{LapDetector, LapDetectorConfig, LapDetectorState};
