// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::error::TelemetryError;
use serde::{Deserialize, Serialize};

/// Represents a geographical coordinate with latitude and longitude.
///
/// The `Position` struct is commonly used to store a point on Earth
/// in decimal degrees. Latitude values range from -90.0 to 90.0, and
/// longitude values range from -180.0 to 180.0.
///
/// # Example
///
/// ```rust
/// use common::position::Position;
///
/// let pos = Position {
///     latitude: -8.05428,
///     longitude: -34.8813,
/// };
///
/// assert!(pos.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    /// Creates a new [`Position`] with the given latitude and longitude.
    ///
    /// No range check is applied, use [`Position::try_new`] for untrusted input.
    pub fn new(latitude: &f64, longitude: &f64) -> Self {
        Position {
            latitude: *latitude,
            longitude: *longitude,
        }
    }

    /// Creates a new [`Position`] if both coordinates are finite and inside of
    /// the valid ranges (±90 for latitude, ±180 for longitude).
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidPosition`] otherwise.
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self, TelemetryError> {
        let pos = Position {
            latitude,
            longitude,
        };
        if pos.is_valid() {
            Ok(pos)
        } else {
            Err(TelemetryError::InvalidPosition {
                latitude,
                longitude,
            })
        }
    }

    /// Returns `true` if both coordinates are finite and inside of the valid ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Returns `true` if either coordinate is exactly zero. Upstream producers
    /// fill missing coordinates with zero, so such a fix is a placeholder.
    pub fn has_zero_coordinate(&self) -> bool {
        self.latitude == 0.0 || self.longitude == 0.0
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
