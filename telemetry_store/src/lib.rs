// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Rolling Telemetry Store
//!
//! The bounded, index aligned read model of the live telemetry. Contains the
//! history reconciler that seeds the store on (re)connect and the chart data
//! pipeline that prepares aligned series for the visualizations.

pub mod buffer;
pub mod chart;
pub mod reconcile;
pub mod store;

/// Capacity of every channel history buffer and of the timestamp buffer.
pub const MAX_POINTS: usize = 300;

/// Capacity of the GPS path buffer.
pub const MAX_PATH_POINTS: usize = 500;

/// Maximum amount of samples a bulk history snapshot carries.
pub const HISTORY_SNAPSHOT_LIMIT: usize = 500;

#[cfg(test)]
mod tests;
