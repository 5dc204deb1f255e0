// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::store::RollingTelemetryStore;
use common::channel::Channel;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The shared X axis of a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XAxis {
    /// Sample timestamps, arrival order.
    Time,
    /// Total driven distance, arrival order.
    Distance,
    /// Any telemetry channel. Used by scatter and correlation views, sorted by X.
    Channel(Channel),
}

impl XAxis {
    /// Returns `true` if the axis needs sorting before it can be plotted.
    pub fn is_scatter(&self) -> bool {
        matches!(self, XAxis::Channel(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            XAxis::Time => "TIME",
            XAxis::Distance => "DISTANCE",
            XAxis::Channel(channel) => channel.label(),
        }
    }
}

/// Parses `time`, `distance` or a channel name like `speed`.
impl FromStr for XAxis {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "time" => Ok(XAxis::Time),
            "distance" => Ok(XAxis::Distance),
            other => Channel::from_str(other).map(XAxis::Channel),
        }
    }
}

impl fmt::Display for XAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XAxis::Time => write!(f, "time"),
            XAxis::Distance => write!(f, "distance"),
            XAxis::Channel(channel) => write!(f, "{channel}"),
        }
    }
}

/// A requested chart: one X axis and one series per Y channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartView {
    pub x: XAxis,
    pub channels: Vec<Channel>,
}

impl ChartView {
    pub fn new(x: XAxis, channels: Vec<Channel>) -> Self {
        ChartView { x, channels }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub label: String,
    pub values: Vec<f64>,
}

/// Prepared chart data. Every series has the length of `x` and the n-th
/// entries of all sequences belong to the same sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub x_label: String,
    pub x: Vec<f64>,
    pub series: Vec<Series>,
}

/// Prepares the chart data of `view` from the current store content.
///
/// Time and distance views keep the arrival order. A channel X axis is sorted
/// ascending by X with a stable sort, so equal X values keep their arrival
/// order. A missing Y value is plotted as `0.0`, never dropped.
///
/// The function only reads the store, preparing the same view twice on an
/// unchanged store gives identical data.
pub fn prepare(store: &RollingTelemetryStore, view: &ChartView) -> ChartData {
    let x: Vec<f64> = match view.x {
        XAxis::Time => store.timestamps().to_vec(),
        XAxis::Distance => store.channel(Channel::TotalDistance).to_vec(),
        XAxis::Channel(channel) => store.channel(channel).to_vec(),
    };

    let mut order: Vec<usize> = (0..x.len()).collect();
    if view.x.is_scatter() {
        order.sort_by(|a, b| x[*a].total_cmp(&x[*b]));
    }

    let series = view
        .channels
        .iter()
        .map(|channel| {
            let buffer = store.channel(*channel);
            Series {
                label: channel.label().to_string(),
                values: order
                    .iter()
                    .map(|i| buffer.get(*i).copied().unwrap_or(0.0))
                    .collect(),
            }
        })
        .collect();

    ChartData {
        x_label: view.x.label().to_string(),
        x: order.iter().map(|i| x[*i]).collect(),
        series,
    }
}
