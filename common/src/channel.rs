// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use serde::{Deserialize, Serialize};

/// A telemetry channel that has its own history buffer.
///
/// The discriminant is the index of the channel buffer inside of the store, so
/// every lookup goes through this fixed table instead of a string key.
///
/// The string form (`Display`/`FromStr`) is the snake case name, e.g. `acc_x`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
    strum_macros::EnumCount,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Speed,
    Rpm,
    EngineTemp,
    CvtTemp,
    StateOfCharge,
    Voltage,
    Current,
    AccX,
    AccY,
    AccZ,
    GyroX,
    GyroY,
    GyroZ,
    Roll,
    Pitch,
    Latitude,
    Longitude,
    TotalDistance,
    LapDistance,
}

impl Channel {
    /// Index of the channel buffer.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Record keys accepted for this channel, canonical name first.
    ///
    /// The remaining entries are the names used by the car firmware and by the
    /// interface simulator.
    pub fn keys(self) -> &'static [&'static str] {
        match self {
            Channel::Speed => &["speed", "vel"],
            Channel::Rpm => &["rpm"],
            Channel::EngineTemp => &["engine_temp", "temperature", "temp_motor"],
            Channel::CvtTemp => &["cvt_temp", "temp_cvt"],
            Channel::StateOfCharge => &["state_of_charge", "soc"],
            Channel::Voltage => &["voltage", "volt"],
            Channel::Current => &["current"],
            Channel::AccX => &["acc_x", "accx"],
            Channel::AccY => &["acc_y", "accy"],
            Channel::AccZ => &["acc_z", "accz"],
            Channel::GyroX => &["gyro_x", "dps_x", "dpsx"],
            Channel::GyroY => &["gyro_y", "dps_y", "dpsy"],
            Channel::GyroZ => &["gyro_z", "dps_z", "dpsz"],
            Channel::Roll => &["roll"],
            Channel::Pitch => &["pitch"],
            Channel::Latitude => &["latitude", "lat"],
            Channel::Longitude => &["longitude", "lon"],
            Channel::TotalDistance => &["total_distance"],
            Channel::LapDistance => &["lap_distance"],
        }
    }

    /// Human readable label used for chart series.
    pub fn label(self) -> &'static str {
        match self {
            Channel::Speed => "Speed",
            Channel::Rpm => "RPM",
            Channel::EngineTemp => "Engine Temp",
            Channel::CvtTemp => "CVT Temp",
            Channel::StateOfCharge => "SoC",
            Channel::Voltage => "Voltage",
            Channel::Current => "Current",
            Channel::AccX => "Acc X",
            Channel::AccY => "Acc Y",
            Channel::AccZ => "Acc Z",
            Channel::GyroX => "Gyro X",
            Channel::GyroY => "Gyro Y",
            Channel::GyroZ => "Yaw Rate",
            Channel::Roll => "Roll",
            Channel::Pitch => "Pitch",
            Channel::Latitude => "Latitude",
            Channel::Longitude => "Longitude",
            Channel::TotalDistance => "Total Distance",
            Channel::LapDistance => "Lap Distance",
        }
    }
}
