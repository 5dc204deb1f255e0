// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Common Modul for the telemetry core
//!
//! Provides the data types that are shared by every modul: positions, channels,
//! validated telemetry samples, lap bookkeeping and the time source abstraction.

pub mod channel;
pub mod clock;
pub mod error;
pub mod lap;
pub mod position;
pub mod sample;
pub mod serde;
pub mod test_helper;

#[cfg(test)]
mod tests;
