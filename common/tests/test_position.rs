// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::error::TelemetryError;
use common::position::Position;

fn get_position_as_json<'a>() -> &'a str {
    r#"
    {
        "latitude": -8.05428,
        "longitude": -34.8813
    }
    "#
}

fn get_position() -> Position {
    Position {
        latitude: -8.05428,
        longitude: -34.8813,
    }
}

#[test]
pub fn deserialize_position_from_json() {
    let pos = Position::from_json(get_position_as_json())
        .unwrap_or_else(|e| panic!("Failed to deserialize the raw json. Reason: {e}"));
    assert_eq!(pos, get_position());
}

#[test]
pub fn try_new_accepts_range_limits() {
    assert!(Position::try_new(90.0, 180.0).is_ok());
    assert!(Position::try_new(-90.0, -180.0).is_ok());
    assert!(Position::try_new(0.0, 0.0).is_ok());
}

#[test]
pub fn try_new_rejects_invalid_coordinates() {
    assert_eq!(
        Position::try_new(90.5, 10.0),
        Err(TelemetryError::InvalidPosition {
            latitude: 90.5,
            longitude: 10.0
        })
    );
    assert!(Position::try_new(10.0, -180.5).is_err());
    assert!(Position::try_new(f64::NAN, 10.0).is_err());
    assert!(Position::try_new(10.0, f64::INFINITY).is_err());
}

#[test]
pub fn zero_coordinates_are_detected() {
    assert!(Position::new(&0.0, &0.0).has_zero_coordinate());
    assert!(Position::new(&0.0, &-34.88).has_zero_coordinate());
    assert!(Position::new(&-8.05, &0.0).has_zero_coordinate());
    assert!(!Position::new(&-8.05, &-34.88).has_zero_coordinate());
    assert!(!get_position().has_zero_coordinate());
}
