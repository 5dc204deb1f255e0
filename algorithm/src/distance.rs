use common::{lap::StartFinishLine, position::Position};

/// Mean earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculates the great-circle distance in meters between two geographic positions.
///
/// Uses the haversine formula on a sphere with [`EARTH_RADIUS_M`]. The haversine
/// intermediate is clamped to `[0, 1]` before the inverse trigonometric step, so
/// rounding can never produce a domain error:
/// - identical positions yield exactly `0.0`
/// - antipodal positions yield half the circumference
///
/// The result does not depend on the argument order.
///
/// # Parameters
/// - `pos1`: Reference to the first geographic position in degrees.
/// - `pos2`: Reference to the second geographic position in degrees.
pub fn haversine_distance(pos1: &Position, pos2: &Position) -> f64 {
    let phi1 = pos1.latitude.to_radians();
    let phi2 = pos2.latitude.to_radians();
    let d_phi = (pos2.latitude - pos1.latitude).to_radians();
    let d_lambda = (pos2.longitude - pos1.longitude).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Returns `true` if `pos` lies inside of the start/finish geofence.
///
/// The border itself counts as inside.
pub fn is_within_radius(pos: &Position, line: &StartFinishLine) -> bool {
    haversine_distance(pos, &line.position) <= line.radius_m
}

/// Turns consecutive GPS fixes into driven distance.
///
/// The total distance only grows for the lifetime of the accumulator, the lap
/// distance is reset whenever a lap completes. Samples without a valid fix do
/// not reach the accumulator, the chain continues with the next valid fix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceAccumulator {
    last_fix: Option<Position>,
    total_distance: f64,
    lap_distance: f64,
}

impl DistanceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the distance between the previous fix and `fix`.
    ///
    /// Returns the increment in meters, `0.0` for the first fix.
    pub fn update(&mut self, fix: &Position) -> f64 {
        let delta = self
            .last_fix
            .as_ref()
            .map_or(0.0, |last| haversine_distance(last, fix));
        self.total_distance += delta;
        self.lap_distance += delta;
        self.last_fix = Some(*fix);
        delta
    }

    /// Replaces both totals with values computed elsewhere.
    ///
    /// The last fix is kept so local accumulation can continue from the new totals.
    pub fn resync(&mut self, total_distance: f64, lap_distance: f64) {
        self.total_distance = total_distance.max(0.0);
        self.lap_distance = lap_distance.max(0.0);
    }

    /// Restores the accumulator from a history baseline.
    pub fn seed(&mut self, total_distance: f64, lap_distance: f64, last_fix: Option<Position>) {
        self.resync(total_distance, lap_distance);
        self.last_fix = last_fix;
    }

    pub fn reset_lap(&mut self) {
        self.lap_distance = 0.0;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    pub fn lap_distance(&self) -> f64 {
        self.lap_distance
    }

    pub fn last_fix(&self) -> Option<&Position> {
        self.last_fix.as_ref()
    }
}
