use common::position::Position;
use std::io::{Error, ErrorKind};
use utm::{lat_lon_to_zone_number, lat_to_zone_letter, to_utm_wgs84, wsg84_utm_to_lat_lon};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct UtmPoint {
    northing: f64,
    easting: f64,
}

/// Moves along a closed path of positions at a given speed.
///
/// The path is projected into the UTM zone of its first position, so the
/// interpolation between two positions is a straight line in meters.
#[derive(Debug, Clone)]
pub struct PathWalker {
    points: Vec<UtmPoint>,
    zone: u8,
    zone_letter: char,
    segment: usize,
    offset: f64,
}

impl PathWalker {
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidData`] if `positions` is empty or a position
    /// has no UTM zone.
    pub fn new(positions: &[Position]) -> Result<Self, Error> {
        let Some(first) = positions.first() else {
            return Err(Error::new(ErrorKind::InvalidData, "path has no positions"));
        };
        let zone = lat_lon_to_zone_number(first.latitude, first.longitude);
        let zone_letter = lat_to_zone_letter(first.latitude).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidData,
                format!(
                    "Position lat: {}, lon: {} can't be converted to a UTM zone",
                    first.latitude, first.longitude
                ),
            )
        })?;
        let points = positions
            .iter()
            .map(|pos| {
                if !pos.is_valid() {
                    return Err(Error::new(
                        ErrorKind::InvalidData,
                        format!("Invalid path position {pos:?}"),
                    ));
                }
                let (northing, easting, _) = to_utm_wgs84(pos.latitude, pos.longitude, zone);
                Ok(UtmPoint { northing, easting })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(PathWalker {
            points,
            zone,
            zone_letter,
            segment: 0,
            offset: 0.0,
        })
    }

    /// Advances `distance` meters along the path and returns the new position.
    ///
    /// After the last position the walk continues at the first one.
    pub fn advance(&mut self, distance: f64) -> Option<Position> {
        let count = self.points.len();
        let perimeter: f64 = (0..count).map(|segment| self.segment_length(segment)).sum();
        if perimeter <= 0.0 {
            return self.position();
        }
        self.offset = (self.offset + distance.max(0.0)) % perimeter;
        for _ in 0..count {
            let length = self.segment_length(self.segment);
            if self.offset < length {
                break;
            }
            self.offset -= length;
            self.segment = (self.segment + 1) % count;
        }
        self.position()
    }

    /// The current position on the path.
    pub fn position(&self) -> Option<Position> {
        let (from, to) = self.segment_points(self.segment);
        let length = self.segment_length(self.segment);
        let ratio = if length > 0.0 {
            (self.offset / length).min(1.0)
        } else {
            0.0
        };
        let easting = from.easting + (to.easting - from.easting) * ratio;
        let northing = from.northing + (to.northing - from.northing) * ratio;
        wsg84_utm_to_lat_lon(easting, northing, self.zone, self.zone_letter)
            .ok()
            .map(|(latitude, longitude)| Position {
                latitude,
                longitude,
            })
    }

    fn segment_points(&self, segment: usize) -> (UtmPoint, UtmPoint) {
        let next = (segment + 1) % self.points.len();
        (self.points[segment], self.points[next])
    }

    fn segment_length(&self, segment: usize) -> f64 {
        let (from, to) = self.segment_points(segment);
        (to.easting - from.easting).hypot(to.northing - from.northing)
    }
}
