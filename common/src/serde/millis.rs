use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Converts milliseconds into a [`Duration`].
///
/// Negative and non finite values map to [`Duration::ZERO`]. The conversion goes
/// through whole microseconds so integral millisecond values stay exact.
pub fn to_duration(ms: f64) -> Duration {
    if !ms.is_finite() || ms <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_micros((ms * 1000.0).round() as u64)
}

/// Converts a [`Duration`] into fractional milliseconds.
pub fn from_duration(duration: &Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Serialize a `Duration` as a plain millisecond number, e.g. `15000`.
pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(from_duration(duration))
}

/// Deserialize a millisecond number into a `Duration`.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = f64::deserialize(deserializer)?;
    Ok(to_duration(ms))
}
