use super::millis;
use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Serialize an `Option<Duration>` as milliseconds or `null`.
pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match duration {
        Some(duration) => serializer.serialize_some(&millis::from_duration(duration)),
        None => serializer.serialize_none(),
    }
}

/// Deserialize a millisecond number or `null` into an `Option<Duration>`.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = Option::<f64>::deserialize(deserializer)?;
    Ok(ms.map(millis::to_duration))
}
