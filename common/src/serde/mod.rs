pub mod millis;
pub mod optional_millis;
