/// A source of "now" in milliseconds.
///
/// The telemetry core takes its time from the samples. The clock is only asked
/// when a sample arrives without a usable timestamp or when an operator action
/// happens before the first sample.
pub trait Clock {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> f64;
}

/// A [`Clock`] implementation backed by the UTC wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        SystemClock
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        chrono::Utc::now().timestamp_millis() as f64
    }
}
