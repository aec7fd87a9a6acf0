use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock timestamps, in seconds since the Unix epoch.
pub trait Clock: Send {
    fn now(&self) -> f64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }
}
