//! Clock Module
//!
//! Time source used for writing and checking entry expiry.

use std::time::Instant;

use chrono::Utc;

// == Clock ==
/// Produces timestamps in fractional seconds since the Unix epoch.
///
/// Chosen once when the cache is built; every `set` and every expiry check of
/// that cache instance read the same source.
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    /// Monotonic within the process. Anchored to the wall clock at creation
    /// so timestamps written by other processes stay comparable.
    Monotonic { origin: Instant, origin_secs: f64 },
    /// Plain wall-clock time. Can step backwards if the system time is adjusted.
    Wall,
}

impl Clock {
    /// Creates a monotonic clock anchored at the current wall-clock time.
    pub fn monotonic() -> Self {
        Self::Monotonic {
            origin: Instant::now(),
            origin_secs: wall_seconds(),
        }
    }

    /// Returns the current time in seconds.
    pub fn now(&self) -> f64 {
        match self {
            Self::Monotonic {
                origin,
                origin_secs,
            } => origin_secs + origin.elapsed().as_secs_f64(),
            Self::Wall => wall_seconds(),
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::monotonic()
    }
}

fn wall_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
