//! Wall-clock source for request timestamps.

use crate::envelope::TimeStamp;

/// Source of the timestamp stamped onto each accepted submission.
pub trait Clock: Send + Sync {
    fn now(&self) -> TimeStamp;
}

/// The system clock, with microsecond resolution.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimeStamp {
        let micros = chrono::Utc::now().timestamp_micros();
        TimeStamp::from_secs(micros as f64 / 1_000_000.0)
    }
}

/// A clock that always reports the same instant. Used to provoke timestamp collisions.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub TimeStamp);

impl FixedClock {
    pub fn at(secs: f64) -> Self {
        Self(TimeStamp::from_secs(secs))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> TimeStamp {
        self.0
    }
}
