//! Simulated time
//!
//! The engine never reads a wall clock. Every handler is told the current
//! time by its driver, which keeps runs deterministic and lets the emulator
//! advance time in jumps.

use std::fmt;
use std::ops::{Add, Sub};
use std::time::Duration;

/// A point in simulated time, measured from the start of the run
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// The start of the run
    pub const ZERO: Timestamp = Timestamp(Duration::ZERO);

    /// Timestamp `offset` after the start of the run
    #[inline]
    pub const fn from_offset(offset: Duration) -> Self {
        Timestamp(offset)
    }

    /// Offset from the start of the run
    #[inline]
    pub fn offset(&self) -> Duration {
        self.0
    }

    /// Offset from the start of the run in (fractional) milliseconds
    #[inline]
    pub fn as_millis_f64(&self) -> f64 {
        self.0.as_secs_f64() * 1_000.0
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future
    #[inline]
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({:.3}ms)", self.as_millis_f64())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.as_millis_f64())
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, duration: Duration) -> Timestamp {
        Timestamp(self.0 + duration)
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    fn sub(self, other: Timestamp) -> Duration {
        self.duration_since(other)
    }
}
