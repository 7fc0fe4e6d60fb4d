//! Time primitives for the presence engine
//!
//! The engine keeps its own monotonic timeline, advanced only by the frame
//! deltas handed to the scheduler. Wall-clock time never leaks into the
//! animation math, which keeps every tick sequence reproducible.

use std::ops::{Add, Sub};
use std::time::Duration;

/// Engine time - monotonic, advanced by frame deltas
/// Represented as microseconds since engine construction
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EngineTime(pub u64);

impl EngineTime {
    pub const ZERO: EngineTime = EngineTime(0);

    #[inline]
    pub fn from_micros(micros: u64) -> Self {
        EngineTime(micros)
    }

    #[inline]
    pub fn from_millis(millis: u64) -> Self {
        EngineTime(millis * 1000)
    }

    #[inline]
    pub fn from_secs_f64(secs: f64) -> Self {
        EngineTime((secs.max(0.0) * 1_000_000.0) as u64)
    }

    #[inline]
    pub fn as_micros(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn as_millis(self) -> u64 {
        self.0 / 1000
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        EngineTime(self.0.saturating_add(duration.as_micros() as u64))
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future
    #[inline]
    pub fn since(self, earlier: EngineTime) -> Duration {
        self - earlier
    }
}

impl Add<Duration> for EngineTime {
    type Output = EngineTime;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sub<EngineTime> for EngineTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: EngineTime) -> Self::Output {
        Duration::from_micros(self.0.saturating_sub(rhs.0))
    }
}

impl std::fmt::Debug for EngineTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "τe({:.3}ms)", self.0 as f64 / 1000.0)
    }
}
