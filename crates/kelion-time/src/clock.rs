//! Frame clock for the animation loop

use std::time::{Duration, Instant};

use kelion_core::EngineTime;

/// Largest delta a single frame may report
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(100);

/// Frame clock - monotonic, clamped, wall-clock driven
/// INVARIANT: engine time MUST be monotonically increasing, NEVER jumps
pub struct FrameClock {
    /// Accumulated engine time
    value: EngineTime,
    /// Last update instant
    last_update: Instant,
    /// Upper bound on a single delta
    max_delta: Duration,
    /// Delta reported by the last tick
    last_delta: Duration,
}

impl FrameClock {
    /// Create a new frame clock starting at zero
    pub fn new() -> Self {
        Self::with_max_delta(MAX_FRAME_DELTA)
    }

    pub fn with_max_delta(max_delta: Duration) -> Self {
        FrameClock {
            value: EngineTime::ZERO,
            last_update: Instant::now(),
            max_delta,
            last_delta: Duration::ZERO,
        }
    }

    /// Advance the clock based on elapsed real time.
    /// Returns the clamped delta for this frame.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update);

        // Clamp to prevent large jumps (tab switch, system sleep, debugger)
        let clamped = elapsed.min(self.max_delta);

        self.value = self.value.saturating_add(clamped);
        self.last_update = now;
        self.last_delta = clamped;
        clamped
    }

    /// Get current engine time without advancing
    pub fn now(&self) -> EngineTime {
        self.value
    }

    /// Delta reported by the most recent tick
    pub fn last_delta(&self) -> Duration {
        self.last_delta
    }

    /// Forget the time spent paused, so the next tick starts from now
    pub fn resume(&mut self) {
        self.last_update = Instant::now();
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Clamp an externally supplied frame delta to the range the engine accepts
#[inline]
pub fn sanitize_delta(dt: Duration, max_delta: Duration) -> Duration {
    dt.min(max_delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_clock_monotonic() {
        let mut clock = FrameClock::new();

        clock.tick();
        let t1 = clock.now();
        std::thread::sleep(Duration::from_millis(10));
        clock.tick();
        let t2 = clock.now();

        assert!(t2 > t1);
    }

    #[test]
    fn test_frame_clock_clamps_stall() {
        let mut clock = FrameClock::with_max_delta(Duration::from_millis(5));

        std::thread::sleep(Duration::from_millis(20));
        let dt = clock.tick();

        assert_eq!(dt, Duration::from_millis(5));
        assert_eq!(clock.last_delta(), Duration::from_millis(5));
    }

    #[test]
    fn test_sanitize_delta() {
        let max = Duration::from_millis(100);
        assert_eq!(sanitize_delta(Duration::from_secs(3), max), max);
        assert_eq!(
            sanitize_delta(Duration::from_millis(16), max),
            Duration::from_millis(16)
        );
    }
}
