//! Phase accumulators for slow periodic motion

use std::f32::consts::TAU;

/// A phase advanced by `dt` at a fixed frequency, kept in `[0, 2π)`
#[derive(Debug, Clone, Copy, Default)]
pub struct Phase {
    /// Current phase in radians
    value: f32,
    /// Frequency in Hz
    frequency: f32,
}

impl Phase {
    pub fn new(frequency: f32) -> Self {
        Self {
            value: 0.0,
            frequency,
        }
    }

    /// Start from a given phase offset
    pub fn with_offset(mut self, offset: f32) -> Self {
        self.value = offset.rem_euclid(TAU);
        self
    }

    /// Advance by `dt` seconds, scaled by `rate` (1.0 = nominal frequency)
    #[inline]
    pub fn advance(&mut self, dt: f32, rate: f32) -> f32 {
        self.value = (self.value + dt * self.frequency * rate * TAU).rem_euclid(TAU);
        self.value
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    #[inline]
    pub fn sin(&self) -> f32 {
        self.value.sin()
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}
