//! Smoothing primitives shared by every animation subsystem

use std::f32::consts::{PI, TAU};

/// Frame-rate aware exponential approach.
///
/// `current += (target - current) * dt * gain`, with the step factor capped
/// at 1 so a long frame lands on the target instead of overshooting it.
#[inline]
pub fn approach(current: f32, target: f32, dt: f32, gain: f32) -> f32 {
    let factor = (dt * gain).clamp(0.0, 1.0);
    current + (target - current) * factor
}

/// Fixed-factor blend, applied once per tick.
///
/// Deliberately unclamped: a factor outside `[0, 1]` overshoots, and the
/// sync monitor is responsible for repairing whatever that produces.
#[inline]
pub fn blend(current: f32, target: f32, factor: f32) -> f32 {
    current + (target - current) * factor
}

/// Wrap an angle into `[-π, π)`
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// Signed shortest rotation from `from` to `to`
#[inline]
pub fn angle_delta(from: f32, to: f32) -> f32 {
    wrap_angle(to - from)
}

/// Replace non-finite values with `fallback`
#[inline]
pub fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}
