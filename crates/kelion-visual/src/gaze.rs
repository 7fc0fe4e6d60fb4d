//! Gaze & Blink generator
//!
//! Two independent timers, both advanced by the frame delta:
//! - blink: closes the eyelids for a short moment at random intervals
//! - saccade: picks a new small look-offset target at random intervals
//!
//! Neither timer is ever paused. Even when the head is frozen while
//! listening, the eyes keep moving, which is what keeps the avatar alive.

use std::time::Duration;

use kelion_core::approach;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{ChannelId, MorphRig, BLINK_CHANNELS};

/// Blink timer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    /// Shortest interval between blinks, seconds
    pub interval_min: f32,
    /// Longest interval between blinks, seconds (exclusive)
    pub interval_max: f32,
    /// How long the eyes stay closed
    #[serde(with = "kelion_core::duration")]
    pub duration: Duration,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            interval_min: 2.0,
            interval_max: 6.0,
            duration: Duration::from_millis(90),
        }
    }
}

/// Saccade / gaze smoothing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeConfig {
    /// Shortest interval between saccades, seconds
    pub saccade_min: f32,
    /// Longest interval between saccades, seconds (exclusive)
    pub saccade_max: f32,
    /// Half-width of the target box when focused or listening
    pub focused_range: f32,
    /// Half-width of the target box otherwise
    pub wander_range: f32,
    /// Vertical range relative to horizontal
    pub vertical_ratio: f32,
    /// Exponential smoothing gain toward the target
    pub gain: f32,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            saccade_min: 0.5,
            saccade_max: 3.0,
            focused_range: 0.03,
            wander_range: 0.15,
            vertical_ratio: 0.5,
            gain: 8.0,
        }
    }
}

/// Current and target look offset
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GazeState {
    /// Current horizontal / vertical offset
    pub current: [f32; 2],
    /// Target the current offset approaches
    pub target: [f32; 2],
}

/// Gaze output for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GazeOutput {
    /// Left eye look offset (x, y)
    pub left: [f32; 2],
    /// Right eye look offset (x, y)
    pub right: [f32; 2],
    /// Eyelid closure (0.0 = open, 1.0 = closed)
    pub blink: f32,
}

/// Draw uniformly from `[min, max)`, falling back to `min` for an empty
/// range
fn sample_range(rng: &mut StdRng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

/// Blink timer
#[derive(Debug, Clone)]
struct BlinkTimer {
    elapsed: f32,
    threshold: f32,
    /// Time left until the eyes reopen, while a blink is in progress
    closed_for: Option<f32>,
    count: u64,
}

/// Gaze & blink generator
#[derive(Debug)]
pub struct GazeBlinkGenerator {
    gaze_config: GazeConfig,
    blink_config: BlinkConfig,
    rng: StdRng,
    blink: BlinkTimer,
    saccade_elapsed: f32,
    saccade_threshold: f32,
    saccades: u64,
    state: GazeState,
    lid_channels: Vec<ChannelId>,
}

impl GazeBlinkGenerator {
    /// Create a generator bound to `rig`.
    ///
    /// With a seed the blink / saccade schedule is reproducible.
    pub fn new(
        gaze_config: GazeConfig,
        blink_config: BlinkConfig,
        seed: Option<u64>,
        rig: &MorphRig,
    ) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let blink_threshold =
            sample_range(&mut rng, blink_config.interval_min, blink_config.interval_max);
        let saccade_threshold =
            sample_range(&mut rng, gaze_config.saccade_min, gaze_config.saccade_max);

        Self {
            lid_channels: rig.resolve_all(BLINK_CHANNELS.iter().copied()),
            gaze_config,
            blink_config,
            rng,
            blink: BlinkTimer {
                elapsed: 0.0,
                threshold: blink_threshold,
                closed_for: None,
                count: 0,
            },
            saccade_elapsed: 0.0,
            saccade_threshold,
            saccades: 0,
            state: GazeState::default(),
        }
    }

    /// Advance both timers by `dt` seconds and smooth the gaze.
    ///
    /// `focused` narrows the saccade target box (focused or listening).
    pub fn tick(&mut self, dt: f32, focused: bool, rig: &mut MorphRig) -> GazeOutput {
        let lid = self.tick_blink(dt);
        self.tick_saccade(dt, focused);

        for id in &self.lid_channels {
            rig.set(*id, lid);
        }

        GazeOutput {
            left: self.state.current,
            right: self.state.current,
            blink: lid,
        }
    }

    fn tick_blink(&mut self, dt: f32) -> f32 {
        // Reverse an in-progress blink first
        if let Some(remaining) = self.blink.closed_for {
            let remaining = remaining - dt;
            self.blink.closed_for = if remaining > 0.0 { Some(remaining) } else { None };
        }

        self.blink.elapsed += dt;
        if self.blink.elapsed >= self.blink.threshold {
            self.blink.elapsed = 0.0;
            self.blink.threshold = sample_range(
                &mut self.rng,
                self.blink_config.interval_min,
                self.blink_config.interval_max,
            );
            self.blink.closed_for = Some(self.blink_config.duration.as_secs_f32());
            self.blink.count += 1;
            tracing::trace!(count = self.blink.count, "blink");
        }

        if self.blink.closed_for.is_some() {
            1.0
        } else {
            0.0
        }
    }

    fn tick_saccade(&mut self, dt: f32, focused: bool) {
        self.saccade_elapsed += dt;
        if self.saccade_elapsed >= self.saccade_threshold {
            self.saccade_elapsed = 0.0;
            self.saccade_threshold = sample_range(
                &mut self.rng,
                self.gaze_config.saccade_min,
                self.gaze_config.saccade_max,
            );

            let range = if focused {
                self.gaze_config.focused_range
            } else {
                self.gaze_config.wander_range
            };
            let vertical = range * self.gaze_config.vertical_ratio;
            self.state.target = [
                sample_range(&mut self.rng, -range, range),
                sample_range(&mut self.rng, -vertical, vertical),
            ];
            self.saccades += 1;
        }

        let gain = self.gaze_config.gain;
        for axis in 0..2 {
            self.state.current[axis] =
                approach(self.state.current[axis], self.state.target[axis], dt, gain);
        }
    }

    pub fn state(&self) -> &GazeState {
        &self.state
    }

    /// Blinks started so far
    pub fn blink_count(&self) -> u64 {
        self.blink.count
    }

    /// Saccade targets drawn so far
    pub fn saccade_count(&self) -> u64 {
        self.saccades
    }

    /// Seconds until the next blink starts
    pub fn time_to_next_blink(&self) -> f32 {
        (self.blink.threshold - self.blink.elapsed).max(0.0)
    }

    pub fn is_blinking(&self) -> bool {
        self.blink.closed_for.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AvatarAsset;

    const DT: f32 = 1.0 / 60.0;

    fn generator(seed: u64) -> (GazeBlinkGenerator, MorphRig) {
        let rig = MorphRig::from_asset(&AvatarAsset::standard());
        let gen = GazeBlinkGenerator::new(
            GazeConfig::default(),
            BlinkConfig::default(),
            Some(seed),
            &rig,
        );
        (gen, rig)
    }

    #[test]
    fn test_blink_fires_within_max_interval() {
        let (mut gen, mut rig) = generator(7);
        for _ in 0..(6.1 / DT) as usize {
            gen.tick(DT, false, &mut rig);
        }
        assert!(gen.blink_count() >= 1);
    }

    #[test]
    fn test_blink_reverses_after_duration() {
        let (mut gen, mut rig) = generator(11);

        // Run until a blink starts
        let mut guard = 0;
        while !gen.is_blinking() {
            gen.tick(DT, false, &mut rig);
            guard += 1;
            assert!(guard < 1000);
        }
        assert_eq!(rig.weight("eyeBlinkLeft"), Some(1.0));

        // 90ms later the eyes are open again
        for _ in 0..6 {
            gen.tick(DT, false, &mut rig);
        }
        assert!(!gen.is_blinking());
        assert_eq!(rig.weight("eyeBlinkRight"), Some(0.0));
    }

    #[test]
    fn test_blink_intervals_in_range() {
        let (mut gen, mut rig) = generator(3);
        let mut last_start = 0.0f32;
        let mut t = 0.0f32;
        let mut count = gen.blink_count();
        for _ in 0..(60.0 / DT) as usize {
            gen.tick(DT, false, &mut rig);
            t += DT;
            if gen.blink_count() != count {
                count = gen.blink_count();
                let interval = t - last_start;
                if count > 1 {
                    assert!(interval >= 2.0 - 2.0 * DT && interval < 6.0 + 2.0 * DT);
                }
                last_start = t;
            }
        }
        assert!(count >= 10);
    }

    #[test]
    fn test_focused_saccades_are_tight() {
        let (mut gen, mut rig) = generator(5);
        for _ in 0..(30.0 / DT) as usize {
            gen.tick(DT, true, &mut rig);
            let target = gen.state().target;
            assert!(target[0].abs() <= 0.03 && target[1].abs() <= 0.015);
        }
        assert!(gen.saccade_count() >= 10);
    }

    #[test]
    fn test_gaze_smoothing_step() {
        let (mut gen, mut rig) = generator(1);
        gen.state.target = [0.1, 0.0];
        gen.saccade_elapsed = f32::MIN;
        gen.tick(DT, false, &mut rig);
        let expected = 0.1 * DT * 8.0;
        assert!((gen.state().current[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_same_seed_same_schedule() {
        let (mut a, mut rig_a) = generator(42);
        let (mut b, mut rig_b) = generator(42);
        for _ in 0..600 {
            let oa = a.tick(DT, false, &mut rig_a);
            let ob = b.tick(DT, false, &mut rig_b);
            assert_eq!(oa, ob);
        }
    }
}
