//! Audio-Amplitude Fallback
//!
//! Without a timeline the mouth follows the loudness of the playing audio:
//! the jaw and every generic mouth-open channel move with a gated and
//! smoothed energy level. When speech ends, the mouth is put back to rest
//! exactly once.

use kelion_time::{AudioClock, PlaybackStatus};
use kelion_visual::{ChannelId, MorphRig, MOUTH_CHANNELS};
use serde::{Deserialize, Serialize};

use crate::VisemeChannels;

/// Fallback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmplitudeConfig {
    /// Normalised energy below this is silence
    pub silence_threshold: f32,
    /// Weight of the previous level in the exponential smoothing
    pub smoothing: f32,
    /// Jaw rotation at full level, radians
    pub jaw_max_rotation: f32,
    /// Mouth channel weight at full level
    pub mouth_gain: f32,
    /// Number of frequency bins sampled per tick
    pub bins: usize,
    /// Rest viseme weight applied by the post-speech reset
    pub rest_intensity: f32,
}

impl Default for AmplitudeConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 0.05,
            smoothing: 0.3,
            jaw_max_rotation: 0.35,
            mouth_gain: 1.0,
            bins: 64,
            rest_intensity: 0.2,
        }
    }
}

/// Normalise byte magnitudes to `[0, 1]` and gate them.
///
/// Below `threshold` the result is 0; above it the remaining range is
/// stretched back onto `[0, 1]`.
pub fn gated_energy(bins: &[u8], threshold: f32) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u32 = bins.iter().map(|b| u32::from(*b)).sum();
    let energy = sum as f32 / (bins.len() as f32 * 255.0);

    if energy < threshold {
        0.0
    } else {
        ((energy - threshold) / (1.0 - threshold).max(f32::EPSILON)).clamp(0.0, 1.0)
    }
}

/// Audio-amplitude mouth driver
#[derive(Debug)]
pub struct AmplitudeFallback {
    config: AmplitudeConfig,
    mouth: Vec<ChannelId>,
    visemes: VisemeChannels,
    bins: Vec<u8>,
    level: f32,
    jaw_rotation: f32,
    was_speaking: bool,
    /// Mouth channels and jaw hold values this driver wrote
    owns_mouth: bool,
    resets: u64,
}

impl AmplitudeFallback {
    pub fn new(config: AmplitudeConfig, rig: &MorphRig) -> Self {
        Self {
            mouth: rig.resolve_all(MOUTH_CHANNELS.iter().copied()),
            visemes: VisemeChannels::resolve(rig),
            bins: vec![0; config.bins.max(1)],
            level: 0.0,
            jaw_rotation: 0.0,
            was_speaking: false,
            owns_mouth: false,
            resets: 0,
            config,
        }
    }

    /// Run one frame.
    ///
    /// Drives the mouth only while `speaking`, the audio is playing and the
    /// timeline left the mouth unclaimed. A speaking to not-speaking edge
    /// triggers the single post-speech reset. A timeline claiming the mouth
    /// after this driver moved it zeroes the jaw and mouth channels once.
    /// Returns whether the mouth was driven.
    pub fn tick(
        &mut self,
        speaking: bool,
        audio: Option<&mut (dyn AudioClock + 'static)>,
        timeline_claimed: bool,
        rig: &mut MorphRig,
    ) -> bool {
        if !speaking {
            if self.was_speaking {
                self.was_speaking = false;
                self.resets += 1;
                self.reset_mouth(rig);
                tracing::debug!(resets = self.resets, "post-speech mouth reset");
            }
            return false;
        }
        self.was_speaking = true;

        if timeline_claimed {
            if self.owns_mouth {
                self.release_mouth(rig);
                tracing::debug!("timeline took over mouth");
            }
            return false;
        }
        let audio = match audio {
            Some(audio) if audio.status() == PlaybackStatus::Playing => audio,
            _ => return false,
        };
        if !audio.frequency_data(&mut self.bins) {
            return false;
        }

        let energy = gated_energy(&self.bins, self.config.silence_threshold);
        let k = self.config.smoothing;
        self.level = self.level * k + energy * (1.0 - k);

        self.jaw_rotation = self.level * self.config.jaw_max_rotation;
        let weight = self.level * self.config.mouth_gain;
        for id in &self.mouth {
            rig.set(*id, weight);
        }
        self.owns_mouth = true;
        tracing::trace!(energy, level = self.level, "amplitude mouth");
        true
    }

    /// Zero what this driver wrote. Viseme channels stay with the timeline.
    fn release_mouth(&mut self, rig: &mut MorphRig) {
        self.owns_mouth = false;
        self.level = 0.0;
        self.jaw_rotation = 0.0;
        for id in &self.mouth {
            rig.set(*id, 0.0);
        }
    }

    /// Put the mouth at rest: jaw and mouth channels to 0, viseme channels
    /// to the rest pose. Calling it again changes nothing.
    pub fn reset_mouth(&mut self, rig: &mut MorphRig) {
        self.release_mouth(rig);
        self.visemes.rest(self.config.rest_intensity, rig);
    }

    /// Smoothed energy level
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Jaw bone rotation, radians
    pub fn jaw_rotation(&self) -> f32 {
        self.jaw_rotation
    }

    /// Post-speech resets performed so far
    pub fn reset_count(&self) -> u64 {
        self.resets
    }

    pub fn mouth_channels(&self) -> &[ChannelId] {
        &self.mouth
    }
}
