//! Sync Monitor - last line of defence for the frame output
//!
//! Runs after every other subsystem. Whatever the smoothing, blending and
//! audio paths produced, the frame that leaves the engine has bounded
//! morph weights and head angles. Nothing here can fail; every repair is
//! reported as a [`SyncCorrection`].

use std::fmt;

use kelion_core::Viseme;
use kelion_visual::{ChannelId, MorphRig, Orientation, MOUTH_CHANNELS};
use serde::{Deserialize, Serialize};

/// Sync monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Lowest morph weight left alone
    pub min_weight: f32,
    /// Highest morph weight left alone
    pub max_weight: f32,
    /// Mouth channels above this decay while the mouth has no driver
    pub mouth_threshold: f32,
    /// Per-tick decay factor for undriven mouth channels
    pub mouth_decay: f32,
    /// Pitch limit, radians
    pub max_pitch: f32,
    /// Roll limit, radians
    pub max_roll: f32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            min_weight: -0.1,
            max_weight: 1.5,
            mouth_threshold: 0.15,
            mouth_decay: 0.85,
            max_pitch: 0.5,
            max_roll: 0.3,
        }
    }
}

/// What a correction was applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CorrectionTarget {
    /// Morph channel, by slot index
    Channel(usize),
    Yaw,
    Pitch,
    Roll,
}

impl fmt::Display for CorrectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrectionTarget::Channel(i) => write!(f, "channel#{}", i),
            CorrectionTarget::Yaw => f.write_str("yaw"),
            CorrectionTarget::Pitch => f.write_str("pitch"),
            CorrectionTarget::Roll => f.write_str("roll"),
        }
    }
}

/// Why a value was corrected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CorrectionKind {
    /// NaN or outside the weight bounds; reset to 0
    OutOfRange,
    /// Mouth left open without a driver; decayed
    MouthDecay,
    /// Head angle beyond its limit (or non-finite); clamped
    AngleClamp,
}

/// One repair made by the sync monitor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncCorrection {
    pub target: CorrectionTarget,
    pub kind: CorrectionKind,
    pub old: f32,
    pub new: f32,
}

/// Sync monitor
#[derive(Debug)]
pub struct SyncMonitor {
    config: SyncConfig,
    /// Mouth-open-class channels: generic mouth channels and open visemes
    mouth: Vec<ChannelId>,
    corrections: Vec<SyncCorrection>,
    total: u64,
}

impl SyncMonitor {
    pub fn new(config: SyncConfig, rig: &MorphRig) -> Self {
        let mut mouth = rig.resolve_all(MOUTH_CHANNELS.iter().copied());
        mouth.extend(
            Viseme::all()
                .iter()
                .filter(|v| v.is_open_mouth())
                .filter_map(|v| rig.channel(v.channel_name())),
        );

        Self {
            config,
            mouth,
            corrections: Vec::new(),
            total: 0,
        }
    }

    /// Repair the frame in place.
    ///
    /// `mouth_undriven` is true when the avatar is not speaking and no
    /// analyser is attached; only then do open mouth channels decay.
    /// Returns the corrections made this tick.
    pub fn run(
        &mut self,
        rig: &mut MorphRig,
        pose: &mut Orientation,
        mouth_undriven: bool,
    ) -> &[SyncCorrection] {
        self.corrections.clear();
        let config = &self.config;

        for (slot, weight) in rig.weights_mut().iter_mut().enumerate() {
            if weight.is_nan() || *weight < config.min_weight || *weight > config.max_weight {
                self.corrections.push(SyncCorrection {
                    target: CorrectionTarget::Channel(slot),
                    kind: CorrectionKind::OutOfRange,
                    old: *weight,
                    new: 0.0,
                });
                *weight = 0.0;
            }
        }

        if mouth_undriven {
            for id in &self.mouth {
                let old = rig.get(*id);
                if old > config.mouth_threshold {
                    let new = old * config.mouth_decay;
                    rig.set(*id, new);
                    self.corrections.push(SyncCorrection {
                        target: CorrectionTarget::Channel(id.index()),
                        kind: CorrectionKind::MouthDecay,
                        old,
                        new,
                    });
                }
            }
        }

        let angles = [
            (CorrectionTarget::Yaw, &mut pose.yaw, f32::INFINITY),
            (CorrectionTarget::Pitch, &mut pose.pitch, config.max_pitch),
            (CorrectionTarget::Roll, &mut pose.roll, config.max_roll),
        ];
        for (target, angle, limit) in angles {
            let old = *angle;
            let new = if old.is_finite() {
                old.max(-limit).min(limit)
            } else {
                0.0
            };
            if new != old {
                *angle = new;
                self.corrections.push(SyncCorrection {
                    target,
                    kind: CorrectionKind::AngleClamp,
                    old,
                    new,
                });
            }
        }

        for c in &self.corrections {
            match c.kind {
                CorrectionKind::MouthDecay => {
                    tracing::trace!(target_value = %c.target, old = c.old, new = c.new, "mouth decay")
                }
                _ => tracing::warn!(
                    target_value = %c.target,
                    kind = ?c.kind,
                    old = c.old,
                    new = c.new,
                    "sync correction"
                ),
            }
        }

        self.total += self.corrections.len() as u64;
        &self.corrections
    }

    /// Corrections made since construction
    pub fn total_corrections(&self) -> u64 {
        self.total
    }

    pub fn mouth_channels(&self) -> &[ChannelId] {
        &self.mouth
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }
}
