//! Viseme Timeline Player
//!
//! Plays a [`VisemeTimeline`] against the audio clock. The cursor only ever
//! moves forward; a clock that jumps back shows rest until it catches up
//! with the cursor again.

use kelion_core::Viseme;
use kelion_visual::{ChannelId, MorphRig};
use serde::{Deserialize, Serialize};

use crate::VisemeTimeline;

/// Player configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Weight of the active viseme channel
    pub active_intensity: f32,
    /// Weight of the rest channel between visemes
    pub rest_intensity: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            active_intensity: 0.95,
            rest_intensity: 0.2,
        }
    }
}

/// The viseme channels of one rig, indexed by [`Viseme::index`]
#[derive(Debug, Clone)]
pub struct VisemeChannels {
    slots: Vec<Option<ChannelId>>,
}

impl VisemeChannels {
    pub fn resolve(rig: &MorphRig) -> Self {
        Self {
            slots: Viseme::all()
                .iter()
                .map(|v| rig.channel(v.channel_name()))
                .collect(),
        }
    }

    pub fn channel(&self, viseme: Viseme) -> Option<ChannelId> {
        self.slots.get(viseme.index()).copied().flatten()
    }

    /// Show exactly one viseme: `viseme` at `intensity`, every other viseme
    /// channel at 0. Rest is always shown at `rest_intensity`.
    pub fn show(&self, viseme: Viseme, intensity: f32, rest_intensity: f32, rig: &mut MorphRig) {
        let weight = if viseme == Viseme::Rest {
            rest_intensity
        } else {
            intensity
        };
        for (v, slot) in Viseme::all().iter().zip(&self.slots) {
            if let Some(id) = slot {
                rig.set(*id, if *v == viseme { weight } else { 0.0 });
            }
        }
    }

    /// Show the rest viseme
    pub fn rest(&self, rest_intensity: f32, rig: &mut MorphRig) {
        self.show(Viseme::Rest, 0.0, rest_intensity, rig);
    }

    /// Viseme channels present on the rig
    pub fn iter(&self) -> impl Iterator<Item = (Viseme, ChannelId)> + '_ {
        Viseme::all()
            .iter()
            .zip(&self.slots)
            .filter_map(|(v, slot)| slot.map(|id| (*v, id)))
    }
}

/// Viseme timeline player
#[derive(Debug)]
pub struct VisemePlayer {
    config: PlayerConfig,
    channels: VisemeChannels,
    timeline: VisemeTimeline,
    cursor: usize,
    shown: Option<Viseme>,
}

impl VisemePlayer {
    pub fn new(config: PlayerConfig, rig: &MorphRig) -> Self {
        Self {
            config,
            channels: VisemeChannels::resolve(rig),
            timeline: VisemeTimeline::empty(),
            cursor: 0,
            shown: None,
        }
    }

    /// Replace the timeline and rewind the cursor
    pub fn set_timeline(&mut self, timeline: VisemeTimeline) {
        tracing::debug!(
            entries = timeline.len(),
            end = ?timeline.end(),
            "viseme timeline replaced"
        );
        self.timeline = timeline;
        self.cursor = 0;
        self.shown = None;
    }

    /// Drop the timeline
    pub fn clear(&mut self) {
        self.set_timeline(VisemeTimeline::empty());
    }

    pub fn timeline(&self) -> &VisemeTimeline {
        &self.timeline
    }

    pub fn has_timeline(&self) -> bool {
        !self.timeline.is_empty()
    }

    /// Index of the entry the player is on
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Viseme shown on the last claimed frame
    pub fn shown(&self) -> Option<Viseme> {
        self.shown
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Drive the viseme channels for clock position `clock`.
    ///
    /// Returns whether the player claimed the mouth this frame: it does
    /// whenever a timeline is attached and the clock is a valid position.
    pub fn tick(&mut self, clock: Option<f64>, rig: &mut MorphRig) -> bool {
        let entries = self.timeline.entries();
        if entries.is_empty() {
            return false;
        }
        let t = match clock {
            Some(t) if t.is_finite() && t >= 0.0 => t,
            _ => return false,
        };

        let last = entries.len() - 1;
        while self.cursor < last && t > entries[self.cursor].t1 {
            self.cursor += 1;
        }

        let entry = &entries[self.cursor];
        let viseme = if entry.contains(t) {
            entry.viseme
        } else {
            Viseme::Rest
        };

        self.channels.show(
            viseme,
            self.config.active_intensity,
            self.config.rest_intensity,
            rig,
        );
        self.shown = Some(viseme);
        true
    }
}
