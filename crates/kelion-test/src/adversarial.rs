//! Adversarial input generator
//!
//! Produces the kind of input a misbehaving host sends: state churn,
//! unknown names, malformed timelines, audio events out of order and frame
//! deltas with stalls. Everything is drawn from a seeded `StdRng` so a
//! failing run can be replayed.

use std::time::Duration;

use kelion_core::{Emotion, Focus, PresenceKind, Viseme};
use kelion_runtime::AvatarEngine;
use kelion_voice::VisemeEntry;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::ScriptedAudio;

/// Frame delta distribution
#[derive(Clone, Debug)]
pub enum DeltaDistribution {
    /// Constant delta
    Fixed(Duration),
    /// Uniform between min and max milliseconds
    Uniform { min_ms: u64, max_ms: u64 },
    /// Mostly `base_ms`, occasionally a stall of up to `stall_ms`
    Stalling {
        base_ms: u64,
        stall_prob: f64,
        stall_ms: u64,
    },
}

impl DeltaDistribution {
    pub fn sample(&self, rng: &mut StdRng) -> Duration {
        match self {
            DeltaDistribution::Fixed(dt) => *dt,
            DeltaDistribution::Uniform { min_ms, max_ms } => {
                let dist = Uniform::new_inclusive(*min_ms, (*max_ms).max(*min_ms));
                Duration::from_millis(dist.sample(rng))
            }
            DeltaDistribution::Stalling {
                base_ms,
                stall_prob,
                stall_ms,
            } => {
                if rng.gen_bool(stall_prob.clamp(0.0, 1.0)) {
                    Duration::from_millis(rng.gen_range(*base_ms..=(*stall_ms).max(*base_ms)))
                } else {
                    Duration::from_millis(*base_ms)
                }
            }
        }
    }
}

/// Generator configuration
#[derive(Clone, Debug)]
pub struct AdversarialConfig {
    pub delta: DeltaDistribution,
    /// Chance per frame of some host event
    pub event_prob: f64,
    /// Chance that a generated name or timeline is invalid
    pub invalid_prob: f64,
    /// Upper bound on generated timeline length
    pub max_timeline_len: usize,
}

impl Default for AdversarialConfig {
    fn default() -> Self {
        Self {
            delta: DeltaDistribution::Uniform {
                min_ms: 8,
                max_ms: 33,
            },
            event_prob: 0.1,
            invalid_prob: 0.2,
            max_timeline_len: 12,
        }
    }
}

impl AdversarialConfig {
    /// Well-behaved host at 60 fps
    pub fn calm() -> Self {
        Self {
            delta: DeltaDistribution::Fixed(Duration::from_micros(16_667)),
            event_prob: 0.02,
            invalid_prob: 0.0,
            max_timeline_len: 8,
        }
    }

    /// Event storms, garbage input and frame stalls
    pub fn hostile() -> Self {
        Self {
            delta: DeltaDistribution::Stalling {
                base_ms: 16,
                stall_prob: 0.05,
                stall_ms: 2_000,
            },
            event_prob: 0.5,
            invalid_prob: 0.4,
            max_timeline_len: 32,
        }
    }
}

/// One host event
#[derive(Clone, Debug)]
pub enum HostEvent {
    SetState { state: String, emotion: Option<String> },
    SetFocus(Focus),
    SetTimeline(Vec<VisemeEntry>),
    ClearTimeline,
    AudioPlay,
    AudioEnded,
    Seek(f64),
    Energy(f32),
    ResetMouth,
}

const GARBAGE_NAMES: &[&str] = &["", "dancing", "idle_", "speak!", "\u{0}", "listen ing"];

/// Seeded input generator
pub struct AdversarialInputs {
    config: AdversarialConfig,
    rng: StdRng,
    generated: u64,
}

impl AdversarialInputs {
    pub fn new(config: AdversarialConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            generated: 0,
        }
    }

    pub fn next_delta(&mut self) -> Duration {
        self.config.delta.sample(&mut self.rng)
    }

    /// A state name, sometimes an invalid one
    pub fn next_state_name(&mut self) -> String {
        if self.rng.gen_bool(self.config.invalid_prob) {
            return GARBAGE_NAMES
                .choose(&mut self.rng)
                .copied()
                .unwrap_or_default()
                .to_string();
        }
        let state = self.next_state();
        // Aliases and case variants parse too
        match (state, self.rng.gen_range(0..3)) {
            (PresenceKind::Speaking, 0) => "speak".to_string(),
            (s, 1) => s.as_str().to_uppercase(),
            (s, _) => s.as_str().to_string(),
        }
    }

    pub fn next_state(&mut self) -> PresenceKind {
        PresenceKind::all()
            .choose(&mut self.rng)
            .copied()
            .unwrap_or_default()
    }

    pub fn next_emotion(&mut self) -> Option<String> {
        if self.rng.gen_bool(0.5) {
            return None;
        }
        if self.rng.gen_bool(self.config.invalid_prob) {
            return Some("furious-ish".to_string());
        }
        Emotion::all()
            .choose(&mut self.rng)
            .map(|e| e.as_str().to_string())
    }

    /// A timeline, well-formed or broken in one of several ways
    pub fn next_timeline(&mut self) -> Vec<VisemeEntry> {
        let len = self.rng.gen_range(0..=self.config.max_timeline_len);
        let mut t = self.rng.gen_range(0.0..0.5);
        let mut entries = Vec::with_capacity(len);
        for _ in 0..len {
            let viseme = Viseme::all()
                .choose(&mut self.rng)
                .copied()
                .unwrap_or_default();
            let d = self.rng.gen_range(0.02..0.4);
            entries.push(VisemeEntry::new(viseme, t, t + d));
            t += d + self.rng.gen_range(0.0..0.1);
        }

        if !entries.is_empty() && self.rng.gen_bool(self.config.invalid_prob) {
            let i = self.rng.gen_range(0..entries.len());
            match self.rng.gen_range(0..4) {
                0 => entries[i].t1 = entries[i].t0 - 0.1,
                1 => entries[i].t0 = f64::NAN,
                2 => entries[i].t0 = -1.0,
                _ => entries.reverse(),
            }
        }
        entries
    }

    /// An event, or none this frame
    pub fn next_event(&mut self) -> Option<HostEvent> {
        if !self.rng.gen_bool(self.config.event_prob) {
            return None;
        }
        self.generated += 1;
        let event = match self.rng.gen_range(0..9) {
            0 | 1 => HostEvent::SetState {
                state: self.next_state_name(),
                emotion: self.next_emotion(),
            },
            2 => HostEvent::SetFocus(
                [Focus::User, Focus::Screen, Focus::Away]
                    .choose(&mut self.rng)
                    .copied()
                    .unwrap_or_default(),
            ),
            3 => HostEvent::SetTimeline(self.next_timeline()),
            4 => HostEvent::ClearTimeline,
            5 => HostEvent::AudioPlay,
            6 => HostEvent::AudioEnded,
            7 => HostEvent::Seek(self.rng.gen_range(-1.0..5.0)),
            _ if self.rng.gen_bool(0.5) => HostEvent::Energy(self.rng.gen_range(0.0..1.0)),
            _ => HostEvent::ResetMouth,
        };
        Some(event)
    }

    /// Events generated so far
    pub fn generated(&self) -> u64 {
        self.generated
    }

    /// Apply an event. Boundary errors are expected and swallowed; returns
    /// whether the call was accepted.
    pub fn apply(event: &HostEvent, engine: &mut AvatarEngine, audio: &ScriptedAudio) -> bool {
        match event {
            HostEvent::SetState { state, emotion } => {
                engine.set_state_named(state, emotion.as_deref()).is_ok()
            }
            HostEvent::SetFocus(focus) => {
                engine.set_focus(*focus);
                true
            }
            HostEvent::SetTimeline(entries) => engine.set_viseme_timeline(entries.clone()).is_ok(),
            HostEvent::ClearTimeline => {
                engine.clear_timeline();
                true
            }
            HostEvent::AudioPlay => {
                if !engine.has_audio() {
                    audio.seek(0.0);
                    engine.attach_audio(audio.boxed());
                }
                audio.play();
                engine.on_audio_play();
                true
            }
            HostEvent::AudioEnded => {
                audio.end();
                engine.on_audio_ended();
                true
            }
            HostEvent::Seek(t) => {
                audio.seek(*t);
                true
            }
            HostEvent::Energy(e) => {
                audio.set_energy(*e);
                true
            }
            HostEvent::ResetMouth => {
                engine.reset_mouth();
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_inputs() {
        let mut a = AdversarialInputs::new(AdversarialConfig::hostile(), 42);
        let mut b = AdversarialInputs::new(AdversarialConfig::hostile(), 42);
        for _ in 0..200 {
            assert_eq!(a.next_delta(), b.next_delta());
            assert_eq!(
                format!("{:?}", a.next_event()),
                format!("{:?}", b.next_event())
            );
        }
    }

    #[test]
    fn test_delta_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let dist = DeltaDistribution::Uniform {
            min_ms: 8,
            max_ms: 33,
        };
        for _ in 0..500 {
            let dt = dist.sample(&mut rng);
            assert!(dt >= Duration::from_millis(8) && dt <= Duration::from_millis(33));
        }
    }

    #[test]
    fn test_stalls_happen() {
        let mut rng = StdRng::seed_from_u64(7);
        let dist = DeltaDistribution::Stalling {
            base_ms: 16,
            stall_prob: 0.2,
            stall_ms: 1_000,
        };
        let longest = (0..500).map(|_| dist.sample(&mut rng)).max().unwrap();
        assert!(longest > Duration::from_millis(100));
    }

    #[test]
    fn test_calm_timelines_valid() {
        let mut inputs = AdversarialInputs::new(AdversarialConfig::calm(), 3);
        for _ in 0..100 {
            let entries = inputs.next_timeline();
            assert!(kelion_voice::VisemeTimeline::new(entries).is_ok());
        }
    }

    #[test]
    fn test_calm_names_parse() {
        let mut inputs = AdversarialInputs::new(AdversarialConfig::calm(), 3);
        for _ in 0..100 {
            let name = inputs.next_state_name();
            assert!(name.parse::<PresenceKind>().is_ok(), "{:?}", name);
        }
    }

    #[test]
    fn test_hostile_produces_rejections() {
        let mut inputs = AdversarialInputs::new(AdversarialConfig::hostile(), 11);
        let mut engine = AvatarEngine::standard();
        let audio = ScriptedAudio::new();
        let mut rejected = 0;
        for _ in 0..500 {
            if let Some(event) = inputs.next_event() {
                if !AdversarialInputs::apply(&event, &mut engine, &audio) {
                    rejected += 1;
                }
            }
        }
        assert!(inputs.generated() > 100);
        assert!(rejected > 0);
    }
}
