//! Scripted audio clock
//!
//! Stands in for the audio playback collaborator. The engine gets one clone,
//! the test keeps another and moves playback along by hand.

use std::f32::consts::TAU;
use std::sync::Arc;

use kelion_time::{AudioClock, PlaybackStatus};
use kelion_voice::{SpectrumAnalyser, SpectrumConfig};
use parking_lot::Mutex;

/// Sample source behind the analyser
enum Source {
    /// Every bin reads `energy * 255`
    Flat { energy: f32 },
    /// Real samples run through a spectrum analyser
    Pcm {
        samples: Vec<f32>,
        sample_rate: u32,
        analyser: SpectrumAnalyser,
    },
}

struct Script {
    time: f64,
    status: PlaybackStatus,
    analyser: bool,
    source: Source,
    polls: u64,
}

/// Audio clock driven by the test
#[derive(Clone)]
pub struct ScriptedAudio {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedAudio {
    /// Paused at 0 with an analyser reading silence
    pub fn new() -> Self {
        Self::from_script(Script {
            time: 0.0,
            status: PlaybackStatus::Paused,
            analyser: true,
            source: Source::Flat { energy: 0.0 },
            polls: 0,
        })
    }

    /// Clock without frequency data
    pub fn without_analyser() -> Self {
        let audio = Self::new();
        audio.inner.lock().analyser = false;
        audio
    }

    /// Clock playing back a pure tone through a real analyser
    pub fn tone(frequency: f32, amplitude: f32, sample_rate: u32, seconds: f32) -> Self {
        let count = (seconds * sample_rate as f32) as usize;
        let samples = (0..count)
            .map(|i| amplitude * (TAU * frequency * i as f32 / sample_rate as f32).sin())
            .collect();
        Self::pcm(samples, sample_rate)
    }

    /// Clock playing back the given samples through a real analyser
    pub fn pcm(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::from_script(Script {
            time: 0.0,
            status: PlaybackStatus::Paused,
            analyser: true,
            source: Source::Pcm {
                samples,
                sample_rate: sample_rate.max(1),
                analyser: SpectrumAnalyser::new(SpectrumConfig::default()),
            },
            polls: 0,
        })
    }

    fn from_script(script: Script) -> Self {
        Self {
            inner: Arc::new(Mutex::new(script)),
        }
    }

    pub fn play(&self) {
        self.inner.lock().status = PlaybackStatus::Playing;
    }

    pub fn pause(&self) {
        self.inner.lock().status = PlaybackStatus::Paused;
    }

    pub fn end(&self) {
        self.inner.lock().status = PlaybackStatus::Ended;
    }

    pub fn seek(&self, time: f64) {
        self.inner.lock().time = time;
    }

    /// Move the position forward if playing
    pub fn advance(&self, dt: f64) {
        let mut script = self.inner.lock();
        if script.status == PlaybackStatus::Playing {
            script.time += dt;
        }
    }

    /// Flat energy level in `[0, 1]`; replaces a PCM source
    pub fn set_energy(&self, energy: f32) {
        self.inner.lock().source = Source::Flat {
            energy: energy.clamp(0.0, 1.0),
        };
    }

    pub fn time(&self) -> f64 {
        self.inner.lock().time
    }

    pub fn playback(&self) -> PlaybackStatus {
        self.inner.lock().status
    }

    /// How often the engine asked for frequency data
    pub fn polls(&self) -> u64 {
        self.inner.lock().polls
    }

    /// Boxed clone for [`kelion_runtime::AvatarEngine::attach_audio`]
    pub fn boxed(&self) -> Box<dyn AudioClock> {
        Box::new(self.clone())
    }
}

impl Default for ScriptedAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for ScriptedAudio {
    fn current_time(&self) -> f64 {
        self.inner.lock().time
    }

    fn paused(&self) -> bool {
        self.inner.lock().status == PlaybackStatus::Paused
    }

    fn ended(&self) -> bool {
        self.inner.lock().status == PlaybackStatus::Ended
    }

    fn frequency_data(&mut self, bins: &mut [u8]) -> bool {
        let mut script = self.inner.lock();
        if !script.analyser {
            return false;
        }
        script.polls += 1;

        let time = script.time;
        match &mut script.source {
            Source::Flat { energy } => {
                let byte = (*energy * 255.0) as u8;
                bins.iter_mut().for_each(|b| *b = byte);
            }
            Source::Pcm {
                samples,
                sample_rate,
                analyser,
            } => {
                let end = ((time.max(0.0) * f64::from(*sample_rate)) as usize).min(samples.len());
                analyser.process(&samples[..end], bins);
            }
        }
        true
    }

    fn has_analyser(&self) -> bool {
        self.inner.lock().analyser
    }
}
