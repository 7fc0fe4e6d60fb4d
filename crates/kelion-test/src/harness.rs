//! Scenario harness
//!
//! Drives an [`AvatarEngine`] at a fixed frame delta, moving a scripted audio
//! clock along with it, and keeps what happened for later assertions.

use std::sync::Arc;
use std::time::Duration;

use kelion_runtime::{AvatarEngine, AvatarFrame, CorrectionKind, EngineConfig, SyncCorrection};
use kelion_visual::AvatarAsset;
use parking_lot::Mutex;

use crate::ScriptedAudio;

/// 60 fps
pub const FRAME_60: Duration = Duration::from_micros(16_667);

/// Collected sync-monitor corrections, shared with the engine's observer
#[derive(Clone, Default)]
pub struct CorrectionLog {
    entries: Arc<Mutex<Vec<SyncCorrection>>>,
}

impl CorrectionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register as the engine's correction observer
    pub fn attach(&self, engine: &mut AvatarEngine) {
        let entries = Arc::clone(&self.entries);
        engine.on_correction(move |c| entries.lock().push(*c));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn count(&self, kind: CorrectionKind) -> usize {
        self.entries.lock().iter().filter(|c| c.kind == kind).count()
    }

    pub fn snapshot(&self) -> Vec<SyncCorrection> {
        self.entries.lock().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Fixed-step engine driver
pub struct ScenarioHarness {
    engine: AvatarEngine,
    dt: Duration,
    audio: Option<ScriptedAudio>,
    log: CorrectionLog,
    record: bool,
    frames: Vec<AvatarFrame>,
    steps: u64,
}

impl ScenarioHarness {
    pub fn new(mut engine: AvatarEngine) -> Self {
        let log = CorrectionLog::new();
        log.attach(&mut engine);
        Self {
            engine,
            dt: FRAME_60,
            audio: None,
            log,
            record: false,
            frames: Vec::new(),
            steps: 0,
        }
    }

    /// Standard avatar, default configuration, fixed seed
    pub fn seeded(seed: u64) -> Self {
        Self::with_config(EngineConfig::default().with_seed(seed))
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::new(AvatarEngine::new(config, &AvatarAsset::standard()))
    }

    pub fn with_dt(mut self, dt: Duration) -> Self {
        self.dt = dt;
        self
    }

    /// Keep a copy of every frame
    pub fn recording(mut self) -> Self {
        self.record = true;
        self
    }

    /// Attach a scripted clock; the harness advances it every step
    pub fn attach_audio(&mut self, audio: &ScriptedAudio) {
        self.engine.attach_audio(audio.boxed());
        self.audio = Some(audio.clone());
    }

    /// Start playback and tell the engine
    pub fn play(&mut self) {
        if let Some(audio) = &self.audio {
            audio.play();
        }
        self.engine.on_audio_play();
    }

    /// End playback and tell the engine
    pub fn end(&mut self) {
        if let Some(audio) = self.audio.take() {
            audio.end();
        }
        self.engine.on_audio_ended();
    }

    /// One frame at the harness delta
    pub fn step(&mut self) -> &AvatarFrame {
        let dt = self.dt;
        self.step_by(dt)
    }

    /// One frame at an arbitrary delta. The audio clock moves by the raw
    /// delta; the engine clamps its own.
    pub fn step_by(&mut self, dt: Duration) -> &AvatarFrame {
        if let Some(audio) = &self.audio {
            audio.advance(dt.as_secs_f64());
        }
        self.steps += 1;
        let frame = self.engine.tick(dt);
        if self.record {
            self.frames.push(frame.clone());
        }
        frame
    }

    /// `n` frames at the harness delta
    pub fn run(&mut self, n: usize) -> &AvatarFrame {
        for _ in 0..n {
            self.step();
        }
        self.engine.frame()
    }

    /// Frames covering at least `span` of engine time
    pub fn run_for(&mut self, span: Duration) -> &AvatarFrame {
        let n = span.as_nanos().div_ceil(self.dt.as_nanos().max(1));
        self.run(n as usize)
    }

    pub fn engine(&self) -> &AvatarEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut AvatarEngine {
        &mut self.engine
    }

    pub fn audio(&self) -> Option<&ScriptedAudio> {
        self.audio.as_ref()
    }

    pub fn frames(&self) -> &[AvatarFrame] {
        &self.frames
    }

    pub fn corrections(&self) -> &CorrectionLog {
        &self.log
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Current weight of a named channel
    pub fn weight(&self, name: &str) -> f32 {
        self.engine.rig().weight(name).unwrap_or(0.0)
    }

    pub fn into_engine(self) -> AvatarEngine {
        self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kelion_core::{Emotion, PresenceKind};

    #[test]
    fn test_recording() {
        let mut harness = ScenarioHarness::seeded(1).recording();
        harness.run(10);
        assert_eq!(harness.frames().len(), 10);
        assert_eq!(harness.steps(), 10);
        assert!(harness.frames()[9].time > harness.frames()[0].time);
    }

    #[test]
    fn test_not_recording_by_default() {
        let mut harness = ScenarioHarness::seeded(1);
        harness.run(5);
        assert!(harness.frames().is_empty());
    }

    #[test]
    fn test_run_for_covers_span() {
        let mut harness = ScenarioHarness::seeded(1).with_dt(Duration::from_millis(10));
        harness.run_for(Duration::from_millis(95));
        assert_eq!(harness.steps(), 10);
    }

    #[test]
    fn test_audio_follows_steps() {
        let mut harness = ScenarioHarness::seeded(1).with_dt(Duration::from_millis(50));
        let audio = ScriptedAudio::new();
        harness.attach_audio(&audio);
        harness.engine_mut().set_state(PresenceKind::Speaking, None);
        harness.play();
        harness.run(4);
        assert!((audio.time() - 0.2).abs() < 1e-9);

        harness.end();
        assert!(!harness.engine().has_audio());
        assert!(harness.audio().is_none());
        assert_eq!(audio.playback(), kelion_time::PlaybackStatus::Ended);
    }

    #[test]
    fn test_log_collects_mouth_decay() {
        // Idle with a surprised face: the blender opens the jaw, nothing
        // speaks, so the sync monitor keeps pulling it back
        let mut harness = ScenarioHarness::seeded(1);
        harness
            .engine_mut()
            .set_state(PresenceKind::Idle, Some(Emotion::Surprised));
        harness.run(60);

        let log = harness.corrections();
        assert!(log.count(CorrectionKind::MouthDecay) > 0);
        assert_eq!(log.count(CorrectionKind::OutOfRange), 0);
        assert_eq!(log.len() as u64, harness.engine().stats().corrections);
        assert!(harness.weight("jawOpen") <= 0.3);

        log.clear();
        assert!(log.is_empty());
    }
}
