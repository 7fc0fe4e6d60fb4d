//! Avatar Engine - the frame scheduler
//!
//! One engine instance owns every piece of animation state. External events
//! (state changes, timelines, audio play/end) mutate it between ticks; the
//! tick itself runs the subsystems in a fixed order and cannot fail:
//!
//! 1. Presence-derived phase accumulators (breathing / speaking bob)
//! 2. Orientation
//! 3. Emotion blender
//! 4. Gaze & blink
//! 5. Viseme timeline
//! 6. Amplitude fallback
//! 7. Sync monitor

use std::fmt;
use std::time::{Duration, Instant};

use kelion_core::{EngineTime, Emotion, Focus, KelionResult, PresenceKind, Viseme};
use kelion_presence::{PresenceSnapshot, PresenceState, PresenceStore, ReplyHint};
use kelion_time::{sanitize_delta, AudioClock, Phase};
use kelion_visual::{
    AvatarAsset, ClipLibrary, Expression, ExpressionBlender, GazeBlinkGenerator, GazeOutput,
    MorphRig, Orientation, OrientationController, OrientationMode,
};
use kelion_voice::{
    AmplitudeFallback, LipsyncPayload, VisemeEntry, VisemePlayer, VisemeTimeline,
};

use crate::{EngineConfig, SyncCorrection, SyncMonitor};

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvatarFrame {
    /// Engine time at the end of the tick
    pub time: EngineTime,
    /// Root rotation
    pub orientation: Orientation,
    /// Root position offset (breathing / speaking bob)
    pub root_offset: [f32; 3],
    /// Morph weights in rig channel order, as left by the sync monitor
    pub morph_weights: Vec<f32>,
    /// Per-eye look offsets and eyelid closure
    pub gaze: GazeOutput,
    /// Jaw bone rotation from the amplitude fallback, radians
    pub jaw_rotation: f32,
    /// Key-light intensity hint while processing
    pub key_light: Option<f32>,
    /// Body clip for the current state, if the asset has one
    pub clip: Option<String>,
    /// Viseme the timeline showed this frame
    pub viseme: Option<Viseme>,
    /// Orientation behaviour mode this frame
    pub mode: OrientationMode,
}

impl AvatarFrame {
    /// Morph weights clamped to `[0, 1]` for the renderer
    pub fn renderer_weights(&self) -> impl Iterator<Item = f32> + '_ {
        self.morph_weights.iter().map(|w| w.clamp(0.0, 1.0))
    }
}

/// Engine statistics
#[derive(Clone, Debug, Default)]
pub struct EngineStats {
    pub ticks: u64,
    pub corrections: u64,
    /// Frames where the timeline drove the mouth
    pub timeline_frames: u64,
    /// Frames where the amplitude fallback drove the mouth
    pub fallback_frames: u64,
    pub state_changes: u64,
    pub timelines_set: u64,
    pub last_tick_duration: Duration,
}

type CorrectionObserver = Box<dyn FnMut(&SyncCorrection) + Send>;

/// Avatar presence engine
pub struct AvatarEngine {
    config: EngineConfig,
    time: EngineTime,
    presence: PresenceStore,
    rig: MorphRig,
    clips: ClipLibrary,
    breath: Phase,
    orientation: OrientationController,
    blender: ExpressionBlender,
    gaze: GazeBlinkGenerator,
    player: VisemePlayer,
    fallback: AmplitudeFallback,
    monitor: SyncMonitor,
    audio: Option<Box<dyn AudioClock>>,
    observer: Option<CorrectionObserver>,
    frame: AvatarFrame,
    stats: EngineStats,
}

impl AvatarEngine {
    /// Build an engine bound to an avatar asset
    pub fn new(config: EngineConfig, asset: &AvatarAsset) -> Self {
        let rig = MorphRig::from_asset(asset);
        tracing::debug!(
            channels = rig.len(),
            clips = asset.clips.len(),
            seed = ?config.seed,
            "avatar engine created"
        );

        Self {
            time: EngineTime::ZERO,
            presence: PresenceStore::new(config.presence.clone()),
            clips: ClipLibrary::from_clips(&asset.clips),
            breath: Phase::new(config.motion.breath_frequency),
            orientation: OrientationController::new(config.orientation.clone()),
            blender: ExpressionBlender::new(config.expression.clone(), &rig),
            gaze: GazeBlinkGenerator::new(
                config.gaze.clone(),
                config.blink.clone(),
                config.seed,
                &rig,
            ),
            player: VisemePlayer::new(config.player.clone(), &rig),
            fallback: AmplitudeFallback::new(config.amplitude.clone(), &rig),
            monitor: SyncMonitor::new(config.sync.clone(), &rig),
            audio: None,
            observer: None,
            frame: AvatarFrame::default(),
            stats: EngineStats::default(),
            rig,
            config,
        }
    }

    /// Engine with default configuration and a complete standard avatar
    pub fn standard() -> Self {
        Self::new(EngineConfig::default(), &AvatarAsset::standard())
    }

    // ---------------------------------------------------------------------
    // Boundary calls
    // ---------------------------------------------------------------------

    /// Set the presence state
    pub fn set_state(&mut self, state: PresenceKind, emotion: Option<Emotion>) {
        self.presence.set_state(state, emotion, self.time);
        self.stats.state_changes += 1;
    }

    /// Set the presence state by name; unknown names are rejected and the
    /// previous state is kept
    pub fn set_state_named(&mut self, state: &str, emotion: Option<&str>) -> KelionResult<()> {
        self.presence.set_state_named(state, emotion, self.time)?;
        self.stats.state_changes += 1;
        Ok(())
    }

    /// Enter the state a backend reply asks for
    pub fn apply_reply(&mut self, hint: &ReplyHint) -> KelionResult<()> {
        let (state, emotion) = hint.resolve()?;
        self.set_state(state, Some(emotion));
        Ok(())
    }

    pub fn set_focus(&mut self, focus: Focus) {
        self.presence.set_focus(focus);
    }

    /// Validate and install a new viseme timeline. An invalid timeline is
    /// rejected and the current one keeps playing.
    pub fn set_viseme_timeline(&mut self, entries: Vec<VisemeEntry>) -> KelionResult<()> {
        let timeline = VisemeTimeline::new(entries)?;
        self.set_timeline(timeline);
        Ok(())
    }

    /// Install an already validated timeline
    pub fn set_timeline(&mut self, timeline: VisemeTimeline) {
        self.player.set_timeline(timeline);
        self.stats.timelines_set += 1;
    }

    /// Install the timeline of a lipsync payload
    pub fn load_lipsync(&mut self, payload: &LipsyncPayload) -> KelionResult<()> {
        let timeline = payload.timeline()?;
        self.set_timeline(timeline);
        Ok(())
    }

    pub fn clear_timeline(&mut self) {
        self.player.clear();
    }

    /// Attach the audio clock of the utterance being played
    pub fn attach_audio(&mut self, audio: Box<dyn AudioClock>) {
        tracing::debug!(analyser = audio.has_analyser(), "audio attached");
        self.audio = Some(audio);
    }

    pub fn detach_audio(&mut self) -> Option<Box<dyn AudioClock>> {
        self.audio.take()
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Audio `play` event
    pub fn on_audio_play(&mut self) {
        self.set_state(PresenceKind::Speaking, None);
    }

    /// Audio `ended` event: back to idle. The finished source and its viseme
    /// timeline are both let go.
    pub fn on_audio_ended(&mut self) {
        self.detach_audio();
        self.player.clear();
        self.set_state(PresenceKind::Idle, None);
    }

    /// Has the avatar been inactive for longer than the configured timeout?
    pub fn check_inactivity_timeout(&self) -> bool {
        self.presence.check_inactivity_timeout(self.time)
    }

    /// Register a callback for sync-monitor corrections
    pub fn on_correction<F>(&mut self, observer: F)
    where
        F: FnMut(&SyncCorrection) + Send + 'static,
    {
        self.observer = Some(Box::new(observer));
    }

    pub fn snapshot(&self) -> PresenceSnapshot {
        self.presence.snapshot()
    }

    pub fn restore(&mut self, snapshot: &PresenceSnapshot) {
        self.presence.restore(snapshot, self.time);
        self.stats.state_changes += 1;
    }

    // ---------------------------------------------------------------------
    // Frame
    // ---------------------------------------------------------------------

    /// Advance the engine by `dt` and produce the next frame
    pub fn tick(&mut self, dt: Duration) -> &AvatarFrame {
        let start = Instant::now();
        self.stats.ticks += 1;

        let dt = sanitize_delta(dt, self.config.max_frame_delta);
        self.time = self.time + dt;
        let dt = dt.as_secs_f32();
        let now = self.time;
        let presence: PresenceState = *self.presence.current();

        // 1. Phase accumulators
        let motion = &self.config.motion;
        let (rate, amplitude) = if presence.is_speaking {
            (motion.speaking_rate, motion.speaking_amplitude)
        } else {
            (1.0, motion.breath_amplitude)
        };
        let bob = self.breath.advance(dt, rate).sin() * amplitude;

        // 2. Orientation (idle grace applies here)
        let mode = OrientationMode::for_state(self.presence.behavior_state(now));
        self.orientation.tick(dt, mode);

        // 3. Emotion blender
        let expression = Expression::resolve(presence.state, presence.emotion);
        self.blender.tick(expression, &mut self.rig);

        // 4. Gaze & blink
        let focused = mode == OrientationMode::Listening
            || (mode != OrientationMode::Idle && presence.focus == Focus::User);
        let gaze = self.gaze.tick(dt, focused, &mut self.rig);

        // 5. Viseme timeline
        let clock = self
            .audio
            .as_deref()
            .filter(|audio| audio.is_valid())
            .map(|audio| audio.current_time());
        let claimed = self.player.tick(clock, &mut self.rig);

        // 6. Amplitude fallback
        let driven = self.fallback.tick(
            presence.is_speaking,
            self.audio.as_deref_mut(),
            claimed,
            &mut self.rig,
        );

        // 7. Sync monitor
        let has_analyser = self.audio.as_deref().is_some_and(|audio| audio.has_analyser());
        let mouth_undriven = !presence.is_speaking && !has_analyser;
        let corrections =
            self.monitor
                .run(&mut self.rig, self.orientation.pose_mut(), mouth_undriven);
        if let Some(observer) = self.observer.as_mut() {
            for c in corrections {
                observer(c);
            }
        }
        self.stats.corrections += corrections.len() as u64;
        self.stats.timeline_frames += u64::from(claimed);
        self.stats.fallback_frames += u64::from(driven);

        // Frame output
        let frame = &mut self.frame;
        frame.time = now;
        frame.orientation = self.orientation.pose();
        frame.root_offset = [0.0, bob, 0.0];
        frame.morph_weights.clear();
        frame.morph_weights.extend_from_slice(self.rig.weights());
        frame.gaze = gaze;
        frame.jaw_rotation = self.fallback.jaw_rotation();
        frame.key_light = self.orientation.key_light();
        frame.viseme = if claimed { self.player.shown() } else { None };
        frame.mode = mode;
        let clip = self.clips.clip_for(presence.state);
        if frame.clip.as_deref() != clip {
            frame.clip = clip.map(str::to_owned);
        }

        self.stats.last_tick_duration = start.elapsed();
        tracing::trace!(
            tick = self.stats.ticks,
            ?mode,
            claimed,
            driven,
            corrections = self.stats.corrections,
            "frame"
        );
        &self.frame
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    /// Last produced frame
    pub fn frame(&self) -> &AvatarFrame {
        &self.frame
    }

    pub fn time(&self) -> EngineTime {
        self.time
    }

    pub fn presence(&self) -> &PresenceState {
        self.presence.current()
    }

    pub fn presence_store(&self) -> &PresenceStore {
        &self.presence
    }

    pub fn rig(&self) -> &MorphRig {
        &self.rig
    }

    /// Channel names in the order of [`AvatarFrame::morph_weights`]
    pub fn channel_names(&self) -> &[String] {
        self.rig.names()
    }

    pub fn orientation(&self) -> &OrientationController {
        &self.orientation
    }

    pub fn gaze(&self) -> &GazeBlinkGenerator {
        &self.gaze
    }

    pub fn player(&self) -> &VisemePlayer {
        &self.player
    }

    pub fn fallback(&self) -> &AmplitudeFallback {
        &self.fallback
    }

    /// Put the mouth at rest right now, outside the speech-end edge
    pub fn reset_mouth(&mut self) {
        self.fallback.reset_mouth(&mut self.rig);
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl fmt::Debug for AvatarEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarEngine")
            .field("time", &self.time)
            .field("presence", self.presence.current())
            .field("channels", &self.rig.len())
            .field("audio", &self.audio.is_some())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
