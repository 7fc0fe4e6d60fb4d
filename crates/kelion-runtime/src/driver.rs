//! Async frame driver
//!
//! Runs an [`AvatarEngine`] on a tokio task at a fixed frame interval.
//! Events from the host are queued as [`EngineCommand`]s and applied at the
//! start of the next frame, so the engine keeps a single writer. Frames are
//! published through a `watch` channel; slow readers simply see the latest
//! one.

use kelion_core::{Emotion, Focus, KelionResult, PresenceKind};
use kelion_presence::ReplyHint;
use kelion_time::{AudioClock, FrameClock};
use kelion_voice::{LipsyncPayload, VisemeEntry, VisemeTimeline};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{AvatarEngine, AvatarFrame};

/// Driver errors
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("engine task has stopped")]
    Stopped,
}

/// Host event for the engine. Everything here is already validated.
pub enum EngineCommand {
    SetState {
        state: PresenceKind,
        emotion: Option<Emotion>,
    },
    SetFocus(Focus),
    SetTimeline(VisemeTimeline),
    ClearTimeline,
    AttachAudio(Box<dyn AudioClock>),
    DetachAudio,
    AudioPlay,
    AudioEnded,
    Shutdown,
}

impl std::fmt::Debug for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineCommand::SetState { state, emotion } => f
                .debug_struct("SetState")
                .field("state", state)
                .field("emotion", emotion)
                .finish(),
            EngineCommand::SetFocus(focus) => f.debug_tuple("SetFocus").field(focus).finish(),
            EngineCommand::SetTimeline(tl) => f.debug_tuple("SetTimeline").field(&tl.len()).finish(),
            EngineCommand::ClearTimeline => f.write_str("ClearTimeline"),
            EngineCommand::AttachAudio(_) => f.write_str("AttachAudio"),
            EngineCommand::DetachAudio => f.write_str("DetachAudio"),
            EngineCommand::AudioPlay => f.write_str("AudioPlay"),
            EngineCommand::AudioEnded => f.write_str("AudioEnded"),
            EngineCommand::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Host-side handle to a running engine.
///
/// Name and timeline validation happen here, synchronously, before anything
/// is queued.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<EngineCommand>,
    frames: watch::Receiver<AvatarFrame>,
}

impl EngineHandle {
    pub fn send(&self, command: EngineCommand) -> Result<(), DriverError> {
        self.commands.send(command).map_err(|_| DriverError::Stopped)
    }

    pub fn set_state(&self, state: PresenceKind, emotion: Option<Emotion>) -> Result<(), DriverError> {
        self.send(EngineCommand::SetState { state, emotion })
    }

    /// Parse names and queue the state change
    pub fn set_state_named(&self, state: &str, emotion: Option<&str>) -> KelionResult<bool> {
        let state: PresenceKind = state.parse()?;
        let emotion = emotion.map(str::parse::<Emotion>).transpose()?;
        Ok(self.set_state(state, emotion).is_ok())
    }

    /// Resolve a reply hint and queue the resulting state
    pub fn apply_reply(&self, hint: &ReplyHint) -> KelionResult<bool> {
        let (state, emotion) = hint.resolve()?;
        Ok(self.set_state(state, Some(emotion)).is_ok())
    }

    /// Validate and queue a timeline
    pub fn set_viseme_timeline(&self, entries: Vec<VisemeEntry>) -> KelionResult<bool> {
        let timeline = VisemeTimeline::new(entries)?;
        Ok(self.send(EngineCommand::SetTimeline(timeline)).is_ok())
    }

    /// Validate and queue the timeline of a lipsync payload
    pub fn load_lipsync(&self, payload: &LipsyncPayload) -> KelionResult<bool> {
        let timeline = payload.timeline()?;
        Ok(self.send(EngineCommand::SetTimeline(timeline)).is_ok())
    }

    pub fn attach_audio(&self, audio: Box<dyn AudioClock>) -> Result<(), DriverError> {
        self.send(EngineCommand::AttachAudio(audio))
    }

    pub fn audio_play(&self) -> Result<(), DriverError> {
        self.send(EngineCommand::AudioPlay)
    }

    pub fn audio_ended(&self) -> Result<(), DriverError> {
        self.send(EngineCommand::AudioEnded)
    }

    pub fn shutdown(&self) -> Result<(), DriverError> {
        self.send(EngineCommand::Shutdown)
    }

    /// Subscribe to frames
    pub fn frames(&self) -> watch::Receiver<AvatarFrame> {
        self.frames.clone()
    }

    /// Most recent frame
    pub fn latest(&self) -> AvatarFrame {
        self.frames.borrow().clone()
    }
}

/// Apply one command. Returns false on shutdown.
fn apply(engine: &mut AvatarEngine, command: EngineCommand) -> bool {
    tracing::debug!(?command, "engine command");
    match command {
        EngineCommand::SetState { state, emotion } => engine.set_state(state, emotion),
        EngineCommand::SetFocus(focus) => engine.set_focus(focus),
        EngineCommand::SetTimeline(timeline) => engine.set_timeline(timeline),
        EngineCommand::ClearTimeline => engine.clear_timeline(),
        EngineCommand::AttachAudio(audio) => engine.attach_audio(audio),
        EngineCommand::DetachAudio => {
            engine.detach_audio();
        }
        EngineCommand::AudioPlay => engine.on_audio_play(),
        EngineCommand::AudioEnded => engine.on_audio_ended(),
        EngineCommand::Shutdown => return false,
    }
    true
}

/// Spawn the frame loop on the current tokio runtime.
///
/// The task ends on [`EngineCommand::Shutdown`] or when every handle is
/// dropped, and hands the engine back.
pub fn spawn(mut engine: AvatarEngine) -> (EngineHandle, JoinHandle<AvatarEngine>) {
    let (command_tx, mut command_rx) = mpsc::unbounded_channel();
    let (frame_tx, frame_rx) = watch::channel(engine.frame().clone());
    let interval = engine.config().frame_interval;
    let max_delta = engine.config().max_frame_delta;

    let task = tokio::spawn(async move {
        let mut clock = FrameClock::with_max_delta(max_delta);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(?interval, "frame driver started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                command = command_rx.recv() => match command {
                    Some(command) => {
                        if !apply(&mut engine, command) {
                            break;
                        }
                        continue;
                    }
                    None => break,
                },
            }

            // Drain whatever else arrived before this frame
            loop {
                match command_rx.try_recv() {
                    Ok(command) => {
                        if !apply(&mut engine, command) {
                            tracing::info!(ticks = engine.stats().ticks, "frame driver stopped");
                            return engine;
                        }
                    }
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => break,
                }
            }

            let dt = clock.tick();
            let frame = engine.tick(dt).clone();
            frame_tx.send_replace(frame);
        }

        tracing::info!(ticks = engine.stats().ticks, "frame driver stopped");
        engine
    });

    (
        EngineHandle {
            commands: command_tx,
            frames: frame_rx,
        },
        task,
    )
}
