//! Reply animation hints
//!
//! The chat backend attaches an emotion and (optionally) audio to each reply.
//! This turns that into the presence state the avatar should enter while the
//! reply is delivered.

use kelion_core::{Emotion, KelionResult, PresenceKind};
use serde::Deserialize;

/// The animation-relevant part of a backend reply
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyHint {
    /// Emotion label chosen by the backend
    #[serde(default)]
    pub emotion: Option<String>,
    /// Server-side synthesized audio, if any
    #[serde(default)]
    pub audio_url: Option<String>,
    /// The client speaks the reply with its own TTS
    #[serde(default, rename = "useBrowserTTS")]
    pub use_browser_tts: bool,
    /// Explicit animation requested by the backend
    #[serde(default)]
    pub animation: Option<String>,
}

impl ReplyHint {
    /// Does this reply come with audible speech?
    pub fn has_audio(&self) -> bool {
        self.audio_url.as_deref().is_some_and(|u| !u.is_empty()) || self.use_browser_tts
    }

    /// Resolve the presence state and emotion for this reply.
    ///
    /// An explicit `animation` wins; otherwise a reply with audio speaks and
    /// the happy / empathetic emotions take over the animation.
    pub fn resolve(&self) -> KelionResult<(PresenceKind, Emotion)> {
        let emotion = match self.emotion.as_deref() {
            Some(name) => name.parse::<Emotion>()?,
            None => Emotion::Calm,
        };

        if let Some(animation) = self.animation.as_deref() {
            return Ok((animation.parse()?, emotion));
        }

        Ok((animation_for(emotion, self.has_audio()), emotion))
    }
}

/// Presence state for a reply with the given emotion
pub fn animation_for(emotion: Emotion, has_audio: bool) -> PresenceKind {
    match emotion {
        Emotion::Happy => PresenceKind::Happy,
        Emotion::Empathetic => PresenceKind::Empathetic,
        _ if has_audio => PresenceKind::Speaking,
        _ => PresenceKind::Idle,
    }
}
