//! Presence vocabulary
//!
//! The conversational backend talks to the engine in terms of a discrete
//! presence state plus an emotion. Both are closed enums here; string names
//! coming from outside are parsed once at the boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::KelionError;

/// Discrete conversational / behavioural mode of the avatar
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceKind {
    /// Nothing going on, idle sway
    #[default]
    Idle,
    /// The user is talking to the avatar
    Listening,
    /// The avatar is talking
    #[serde(alias = "speak")]
    Speaking,
    /// Waiting on the backend
    Processing,
    /// Visible deliberation before an answer
    Thinking,
    Happy,
    Laughing,
    Empathetic,
    Crying,
    Surprised,
    Angry,
}

impl PresenceKind {
    /// All presence states in declaration order
    pub fn all() -> &'static [PresenceKind] {
        &[
            PresenceKind::Idle,
            PresenceKind::Listening,
            PresenceKind::Speaking,
            PresenceKind::Processing,
            PresenceKind::Thinking,
            PresenceKind::Happy,
            PresenceKind::Laughing,
            PresenceKind::Empathetic,
            PresenceKind::Crying,
            PresenceKind::Surprised,
            PresenceKind::Angry,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PresenceKind::Idle => "idle",
            PresenceKind::Listening => "listening",
            PresenceKind::Speaking => "speaking",
            PresenceKind::Processing => "processing",
            PresenceKind::Thinking => "thinking",
            PresenceKind::Happy => "happy",
            PresenceKind::Laughing => "laughing",
            PresenceKind::Empathetic => "empathetic",
            PresenceKind::Crying => "crying",
            PresenceKind::Surprised => "surprised",
            PresenceKind::Angry => "angry",
        }
    }

    /// States during which the avatar's mouth is driven by speech.
    ///
    /// Emotional states are what the backend sends instead of `speaking`
    /// when a reply carries an emotion, so they count as speech too.
    pub fn is_speaking_like(self) -> bool {
        matches!(
            self,
            PresenceKind::Speaking
                | PresenceKind::Happy
                | PresenceKind::Laughing
                | PresenceKind::Empathetic
                | PresenceKind::Crying
                | PresenceKind::Surprised
                | PresenceKind::Angry
        )
    }

    #[inline]
    pub fn is_listening(self) -> bool {
        self == PresenceKind::Listening
    }

    /// Emotion carried by the state itself, if any.
    ///
    /// `None` means the state is emotionally neutral and keeps whatever
    /// emotion was active before.
    pub fn implied_emotion(self) -> Option<Emotion> {
        match self {
            PresenceKind::Idle => Some(Emotion::Calm),
            PresenceKind::Listening | PresenceKind::Speaking | PresenceKind::Processing => None,
            PresenceKind::Thinking => Some(Emotion::Thinking),
            PresenceKind::Happy | PresenceKind::Laughing => Some(Emotion::Happy),
            PresenceKind::Empathetic => Some(Emotion::Empathetic),
            PresenceKind::Crying => Some(Emotion::Sad),
            PresenceKind::Surprised => Some(Emotion::Surprised),
            PresenceKind::Angry => Some(Emotion::Angry),
        }
    }
}

impl fmt::Display for PresenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresenceKind {
    type Err = KelionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let kind = match normalized.as_str() {
            "idle" => PresenceKind::Idle,
            "listening" | "listen" => PresenceKind::Listening,
            "speaking" | "speak" => PresenceKind::Speaking,
            "processing" => PresenceKind::Processing,
            "thinking" => PresenceKind::Thinking,
            "happy" => PresenceKind::Happy,
            "laughing" => PresenceKind::Laughing,
            "empathetic" => PresenceKind::Empathetic,
            "crying" => PresenceKind::Crying,
            "surprised" => PresenceKind::Surprised,
            "angry" => PresenceKind::Angry,
            _ => return Err(KelionError::UnknownState(s.to_string())),
        };
        Ok(kind)
    }
}

/// Emotion attached to the current reply
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    #[default]
    Calm,
    Neutral,
    Happy,
    Empathetic,
    Sad,
    Angry,
    Surprised,
    Alert,
    Thinking,
    Confused,
}

impl Emotion {
    pub fn all() -> &'static [Emotion] {
        &[
            Emotion::Calm,
            Emotion::Neutral,
            Emotion::Happy,
            Emotion::Empathetic,
            Emotion::Sad,
            Emotion::Angry,
            Emotion::Surprised,
            Emotion::Alert,
            Emotion::Thinking,
            Emotion::Confused,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Calm => "calm",
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Empathetic => "empathetic",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Surprised => "surprised",
            Emotion::Alert => "alert",
            Emotion::Thinking => "thinking",
            Emotion::Confused => "confused",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = KelionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Emotion::all()
            .iter()
            .copied()
            .find(|e| e.as_str() == normalized)
            .ok_or_else(|| KelionError::UnknownEmotion(s.to_string()))
    }
}

/// Where the avatar's attention is directed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Focus {
    /// Looking at the user / camera
    #[default]
    User,
    /// Looking at shared screen content
    Screen,
    /// Not attending to anything in particular
    Away,
}
