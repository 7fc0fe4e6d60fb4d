//! Presence state store

use std::time::Duration;

use kelion_core::{EngineTime, Emotion, Focus, KelionResult, PresenceKind};
use serde::{Deserialize, Serialize};

/// Presence store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// How long orientation keeps its previous behaviour after a return to
    /// idle
    #[serde(with = "kelion_core::duration")]
    pub idle_grace: Duration,

    /// Inactivity after which [`PresenceStore::check_inactivity_timeout`]
    /// reports true
    #[serde(with = "kelion_core::duration")]
    pub inactivity_timeout: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            idle_grace: Duration::from_millis(2000),
            inactivity_timeout: Duration::from_secs(120),
        }
    }
}

/// Current presence of the avatar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresenceState {
    /// Discrete conversational state
    pub state: PresenceKind,
    /// Active emotion
    pub emotion: Emotion,
    /// Derived: state is speaking-like
    pub is_speaking: bool,
    /// Derived: state is listening
    pub is_listening: bool,
    /// Last time a non-idle state was set
    pub last_activity_at: EngineTime,
    /// Attention target
    pub focus: Focus,
}

impl PresenceState {
    fn initial() -> Self {
        Self {
            state: PresenceKind::Idle,
            emotion: Emotion::Calm,
            is_speaking: false,
            is_listening: false,
            last_activity_at: EngineTime::ZERO,
            focus: Focus::User,
        }
    }
}

/// Serializable view of the store, as persisted by the presence API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSnapshot {
    pub state: PresenceKind,
    pub emotion: Emotion,
    #[serde(default)]
    pub focus: Focus,
}

impl PresenceSnapshot {
    pub fn to_json(&self) -> String {
        // Three plain enums cannot fail to serialize
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Presence state store
#[derive(Debug)]
pub struct PresenceStore {
    config: PresenceConfig,
    current: PresenceState,
    /// When the current idle period started, if we are idle after activity
    idle_since: Option<EngineTime>,
    /// Last non-idle state; orientation keeps following it during the grace
    held: PresenceKind,
    /// Bumped on every accepted change
    revision: u64,
}

impl PresenceStore {
    pub fn new(config: PresenceConfig) -> Self {
        Self {
            config,
            current: PresenceState::initial(),
            idle_since: None,
            held: PresenceKind::Idle,
            revision: 0,
        }
    }

    /// Current presence
    pub fn current(&self) -> &PresenceState {
        &self.current
    }

    pub fn config(&self) -> &PresenceConfig {
        &self.config
    }

    /// Number of accepted state changes so far
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Assign a new state.
    ///
    /// `emotion` overrides the emotion implied by the state; with `None` an
    /// emotional state brings its own emotion and a neutral one keeps the
    /// current emotion.
    pub fn set_state(&mut self, state: PresenceKind, emotion: Option<Emotion>, now: EngineTime) {
        let previous = self.current.state;

        self.current.state = state;
        self.current.emotion = emotion
            .or_else(|| state.implied_emotion())
            .unwrap_or(self.current.emotion);
        self.current.is_speaking = state.is_speaking_like();
        self.current.is_listening = state.is_listening();

        if state == PresenceKind::Idle {
            if previous != PresenceKind::Idle {
                self.idle_since = Some(now);
            }
        } else {
            self.current.last_activity_at = now;
            self.idle_since = None;
            self.held = state;
        }

        self.revision += 1;
        tracing::debug!(
            from = %previous,
            to = %state,
            emotion = %self.current.emotion,
            "presence state changed"
        );
    }

    /// Parse and assign a state by name.
    ///
    /// Both names are validated before anything changes; on error the
    /// previous state is retained.
    pub fn set_state_named(
        &mut self,
        state: &str,
        emotion: Option<&str>,
        now: EngineTime,
    ) -> KelionResult<()> {
        let kind: PresenceKind = state.parse()?;
        let emotion = emotion.map(str::parse::<Emotion>).transpose()?;
        self.set_state(kind, emotion, now);
        Ok(())
    }

    pub fn set_focus(&mut self, focus: Focus) {
        self.current.focus = focus;
    }

    /// Is the avatar inside the post-activity idle grace window?
    pub fn in_idle_grace(&self, now: EngineTime) -> bool {
        match self.idle_since {
            Some(since) => {
                self.current.state == PresenceKind::Idle
                    && self.held != PresenceKind::Idle
                    && now.since(since) < self.config.idle_grace
            }
            None => false,
        }
    }

    /// State the orientation controller should follow right now.
    ///
    /// Identical to the current state except during the idle grace window,
    /// where the last active state is held.
    pub fn behavior_state(&self, now: EngineTime) -> PresenceKind {
        if self.in_idle_grace(now) {
            self.held
        } else {
            self.current.state
        }
    }

    /// Has the avatar been inactive for longer than the configured timeout?
    ///
    /// Pure query. Idle and speaking avatars are never considered timed out;
    /// the caller decides what to do about a timeout.
    pub fn check_inactivity_timeout(&self, now: EngineTime) -> bool {
        if self.current.state == PresenceKind::Idle || self.current.is_speaking {
            return false;
        }
        now.since(self.current.last_activity_at) > self.config.inactivity_timeout
    }

    /// Serializable view for persistence
    pub fn snapshot(&self) -> PresenceSnapshot {
        PresenceSnapshot {
            state: self.current.state,
            emotion: self.current.emotion,
            focus: self.current.focus,
        }
    }

    /// Restore a persisted snapshot as a regular state change
    pub fn restore(&mut self, snapshot: &PresenceSnapshot, now: EngineTime) {
        self.set_state(snapshot.state, Some(snapshot.emotion), now);
        self.current.focus = snapshot.focus;
    }
}

impl Default for PresenceStore {
    fn default() -> Self {
        Self::new(PresenceConfig::default())
    }
}
