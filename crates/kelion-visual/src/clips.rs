//! Animation clip table
//!
//! Each presence state lists, in order of preference, the clip names an
//! avatar may ship for it. The table is resolved once against the asset.

use kelion_core::PresenceKind;

static CLIP_CANDIDATES: &[(PresenceKind, &[&str])] = &[
    (PresenceKind::Idle, &["Idle", "Breathing", "Stand"]),
    (PresenceKind::Listening, &["Listening", "Listen", "Idle"]),
    (PresenceKind::Speaking, &["Talking", "Speaking", "Talk"]),
    (PresenceKind::Processing, &["Thinking", "Processing", "Idle"]),
    (PresenceKind::Thinking, &["Thinking", "Think", "Idle"]),
    (PresenceKind::Happy, &["Happy", "Cheer", "Talking"]),
    (PresenceKind::Laughing, &["Laughing", "Laugh", "Happy"]),
    (PresenceKind::Empathetic, &["Empathetic", "Nod", "Talking"]),
    (PresenceKind::Crying, &["Crying", "Sad", "Idle"]),
    (PresenceKind::Surprised, &["Surprised", "Surprise", "Idle"]),
    (PresenceKind::Angry, &["Angry", "Talking"]),
];

/// Clip name candidates for a state, most preferred first
pub fn clip_candidates(state: PresenceKind) -> &'static [&'static str] {
    CLIP_CANDIDATES
        .iter()
        .find(|(kind, _)| *kind == state)
        .map(|(_, names)| *names)
        .unwrap_or(&[])
}

/// State → clip mapping bound to one avatar asset
#[derive(Debug, Clone, Default)]
pub struct ClipLibrary {
    resolved: Vec<(PresenceKind, Option<String>)>,
}

impl ClipLibrary {
    /// Resolve the candidate table against the clips an asset ships.
    ///
    /// Matching is exact but case-insensitive; the first candidate present
    /// wins and the asset's spelling is kept.
    pub fn from_clips(clips: &[String]) -> Self {
        let resolved = PresenceKind::all()
            .iter()
            .map(|kind| {
                let found = clip_candidates(*kind).iter().find_map(|candidate| {
                    clips
                        .iter()
                        .find(|clip| clip.eq_ignore_ascii_case(candidate))
                        .cloned()
                });
                (*kind, found)
            })
            .collect();
        Self { resolved }
    }

    /// Clip to play in `state`, if the asset has one
    pub fn clip_for(&self, state: PresenceKind) -> Option<&str> {
        self.resolved
            .iter()
            .find(|(kind, _)| *kind == state)
            .and_then(|(_, clip)| clip.as_deref())
    }
}
