//! Morph Rig - the morph channel registry
//!
//! The avatar asset decides which morph channels exist. Everything that
//! writes weights resolves channel names against the rig once, at
//! construction; a name the asset does not have simply resolves to nothing
//! and is skipped from then on.

use std::collections::{HashMap, HashSet};

use kelion_core::Viseme;
use serde::Deserialize;

/// Generic mouth-open channels driven by the amplitude fallback
pub const MOUTH_CHANNELS: &[&str] = &["jawOpen", "mouthOpen"];

/// Eyelid channels driven by the blink timer
pub const BLINK_CHANNELS: &[&str] = &["eyeBlinkLeft", "eyeBlinkRight"];

/// Facial expression channels of a standard ARKit-style rig
pub const EXPRESSION_CHANNELS: &[&str] = &[
    "browInnerUp",
    "browDownLeft",
    "browDownRight",
    "browOuterUpLeft",
    "browOuterUpRight",
    "eyeSquintLeft",
    "eyeSquintRight",
    "eyeWideLeft",
    "eyeWideRight",
    "cheekSquintLeft",
    "cheekSquintRight",
    "noseSneerLeft",
    "noseSneerRight",
    "mouthSmileLeft",
    "mouthSmileRight",
    "mouthFrownLeft",
    "mouthFrownRight",
    "mouthPressLeft",
    "mouthPressRight",
    "mouthPucker",
];

/// Index of a morph channel inside a [`MorphRig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(usize);

impl ChannelId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// What the avatar asset collaborator tells us about the loaded model
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AvatarAsset {
    /// Morph target names present on the mesh
    pub morph_channels: Vec<String>,
    /// Bone names present on the skeleton
    pub bones: Vec<String>,
    /// Animation clip names shipped with the model
    pub clips: Vec<String>,
}

impl AvatarAsset {
    /// A complete avatar: every expression, mouth, blink and viseme channel
    pub fn standard() -> Self {
        let mut morph_channels: Vec<String> = EXPRESSION_CHANNELS
            .iter()
            .chain(MOUTH_CHANNELS)
            .chain(BLINK_CHANNELS)
            .map(|s| s.to_string())
            .collect();
        morph_channels.extend(Viseme::all().iter().map(|v| v.channel_name().to_string()));

        Self {
            morph_channels,
            bones: ["Hips", "Spine", "Neck", "Head", "Jaw", "LeftEye", "RightEye"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            clips: ["Idle", "Talking", "Thinking", "Listening"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// An avatar with the given morph channels and nothing else
    pub fn with_channels<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            morph_channels: channels.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

/// Morph channel registry and the shared weight vector
#[derive(Debug, Clone)]
pub struct MorphRig {
    names: Vec<String>,
    lookup: HashMap<String, ChannelId>,
    weights: Vec<f32>,
    bones: HashSet<String>,
}

impl MorphRig {
    /// Bind to an avatar asset. Duplicate channel names keep the first slot.
    pub fn from_asset(asset: &AvatarAsset) -> Self {
        let mut names = Vec::with_capacity(asset.morph_channels.len());
        let mut lookup = HashMap::with_capacity(asset.morph_channels.len());

        for name in &asset.morph_channels {
            if lookup.contains_key(name) {
                continue;
            }
            lookup.insert(name.clone(), ChannelId(names.len()));
            names.push(name.clone());
        }

        let weights = vec![0.0; names.len()];
        Self {
            names,
            lookup,
            weights,
            bones: asset.bones.iter().cloned().collect(),
        }
    }

    /// Resolve a channel name
    #[inline]
    pub fn channel(&self, name: &str) -> Option<ChannelId> {
        self.lookup.get(name).copied()
    }

    /// Resolve many names, silently dropping the ones the asset lacks
    pub fn resolve_all<'a, I>(&self, names: I) -> Vec<ChannelId>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names.into_iter().filter_map(|n| self.channel(n)).collect()
    }

    #[inline]
    pub fn get(&self, id: ChannelId) -> f32 {
        self.weights[id.0]
    }

    #[inline]
    pub fn set(&mut self, id: ChannelId, value: f32) {
        self.weights[id.0] = value;
    }

    /// Weight of a named channel, `None` if the asset lacks it
    pub fn weight(&self, name: &str) -> Option<f32> {
        self.channel(name).map(|id| self.get(id))
    }

    /// Set a named channel. Returns false (and does nothing) if the asset
    /// lacks it.
    pub fn set_named(&mut self, name: &str, value: f32) -> bool {
        match self.channel(name) {
            Some(id) => {
                self.set(id, value);
                true
            }
            None => false,
        }
    }

    /// Name of a channel slot
    pub fn name(&self, id: ChannelId) -> &str {
        &self.names[id.0]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The full weight vector, in channel order
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut [f32] {
        &mut self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn has_bone(&self, bone: &str) -> bool {
        self.bones.contains(bone)
    }

    /// Zero every channel
    pub fn clear(&mut self) {
        self.weights.iter_mut().for_each(|w| *w = 0.0);
    }
}
