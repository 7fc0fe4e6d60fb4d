//! Expression blending
//!
//! One table maps every expression to the channels it touches. The blender
//! works over the union of all channels in the table, so a channel raised by
//! one expression is released smoothly when another takes over instead of
//! leaking into it.

use kelion_core::{blend, Emotion, PresenceKind};
use serde::{Deserialize, Serialize};

use crate::{ChannelId, MorphRig};

/// Facial expression selected from presence state and emotion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Expression {
    #[default]
    Neutral,
    Calm,
    Happy,
    Laughing,
    Empathetic,
    Sad,
    Surprised,
    Angry,
    Thinking,
    Alert,
    Confused,
}

impl Expression {
    pub fn all() -> &'static [Expression] {
        &[
            Expression::Neutral,
            Expression::Calm,
            Expression::Happy,
            Expression::Laughing,
            Expression::Empathetic,
            Expression::Sad,
            Expression::Surprised,
            Expression::Angry,
            Expression::Thinking,
            Expression::Alert,
            Expression::Confused,
        ]
    }

    /// Expression for a presence state and emotion.
    ///
    /// Emotional states carry their own expression; the rest show the
    /// active emotion.
    pub fn resolve(state: PresenceKind, emotion: Emotion) -> Expression {
        match state {
            PresenceKind::Happy => Expression::Happy,
            PresenceKind::Laughing => Expression::Laughing,
            PresenceKind::Empathetic => Expression::Empathetic,
            PresenceKind::Crying => Expression::Sad,
            PresenceKind::Surprised => Expression::Surprised,
            PresenceKind::Angry => Expression::Angry,
            PresenceKind::Thinking => Expression::Thinking,
            _ => Expression::from(emotion),
        }
    }

    /// Channel targets of this expression. Unlisted channels target 0.
    pub fn targets(self) -> &'static [(&'static str, f32)] {
        EXPRESSION_TABLE
            .iter()
            .find(|(e, _)| *e == self)
            .map(|(_, t)| *t)
            .unwrap_or(&[])
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

impl From<Emotion> for Expression {
    fn from(emotion: Emotion) -> Self {
        match emotion {
            Emotion::Calm => Expression::Calm,
            Emotion::Neutral => Expression::Neutral,
            Emotion::Happy => Expression::Happy,
            Emotion::Empathetic => Expression::Empathetic,
            Emotion::Sad => Expression::Sad,
            Emotion::Angry => Expression::Angry,
            Emotion::Surprised => Expression::Surprised,
            Emotion::Alert => Expression::Alert,
            Emotion::Thinking => Expression::Thinking,
            Emotion::Confused => Expression::Confused,
        }
    }
}

type TargetList = &'static [(&'static str, f32)];

static EXPRESSION_TABLE: &[(Expression, TargetList)] = &[
    (Expression::Neutral, &[]),
    (
        Expression::Calm,
        &[("mouthSmileLeft", 0.1), ("mouthSmileRight", 0.1)],
    ),
    (
        Expression::Happy,
        &[
            ("mouthSmileLeft", 0.6),
            ("mouthSmileRight", 0.6),
            ("cheekSquintLeft", 0.3),
            ("cheekSquintRight", 0.3),
            ("eyeSquintLeft", 0.2),
            ("eyeSquintRight", 0.2),
        ],
    ),
    (
        Expression::Laughing,
        &[
            ("mouthSmileLeft", 0.9),
            ("mouthSmileRight", 0.9),
            ("cheekSquintLeft", 0.6),
            ("cheekSquintRight", 0.6),
            ("eyeSquintLeft", 0.5),
            ("eyeSquintRight", 0.5),
            ("jawOpen", 0.25),
        ],
    ),
    (
        Expression::Empathetic,
        &[
            ("browInnerUp", 0.5),
            ("mouthSmileLeft", 0.15),
            ("mouthSmileRight", 0.15),
            ("eyeSquintLeft", 0.1),
            ("eyeSquintRight", 0.1),
        ],
    ),
    (
        Expression::Sad,
        &[
            ("browInnerUp", 0.8),
            ("mouthFrownLeft", 0.6),
            ("mouthFrownRight", 0.6),
            ("eyeSquintLeft", 0.4),
            ("eyeSquintRight", 0.4),
        ],
    ),
    (
        Expression::Surprised,
        &[
            ("browInnerUp", 0.7),
            ("browOuterUpLeft", 0.7),
            ("browOuterUpRight", 0.7),
            ("eyeWideLeft", 0.6),
            ("eyeWideRight", 0.6),
            ("jawOpen", 0.3),
        ],
    ),
    (
        Expression::Angry,
        &[
            ("browDownLeft", 0.8),
            ("browDownRight", 0.8),
            ("noseSneerLeft", 0.4),
            ("noseSneerRight", 0.4),
            ("mouthPressLeft", 0.3),
            ("mouthPressRight", 0.3),
            ("eyeSquintLeft", 0.3),
            ("eyeSquintRight", 0.3),
        ],
    ),
    (
        Expression::Thinking,
        &[
            ("browInnerUp", 0.2),
            ("browDownLeft", 0.3),
            ("mouthPressLeft", 0.2),
            ("eyeSquintRight", 0.15),
            ("mouthPucker", 0.1),
        ],
    ),
    (
        Expression::Alert,
        &[
            ("eyeWideLeft", 0.4),
            ("eyeWideRight", 0.4),
            ("browOuterUpLeft", 0.4),
            ("browOuterUpRight", 0.4),
        ],
    ),
    (
        Expression::Confused,
        &[
            ("browDownLeft", 0.4),
            ("browOuterUpRight", 0.4),
            ("mouthPressRight", 0.2),
        ],
    ),
];

/// Every channel referenced anywhere in the expression table, in first-seen
/// order
pub fn expression_union() -> Vec<&'static str> {
    let mut union: Vec<&'static str> = Vec::new();
    for (_, targets) in EXPRESSION_TABLE {
        for (name, _) in targets.iter() {
            if !union.contains(name) {
                union.push(*name);
            }
        }
    }
    union
}

/// Blender configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionConfig {
    /// Fraction of the remaining distance covered per tick
    pub blend_factor: f32,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self { blend_factor: 0.15 }
    }
}

/// Emotion morph blender
#[derive(Debug)]
pub struct ExpressionBlender {
    config: ExpressionConfig,
    /// Union channels present on the rig
    channels: Vec<ChannelId>,
    /// `targets[expression][slot]`, precomputed for every expression
    targets: Vec<Vec<f32>>,
    active: Expression,
}

impl ExpressionBlender {
    pub fn new(config: ExpressionConfig, rig: &MorphRig) -> Self {
        let bound: Vec<(&'static str, ChannelId)> = expression_union()
            .into_iter()
            .filter_map(|name| rig.channel(name).map(|id| (name, id)))
            .collect();

        let targets: Vec<Vec<f32>> = Expression::all()
            .iter()
            .map(|expr| {
                let table = expr.targets();
                bound
                    .iter()
                    .map(|(name, _)| {
                        table
                            .iter()
                            .find(|(n, _)| n == name)
                            .map(|(_, w)| *w)
                            .unwrap_or(0.0)
                    })
                    .collect::<Vec<f32>>()
            })
            .collect();

        Self {
            config,
            channels: bound.into_iter().map(|(_, id)| id).collect(),
            targets,
            active: Expression::Neutral,
        }
    }

    /// Expression being blended toward
    pub fn active(&self) -> Expression {
        self.active
    }

    /// Channels this blender owns on the bound rig
    pub fn channels(&self) -> &[ChannelId] {
        &self.channels
    }

    /// Blend every union channel one step toward `expression`
    pub fn tick(&mut self, expression: Expression, rig: &mut MorphRig) {
        if expression != self.active {
            tracing::trace!(from = ?self.active, to = ?expression, "expression target changed");
            self.active = expression;
        }

        let targets = &self.targets[expression.index()];
        for (slot, id) in self.channels.iter().enumerate() {
            let next = blend(rig.get(*id), targets[slot], self.config.blend_factor);
            rig.set(*id, next);
        }
    }
}
