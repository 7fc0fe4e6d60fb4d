//! Engine configuration
//!
//! Every component keeps its own `*Config`; this aggregates them so a host
//! can load the whole engine from one TOML document. Missing sections and
//! fields take their defaults.
//!
//! ```toml
//! seed = 7
//! frame_interval = "16ms"
//!
//! [presence]
//! idle_grace = "2s"
//!
//! [blink]
//! duration = "90ms"
//! ```

use std::path::Path;
use std::time::Duration;

use kelion_core::{KelionError, KelionResult};
use kelion_presence::PresenceConfig;
use kelion_time::MAX_FRAME_DELTA;
use kelion_visual::{BlinkConfig, ExpressionConfig, GazeConfig, OrientationConfig};
use kelion_voice::{AmplitudeConfig, PlayerConfig};
use serde::{Deserialize, Serialize};

use crate::{LoggingConfig, SyncConfig};

/// Root motion (breathing / speaking bob)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Breathing frequency, Hz
    pub breath_frequency: f32,
    /// Vertical bob amplitude at rest
    pub breath_amplitude: f32,
    /// Vertical bob amplitude while speaking
    pub speaking_amplitude: f32,
    /// Breathing rate multiplier while speaking
    pub speaking_rate: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            breath_frequency: 0.25,
            breath_amplitude: 0.004,
            speaking_amplitude: 0.01,
            speaking_rate: 1.6,
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for blink / saccade randomness; entropy when absent
    pub seed: Option<u64>,
    /// Frame deltas are clamped to this
    #[serde(with = "kelion_core::duration")]
    pub max_frame_delta: Duration,
    /// Target frame interval of the async driver
    #[serde(with = "kelion_core::duration")]
    pub frame_interval: Duration,

    pub presence: PresenceConfig,
    pub expression: ExpressionConfig,
    pub gaze: GazeConfig,
    pub blink: BlinkConfig,
    pub orientation: OrientationConfig,
    pub motion: MotionConfig,
    pub player: PlayerConfig,
    pub amplitude: AmplitudeConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_frame_delta: MAX_FRAME_DELTA,
            frame_interval: Duration::from_micros(16_667),
            presence: PresenceConfig::default(),
            expression: ExpressionConfig::default(),
            gaze: GazeConfig::default(),
            blink: BlinkConfig::default(),
            orientation: OrientationConfig::default(),
            motion: MotionConfig::default(),
            player: PlayerConfig::default(),
            amplitude: AmplitudeConfig::default(),
            sync: SyncConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> KelionResult<Self> {
        let config: EngineConfig =
            toml::from_str(source).map_err(|e| KelionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> KelionResult<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> KelionResult<String> {
        toml::to_string(self).map_err(|e| KelionError::Config(e.to_string()))
    }

    /// Same configuration with a fixed seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Reject values the components cannot work with
    pub fn validate(&self) -> KelionResult<()> {
        fn check(ok: bool, what: &str) -> KelionResult<()> {
            if ok {
                Ok(())
            } else {
                Err(KelionError::Config(what.to_string()))
            }
        }

        check(!self.max_frame_delta.is_zero(), "max_frame_delta must be positive")?;
        check(!self.frame_interval.is_zero(), "frame_interval must be positive")?;
        check(
            self.blink.interval_min > 0.0 && self.blink.interval_min <= self.blink.interval_max,
            "blink interval must be a positive, ordered range",
        )?;
        check(
            self.gaze.saccade_min > 0.0 && self.gaze.saccade_min <= self.gaze.saccade_max,
            "saccade interval must be a positive, ordered range",
        )?;
        check(
            (0.0..=1.0).contains(&self.amplitude.smoothing),
            "amplitude.smoothing must be in [0, 1]",
        )?;
        check(
            (0.0..1.0).contains(&self.amplitude.silence_threshold),
            "amplitude.silence_threshold must be in [0, 1)",
        )?;
        check(
            self.sync.min_weight < self.sync.max_weight,
            "sync weight bounds must be ordered",
        )?;
        check(
            self.sync.max_pitch >= 0.0 && self.sync.max_roll >= 0.0,
            "sync angle limits must be non-negative",
        )?;
        check(
            (0.0..=1.0).contains(&self.sync.mouth_decay),
            "sync.mouth_decay must be in [0, 1]",
        )?;
        Ok(())
    }
}
