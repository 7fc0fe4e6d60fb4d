//! Orientation Controller
//!
//! Drives yaw / pitch / roll of the avatar root. The behaviour follows the
//! presence state through four modes:
//!
//! - Idle: slow composite sway of two phases, roll relaxes to 0
//! - Focused: yaw converges on the camera, roll decays
//! - Listening: yaw snaps to the camera, then freezes until the mode changes
//! - Processing: Focused plus a yaw wobble and a pulsing key-light hint

use kelion_core::{angle_delta, approach, PresenceKind};
use kelion_time::Phase;
use serde::{Deserialize, Serialize};

/// Orientation behaviour mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationMode {
    #[default]
    Idle,
    Focused,
    Listening,
    Processing,
}

impl OrientationMode {
    /// Mode for a behaviour state. The idle grace is applied by the caller
    /// (see `PresenceStore::behavior_state`).
    pub fn for_state(state: PresenceKind) -> Self {
        match state {
            PresenceKind::Idle => OrientationMode::Idle,
            PresenceKind::Listening => OrientationMode::Listening,
            PresenceKind::Processing | PresenceKind::Thinking => OrientationMode::Processing,
            PresenceKind::Speaking
            | PresenceKind::Happy
            | PresenceKind::Laughing
            | PresenceKind::Empathetic
            | PresenceKind::Crying
            | PresenceKind::Surprised
            | PresenceKind::Angry => OrientationMode::Focused,
        }
    }
}

/// Orientation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// Yaw convergence gain outside Listening
    pub yaw_gain: f32,
    /// Yaw convergence gain while Listening
    pub listen_gain: f32,
    /// Listening freezes once yaw is this close to the camera (radians)
    pub listen_epsilon: f32,
    /// Roll / pitch relaxation gain
    pub relax_gain: f32,

    /// Idle sway: primary phase
    pub sway_frequency: f32,
    pub sway_amplitude: f32,
    /// Idle sway: secondary "look around" phase
    pub look_frequency: f32,
    pub look_amplitude: f32,
    /// Idle pitch nod, driven by the secondary phase
    pub nod_amplitude: f32,

    /// Processing yaw wobble
    pub wobble_frequency: f32,
    pub wobble_amplitude: f32,

    /// Key-light pulse period while processing, seconds
    pub key_light_period: f32,
    pub key_light_base: f32,
    pub key_light_amplitude: f32,

    /// Camera world position (x, y, z)
    pub camera_position: [f32; 3],
    /// Avatar root world position (x, y, z)
    pub avatar_position: [f32; 3],
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            yaw_gain: 5.0,
            listen_gain: 10.0,
            listen_epsilon: 0.01,
            relax_gain: 3.0,
            sway_frequency: 0.11,
            sway_amplitude: 0.08,
            look_frequency: 0.037,
            look_amplitude: 0.12,
            nod_amplitude: 0.03,
            wobble_frequency: 0.6,
            wobble_amplitude: 0.05,
            key_light_period: 1.0,
            key_light_base: 0.8,
            key_light_amplitude: 0.2,
            camera_position: [0.0, 1.5, 2.0],
            avatar_position: [0.0, 0.0, 0.0],
        }
    }
}

impl OrientationConfig {
    /// Yaw that makes the avatar face the camera
    pub fn camera_yaw(&self) -> f32 {
        let dx = self.camera_position[0] - self.avatar_position[0];
        let dz = self.camera_position[2] - self.avatar_position[2];
        dx.atan2(dz)
    }
}

/// Root rotation, radians
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Orientation {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

/// Orientation controller
#[derive(Debug)]
pub struct OrientationController {
    config: OrientationConfig,
    mode: OrientationMode,
    pose: Orientation,
    target_yaw: f32,
    /// Listening converged; rotation updates are suspended
    frozen: bool,
    sway: Phase,
    look: Phase,
    wobble: Phase,
    pulse: Phase,
    key_light: Option<f32>,
}

impl OrientationController {
    pub fn new(config: OrientationConfig) -> Self {
        let pulse_hz = if config.key_light_period > 0.0 {
            1.0 / config.key_light_period
        } else {
            0.0
        };
        Self {
            sway: Phase::new(config.sway_frequency),
            look: Phase::new(config.look_frequency).with_offset(1.3),
            wobble: Phase::new(config.wobble_frequency),
            pulse: Phase::new(pulse_hz),
            mode: OrientationMode::Idle,
            pose: Orientation::default(),
            target_yaw: 0.0,
            frozen: false,
            key_light: None,
            config,
        }
    }

    pub fn mode(&self) -> OrientationMode {
        self.mode
    }

    pub fn pose(&self) -> Orientation {
        self.pose
    }

    /// Mutable access for the sync monitor's angle clamps
    pub fn pose_mut(&mut self) -> &mut Orientation {
        &mut self.pose
    }

    pub fn set_pose(&mut self, pose: Orientation) {
        self.pose = pose;
    }

    pub fn target_yaw(&self) -> f32 {
        self.target_yaw
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Key-light intensity hint; only present while processing
    pub fn key_light(&self) -> Option<f32> {
        self.key_light
    }

    pub fn config(&self) -> &OrientationConfig {
        &self.config
    }

    /// Advance one frame in `mode`
    pub fn tick(&mut self, dt: f32, mode: OrientationMode) -> Orientation {
        if mode != self.mode {
            tracing::debug!(from = ?self.mode, to = ?mode, "orientation mode changed");
            self.mode = mode;
            self.frozen = false;
            if mode != OrientationMode::Processing {
                self.key_light = None;
            }
        }

        match mode {
            OrientationMode::Idle => self.tick_idle(dt),
            OrientationMode::Focused => self.tick_focused(dt, 0.0),
            OrientationMode::Listening => self.tick_listening(dt),
            OrientationMode::Processing => {
                let wobble = self.wobble.advance(dt, 1.0).sin() * self.config.wobble_amplitude;
                self.tick_focused(dt, wobble);

                let pulse = self.pulse.advance(dt, 1.0).sin();
                self.key_light =
                    Some(self.config.key_light_base + pulse * self.config.key_light_amplitude);
            }
        }

        self.pose
    }

    fn tick_idle(&mut self, dt: f32) {
        let sway = self.sway.advance(dt, 1.0).sin();
        let look = self.look.advance(dt, 1.0).sin();

        self.target_yaw = sway * self.config.sway_amplitude + look * self.config.look_amplitude;
        self.converge_yaw(dt, self.config.yaw_gain);

        let nod = (self.look.value() * 2.0).sin() * self.config.nod_amplitude;
        self.pose.pitch = approach(self.pose.pitch, nod, dt, self.config.relax_gain);
        self.pose.roll = approach(self.pose.roll, 0.0, dt, self.config.relax_gain);
    }

    fn tick_focused(&mut self, dt: f32, yaw_offset: f32) {
        self.target_yaw = self.config.camera_yaw() + yaw_offset;
        self.converge_yaw(dt, self.config.yaw_gain);
        self.pose.pitch = approach(self.pose.pitch, 0.0, dt, self.config.relax_gain);
        self.pose.roll = approach(self.pose.roll, 0.0, dt, self.config.relax_gain);
    }

    fn tick_listening(&mut self, dt: f32) {
        if self.frozen {
            return;
        }

        self.target_yaw = self.config.camera_yaw();
        self.converge_yaw(dt, self.config.listen_gain);
        self.pose.pitch = approach(self.pose.pitch, 0.0, dt, self.config.listen_gain);
        self.pose.roll = approach(self.pose.roll, 0.0, dt, self.config.listen_gain);

        if angle_delta(self.pose.yaw, self.target_yaw).abs() < self.config.listen_epsilon {
            self.frozen = true;
            tracing::trace!(yaw = self.pose.yaw, "listening orientation frozen");
        }
    }

    fn converge_yaw(&mut self, dt: f32, gain: f32) {
        let delta = angle_delta(self.pose.yaw, self.target_yaw);
        self.pose.yaw += delta * (dt * gain).clamp(0.0, 1.0);
    }
}

impl Default for OrientationController {
    fn default() -> Self {
        Self::new(OrientationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn off_axis() -> OrientationController {
        OrientationController::new(OrientationConfig {
            camera_position: [1.0, 1.5, 2.0],
            ..Default::default()
        })
    }

    #[test]
    fn test_mode_for_state() {
        assert_eq!(
            OrientationMode::for_state(PresenceKind::Laughing),
            OrientationMode::Focused
        );
        assert_eq!(
            OrientationMode::for_state(PresenceKind::Thinking),
            OrientationMode::Processing
        );
        assert_eq!(
            OrientationMode::for_state(PresenceKind::Listening),
            OrientationMode::Listening
        );
        assert_eq!(
            OrientationMode::for_state(PresenceKind::Idle),
            OrientationMode::Idle
        );
    }

    #[test]
    fn test_camera_yaw() {
        let ctl = off_axis();
        assert!((ctl.config().camera_yaw() - 0.5f32.atan()).abs() < 1e-6);
        assert_eq!(OrientationConfig::default().camera_yaw(), 0.0);
    }

    #[test]
    fn test_listening_converges_then_freezes() {
        let mut ctl = off_axis();
        ctl.set_pose(Orientation {
            yaw: 0.0,
            pitch: 0.1,
            roll: 0.2,
        });

        for _ in 0..50 {
            ctl.tick(DT, OrientationMode::Listening);
        }
        assert!(ctl.is_frozen());
        let target = ctl.config().camera_yaw();
        assert!((ctl.pose().yaw - target).abs() < 0.01);

        let frozen = ctl.pose();
        for _ in 0..100 {
            assert_eq!(ctl.tick(DT, OrientationMode::Listening), frozen);
        }
    }

    #[test]
    fn test_mode_change_unfreezes() {
        let mut ctl = off_axis();
        for _ in 0..50 {
            ctl.tick(DT, OrientationMode::Listening);
        }
        assert!(ctl.is_frozen());

        ctl.tick(DT, OrientationMode::Idle);
        assert!(!ctl.is_frozen());
    }

    #[test]
    fn test_focused_decays_roll() {
        let mut ctl = off_axis();
        ctl.set_pose(Orientation {
            yaw: -0.5,
            pitch: 0.0,
            roll: 0.3,
        });
        for _ in 0..300 {
            ctl.tick(DT, OrientationMode::Focused);
        }
        assert!(ctl.pose().roll.abs() < 1e-3);
        assert!((ctl.pose().yaw - ctl.config().camera_yaw()).abs() < 1e-3);
    }

    #[test]
    fn test_idle_sway_moves() {
        let mut ctl = OrientationController::default();
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for _ in 0..(20.0 / DT) as usize {
            let yaw = ctl.tick(DT, OrientationMode::Idle).yaw;
            min = min.min(yaw);
            max = max.max(yaw);
        }
        assert!(max - min > 0.05);
        assert!(max.abs() < 0.25 && min.abs() < 0.25);
    }

    #[test]
    fn test_key_light_only_while_processing() {
        let mut ctl = OrientationController::default();
        ctl.tick(DT, OrientationMode::Processing);
        let light = ctl.key_light().unwrap();
        assert!((0.6..=1.0).contains(&light));

        ctl.tick(DT, OrientationMode::Focused);
        assert!(ctl.key_light().is_none());
    }

    #[test]
    fn test_wrapped_convergence_takes_short_way() {
        let mut ctl = OrientationController::default();
        ctl.set_pose(Orientation {
            yaw: 6.2,
            pitch: 0.0,
            roll: 0.0,
        });
        ctl.tick(DT, OrientationMode::Focused);
        // 6.2 rad is just short of a full turn; moving toward 0 means increasing
        assert!(ctl.pose().yaw > 6.2);
    }
}
