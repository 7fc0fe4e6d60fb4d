//! Kelion Visual - The visible half of the avatar's presence
//!
//! This is NOT a renderer. Everything here produces target values (morph
//! weights, eye offsets, head angles) that a renderer consumes.
//!
//! # Components
//!
//! - Morph rig: the channel registry bound to the loaded avatar asset
//! - Expression blender: smooth facial expression per state / emotion
//! - Gaze & blink: independent saccade and blink timers
//! - Orientation: idle sway, focus tracking, listening freeze, processing
//! - Clip table: state to body-animation clip resolution

pub mod clips;
pub mod expression;
pub mod gaze;
pub mod orientation;
pub mod rig;

pub use clips::*;
pub use expression::*;
pub use gaze::*;
pub use orientation::*;
pub use rig::*;
