//! Kelion Time - Clocks the animation loop depends on
//!
//! This crate implements:
//! - The frame clock: wall-clock deltas, clamped so a stalled frame never
//!   produces a visible jump
//! - The audio clock interface: read-only view of the playback collaborator
//! - Phase accumulators for the slow periodic motions (breathing, sway)

pub mod audio;
pub mod clock;
pub mod phase;

pub use audio::*;
pub use clock::*;
pub use phase::*;
