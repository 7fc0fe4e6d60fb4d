//! Kelion Core - Fundamental types and primitives
//!
//! This crate defines the vocabulary shared by every part of the engine:
//! - Engine time (EngineTime)
//! - Presence states and emotions
//! - Viseme codes
//! - Exponential smoothing helpers
//! - The error type returned at the engine boundary

pub mod duration;
pub mod error;
pub mod math;
pub mod state;
pub mod time;
pub mod viseme;

pub use error::*;
pub use math::*;
pub use state::*;
pub use time::*;
pub use viseme::*;
