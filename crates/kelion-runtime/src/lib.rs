//! Kelion Runtime - Engine orchestration and the frame loop
//!
//! This crate implements the per-frame scheduler:
//! 1. Presence-derived phase accumulators
//! 2. Orientation
//! 3. Emotion blending
//! 4. Gaze & blink
//! 5. Viseme timeline
//! 6. Amplitude fallback
//! 7. Sync monitor
//!
//! plus the pieces a host needs around it: configuration loading, logging
//! setup and an async driver that ticks the engine on a tokio task.

pub mod config;
pub mod driver;
pub mod engine;
pub mod sync;
pub mod telemetry;

pub use config::*;
pub use driver::*;
pub use engine::*;
pub use sync::*;
pub use telemetry::*;
