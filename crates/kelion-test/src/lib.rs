//! Kelion Test - Test harness and benchmarking tools
//!
//! Provides:
//! - Scripted audio clock with controllable position, status and energy
//! - Scenario harness driving an engine at a fixed frame delta
//! - Adversarial input generator (state churn, malformed timelines, dt jitter)
//! - Correction log collecting sync-monitor repairs

pub mod adversarial;
pub mod audio;
pub mod harness;

pub use adversarial::*;
pub use audio::*;
pub use harness::*;
