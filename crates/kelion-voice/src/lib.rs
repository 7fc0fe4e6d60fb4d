//! Kelion Voice - The mouth of the avatar
//!
//! This is NOT speech synthesis. Audio is produced elsewhere; this crate
//! makes the mouth follow it.
//!
//! Two sources drive the mouth, in strict precedence:
//!
//! - Viseme timeline: precomputed phoneme timing played against the audio
//!   clock. Authoritative whenever one is attached and the clock is valid.
//! - Amplitude fallback: jaw and mouth-open channels follow the energy of
//!   the playing audio when no timeline claimed the frame.
//!
//! # Timeline sources
//!
//! - Explicit `{viseme, t0, t1}` entries
//! - Lipsync payloads from the conversational backend (word timings)

pub mod amplitude;
pub mod payload;
pub mod player;
pub mod spectrum;
pub mod timeline;
pub mod words;

pub use amplitude::*;
pub use payload::*;
pub use player::*;
pub use spectrum::*;
pub use timeline::*;
pub use words::*;
