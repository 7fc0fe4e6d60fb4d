//! Kelion Presence - Conversational state as seen by the avatar
//!
//! The store is the only place the presence state is mutated, and it is only
//! mutated from external calls, never from the animation tick.

pub mod hint;
pub mod store;

pub use hint::*;
pub use store::*;
