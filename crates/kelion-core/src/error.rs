//! Error types for the presence engine
//!
//! Errors only ever leave boundary calls (state changes, timeline uploads,
//! payload and config parsing). The per-frame tick never fails.

use thiserror::Error;

/// Core Kelion errors
#[derive(Error, Debug)]
pub enum KelionError {
    // Presence errors
    #[error("Unknown presence state: {0}")]
    UnknownState(String),

    #[error("Unknown emotion: {0}")]
    UnknownEmotion(String),

    // Lipsync errors
    #[error("Unknown viseme code: {0}")]
    UnknownViseme(String),

    #[error("Invalid viseme timeline at entry {index}: {reason}")]
    InvalidTimeline { index: usize, reason: String },

    #[error("Invalid lipsync payload: {0}")]
    InvalidPayload(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Kelion operations
pub type KelionResult<T> = Result<T, KelionError>;
