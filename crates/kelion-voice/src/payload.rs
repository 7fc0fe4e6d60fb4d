//! Lipsync payloads from the conversational backend
//!
//! ```json
//! {"words": [{"word": "hi", "start": 0.0, "end": 0.2}],
//!  "visemes": [{"t0": 0.0, "t1": 0.2, "viseme": "EE"}]}
//! ```

use kelion_core::{KelionError, KelionResult};
use serde::{Deserialize, Serialize};

use crate::{timeline_from_words, VisemeEntry, VisemeTimeline, WordTiming};

/// Word and viseme timings for one utterance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LipsyncPayload {
    #[serde(default)]
    pub words: Vec<WordTiming>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visemes: Option<Vec<VisemeEntry>>,
}

impl LipsyncPayload {
    pub fn from_json(json: &str) -> KelionResult<Self> {
        serde_json::from_str(json).map_err(|e| KelionError::InvalidPayload(e.to_string()))
    }

    /// Build a payload from word timings, deriving the visemes
    pub fn from_words(words: Vec<WordTiming>) -> KelionResult<Self> {
        let timeline = timeline_from_words(&words)?;
        Ok(Self {
            words,
            visemes: Some(timeline.entries().to_vec()),
        })
    }

    /// Timeline for this payload.
    ///
    /// Explicit visemes are used as given and must form a valid timeline;
    /// without them the timeline is rebuilt from the words.
    pub fn timeline(&self) -> KelionResult<VisemeTimeline> {
        match &self.visemes {
            Some(visemes) if !visemes.is_empty() => VisemeTimeline::new(visemes.clone()),
            _ => timeline_from_words(&self.words),
        }
    }
}
