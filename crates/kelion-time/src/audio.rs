//! Audio clock interface
//!
//! The audio playback collaborator owns decoding, buffering and output. The
//! engine only ever polls it: where is playback right now, is it running,
//! and (optionally) what does the current buffer look like in the frequency
//! domain.

/// Playback status as seen from the animation loop
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    /// Nothing has started yet, or the source was paused
    #[default]
    Paused,
    /// Audio is audibly playing
    Playing,
    /// Playback reached the end of the utterance
    Ended,
}

/// Read-only view of an audio playback clock
pub trait AudioClock: Send {
    /// Current playback position in seconds
    fn current_time(&self) -> f64;

    /// Is playback paused?
    fn paused(&self) -> bool;

    /// Has playback reached the end?
    fn ended(&self) -> bool;

    /// Fill `bins` with byte-scaled frequency magnitudes of the buffer that
    /// is playing right now.
    ///
    /// Returns `false` when no analyser is attached to this source; `bins`
    /// is left untouched in that case.
    fn frequency_data(&mut self, bins: &mut [u8]) -> bool {
        let _ = bins;
        false
    }

    /// Does this source provide frequency data at all?
    fn has_analyser(&self) -> bool {
        false
    }

    /// Combined playback status
    fn status(&self) -> PlaybackStatus {
        if self.ended() {
            PlaybackStatus::Ended
        } else if self.paused() {
            PlaybackStatus::Paused
        } else {
            PlaybackStatus::Playing
        }
    }

    /// A clock reference is valid when it reports a finite, non-negative
    /// position
    fn is_valid(&self) -> bool {
        let t = self.current_time();
        t.is_finite() && t >= 0.0
    }
}
