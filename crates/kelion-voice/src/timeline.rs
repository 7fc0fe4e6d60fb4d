//! Viseme Timeline - mouth shapes on the audio clock
//!
//! A timeline is validated once, when it is set, and never changes
//! afterwards. A new utterance brings a new timeline.

use std::fmt;

use kelion_core::{KelionError, KelionResult, Viseme};
use serde::{Deserialize, Serialize};

/// One mouth shape held over `[t0, t1]` seconds of audio
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisemeEntry {
    pub viseme: Viseme,
    pub t0: f64,
    pub t1: f64,
}

impl VisemeEntry {
    pub fn new(viseme: Viseme, t0: f64, t1: f64) -> Self {
        Self { viseme, t0, t1 }
    }

    /// Is `t` inside this entry (both ends inclusive)?
    #[inline]
    pub fn contains(&self, t: f64) -> bool {
        t >= self.t0 && t <= self.t1
    }

    pub fn duration(&self) -> f64 {
        self.t1 - self.t0
    }
}

impl fmt::Debug for VisemeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{:.3}..{:.3}]", self.viseme, self.t0, self.t1)
    }
}

/// Ordered, non-overlapping viseme entries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisemeTimeline {
    entries: Vec<VisemeEntry>,
}

impl VisemeTimeline {
    /// Validate and build a timeline.
    ///
    /// Entries must have finite, non-negative times with `t0 <= t1`, be
    /// sorted by `t0`, and not overlap (touching ends are fine).
    pub fn new(entries: Vec<VisemeEntry>) -> KelionResult<Self> {
        for (index, entry) in entries.iter().enumerate() {
            let invalid = |reason: &str| KelionError::InvalidTimeline {
                index,
                reason: reason.to_string(),
            };

            if !entry.t0.is_finite() || !entry.t1.is_finite() {
                return Err(invalid("non-finite time"));
            }
            if entry.t0 < 0.0 {
                return Err(invalid("negative start time"));
            }
            if entry.t1 < entry.t0 {
                return Err(invalid("ends before it starts"));
            }
            if index > 0 {
                let prev = &entries[index - 1];
                if entry.t0 < prev.t0 {
                    return Err(invalid("not sorted by start time"));
                }
                if entry.t0 < prev.t1 {
                    return Err(invalid("overlaps previous entry"));
                }
            }
        }

        Ok(Self { entries })
    }

    /// A timeline with no entries
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[VisemeEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&VisemeEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Start of the first entry
    pub fn start(&self) -> Option<f64> {
        self.entries.first().map(|e| e.t0)
    }

    /// End of the last entry
    pub fn end(&self) -> Option<f64> {
        self.entries.last().map(|e| e.t1)
    }

    /// Entry covering `t`, by binary search. The player uses its own cursor;
    /// this is for random access.
    pub fn entry_at(&self, t: f64) -> Option<&VisemeEntry> {
        let idx = self.entries.partition_point(|e| e.t1 < t);
        self.entries.get(idx).filter(|e| e.contains(t))
    }
}

impl TryFrom<Vec<VisemeEntry>> for VisemeTimeline {
    type Error = KelionError;

    fn try_from(entries: Vec<VisemeEntry>) -> KelionResult<Self> {
        Self::new(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(v: Viseme, t0: f64, t1: f64) -> VisemeEntry {
        VisemeEntry::new(v, t0, t1)
    }

    #[test]
    fn test_valid_timeline() {
        let tl = VisemeTimeline::new(vec![
            e(Viseme::AA, 0.0, 0.3),
            e(Viseme::Rest, 0.3, 1.0),
        ])
        .unwrap();
        assert_eq!(tl.len(), 2);
        assert_eq!(tl.end(), Some(1.0));
    }

    #[test]
    fn test_overlap_rejected() {
        let err = VisemeTimeline::new(vec![e(Viseme::AA, 0.0, 0.3), e(Viseme::EE, 0.2, 0.5)])
            .unwrap_err();
        assert!(matches!(err, KelionError::InvalidTimeline { index: 1, .. }));
    }

    #[test]
    fn test_unsorted_rejected() {
        let err = VisemeTimeline::new(vec![e(Viseme::AA, 0.5, 0.6), e(Viseme::EE, 0.1, 0.2)])
            .unwrap_err();
        assert!(matches!(err, KelionError::InvalidTimeline { index: 1, .. }));
    }

    #[test]
    fn test_bad_times_rejected() {
        assert!(VisemeTimeline::new(vec![e(Viseme::AA, f64::NAN, 0.3)]).is_err());
        assert!(VisemeTimeline::new(vec![e(Viseme::AA, 0.4, 0.3)]).is_err());
        assert!(VisemeTimeline::new(vec![e(Viseme::AA, -0.1, 0.3)]).is_err());
        assert!(VisemeTimeline::new(vec![e(Viseme::AA, 0.0, f64::INFINITY)]).is_err());
    }

    #[test]
    fn test_entry_at() {
        let tl = VisemeTimeline::new(vec![
            e(Viseme::AA, 0.0, 0.3),
            e(Viseme::EE, 0.5, 0.8),
        ])
        .unwrap();
        assert_eq!(tl.entry_at(0.1).map(|e| e.viseme), Some(Viseme::AA));
        assert_eq!(tl.entry_at(0.4), None);
        assert_eq!(tl.entry_at(0.8).map(|e| e.viseme), Some(Viseme::EE));
        assert_eq!(tl.entry_at(2.0), None);
    }

    #[test]
    fn test_deserialize_entries() {
        let entries: Vec<VisemeEntry> =
            serde_json::from_str(r#"[{"viseme":"aa","t0":0.0,"t1":0.3}]"#).unwrap();
        assert_eq!(entries[0].viseme, Viseme::AA);
        assert!(serde_json::from_str::<Vec<VisemeEntry>>(r#"[{"viseme":"ZZ","t0":0,"t1":1}]"#)
            .is_err());
    }
}
