//! Word timings to visemes
//!
//! When the backend only knows when each word was spoken, one viseme per
//! word is a usable approximation: the leading consonant cluster decides
//! the mouth shape, otherwise the first vowel run does.

use kelion_core::{KelionResult, Viseme};
use serde::{Deserialize, Serialize};

use crate::{VisemeEntry, VisemeTimeline};

/// Duration assumed for a word that has no end time, seconds
pub const DEFAULT_WORD_DURATION: f64 = 0.12;

/// A word and when it was spoken
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
}

impl WordTiming {
    pub fn new(word: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            word: word.into(),
            start: Some(start),
            end: Some(end),
        }
    }
}

/// Leading consonant clusters, checked in order
static PREFIX_RULES: &[(&[&str], Viseme)] = &[
    (&["th"], Viseme::TH),
    (&["ch", "sh", "j", "zh"], Viseme::CH),
    (&["f", "v"], Viseme::FV),
    (&["m", "b", "p"], Viseme::MBP),
    (&["k", "g", "q", "c"], Viseme::KG),
    (&["s", "z", "x"], Viseme::S),
    (&["r"], Viseme::R),
    (&["l"], Viseme::L),
    (&["w"], Viseme::WQ),
];

const ROUNDED_RUNS: &[&str] = &["oo", "u", "ou", "ow", "ua", "uo"];
const SPREAD_RUNS: &[&str] = &["ee", "i", "ie", "ei", "y", "ea"];

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y' | 'ă' | 'â' | 'î' | 'ș' | 'ț')
}

/// Viseme for a whole word
pub fn viseme_for_word(word: &str) -> Viseme {
    let word = word.trim().to_lowercase();
    if word.is_empty() {
        return Viseme::Rest;
    }

    for (prefixes, viseme) in PREFIX_RULES {
        if prefixes.iter().any(|p| word.starts_with(p)) {
            return *viseme;
        }
    }

    // First maximal vowel run
    let run: String = word
        .chars()
        .skip_while(|c| !is_vowel(*c))
        .take_while(|c| is_vowel(*c))
        .collect();

    if run.is_empty() {
        Viseme::Rest
    } else if ROUNDED_RUNS.contains(&run.as_str()) {
        Viseme::OO
    } else if SPREAD_RUNS.contains(&run.as_str()) {
        Viseme::EE
    } else {
        Viseme::AA
    }
}

/// Build a timeline from word timings.
///
/// A missing start is 0 and a missing end defaults to
/// `start + DEFAULT_WORD_DURATION`; non-finite, negative or reversed
/// timings are skipped. A word that would overlap its
/// predecessor is trimmed to start where the predecessor ends, and dropped
/// if nothing is left of it.
pub fn timeline_from_words(words: &[WordTiming]) -> KelionResult<VisemeTimeline> {
    let mut entries: Vec<VisemeEntry> = Vec::with_capacity(words.len());
    let mut skipped = 0usize;

    for word in words {
        let t0 = word.start.unwrap_or(0.0);
        let t1 = word.end.unwrap_or(t0 + DEFAULT_WORD_DURATION);
        if !t0.is_finite() || !t1.is_finite() || t0 < 0.0 || t1 < t0 {
            skipped += 1;
            continue;
        }

        let t0 = match entries.last() {
            Some(prev) if t0 < prev.t1 => prev.t1,
            _ => t0,
        };
        if t1 <= t0 {
            skipped += 1;
            continue;
        }

        entries.push(VisemeEntry::new(viseme_for_word(&word.word), t0, t1));
    }

    if skipped > 0 {
        tracing::debug!(skipped, kept = entries.len(), "dropped unusable word timings");
    }

    VisemeTimeline::new(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_rules() {
        assert_eq!(viseme_for_word("the"), Viseme::TH);
        assert_eq!(viseme_for_word("Shop"), Viseme::CH);
        assert_eq!(viseme_for_word("jump"), Viseme::CH);
        assert_eq!(viseme_for_word("very"), Viseme::FV);
        assert_eq!(viseme_for_word("people"), Viseme::MBP);
        assert_eq!(viseme_for_word("cat"), Viseme::KG);
        assert_eq!(viseme_for_word("zoo"), Viseme::S);
        assert_eq!(viseme_for_word("red"), Viseme::R);
        assert_eq!(viseme_for_word("lake"), Viseme::L);
        assert_eq!(viseme_for_word("we"), Viseme::WQ);
    }

    #[test]
    fn test_vowel_runs() {
        assert_eq!(viseme_for_word("out"), Viseme::OO);
        assert_eq!(viseme_for_word("hug"), Viseme::OO);
        assert_eq!(viseme_for_word("it"), Viseme::EE);
        assert_eq!(viseme_for_word("hit"), Viseme::EE);
        assert_eq!(viseme_for_word("yes"), Viseme::AA);
        assert_eq!(viseme_for_word("eat"), Viseme::EE);
        assert_eq!(viseme_for_word("and"), Viseme::AA);
        assert_eq!(viseme_for_word("hoe"), Viseme::AA);
    }

    #[test]
    fn test_no_vowels_is_rest() {
        assert_eq!(viseme_for_word(""), Viseme::Rest);
        assert_eq!(viseme_for_word("   "), Viseme::Rest);
        assert_eq!(viseme_for_word("hmm"), Viseme::Rest);
        assert_eq!(viseme_for_word("42"), Viseme::Rest);
    }

    #[test]
    fn test_padding_ignored() {
        assert_eq!(viseme_for_word(" Moon\n"), viseme_for_word("moon"));
        assert_eq!(viseme_for_word("\tbob "), Viseme::MBP);
    }

    #[test]
    fn test_missing_end_defaults() {
        let words = vec![WordTiming {
            word: "hello".into(),
            start: Some(1.0),
            end: None,
        }];
        let tl = timeline_from_words(&words).unwrap();
        let entry = tl.entries()[0];
        assert!((entry.t1 - 1.12).abs() < 1e-9);
    }

    #[test]
    fn test_overlaps_trimmed() {
        let words = vec![
            WordTiming::new("hello", 0.0, 0.4),
            WordTiming::new("there", 0.3, 0.7),
            WordTiming::new("you", 0.35, 0.6),
        ];
        let tl = timeline_from_words(&words).unwrap();
        assert_eq!(tl.len(), 2);
        assert_eq!(tl.entries()[1].t0, 0.4);
        assert_eq!(tl.entries()[1].viseme, Viseme::TH);
    }

    #[test]
    fn test_malformed_skipped() {
        let words = vec![
            WordTiming::new("a", f64::NAN, 0.1),
            WordTiming::new("b", 0.5, 0.2),
            WordTiming::new("c", 0.6, 0.8),
        ];
        let tl = timeline_from_words(&words).unwrap();
        assert_eq!(tl.len(), 1);
        assert_eq!(tl.entries()[0].viseme, Viseme::KG);
    }
}
