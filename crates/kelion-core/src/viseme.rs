//! Viseme codes
//!
//! A viseme is the visual mouth shape for one or more phonemes. The backend
//! emits these codes in its lipsync timelines; each code drives exactly one
//! morph channel on the avatar.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::KelionError;

/// Mouth shape categories used by lipsync timelines
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Viseme {
    /// Closed / resting mouth. Reserved: always driven at rest intensity.
    #[default]
    Rest,
    AA, // "ah" as in "father"
    EE, // "ee" as in "see"
    OO, // "oo" as in "boot"
    TH, // tongue between teeth
    CH, // "ch", "sh", "j"
    FV, // teeth on lip
    MBP, // lips together
    KG, // back of tongue
    S,  // teeth together
    R,  // lips slightly rounded
    L,  // tongue on ridge
    WQ, // rounded, pursed lips
}

impl Viseme {
    /// All visemes, `Rest` first
    pub fn all() -> &'static [Viseme] {
        &[
            Viseme::Rest,
            Viseme::AA,
            Viseme::EE,
            Viseme::OO,
            Viseme::TH,
            Viseme::CH,
            Viseme::FV,
            Viseme::MBP,
            Viseme::KG,
            Viseme::S,
            Viseme::R,
            Viseme::L,
            Viseme::WQ,
        ]
    }

    /// Number of visemes
    pub fn count() -> usize {
        13
    }

    /// Wire code as used in lipsync timelines
    pub fn code(self) -> &'static str {
        match self {
            Viseme::Rest => "REST",
            Viseme::AA => "AA",
            Viseme::EE => "EE",
            Viseme::OO => "OO",
            Viseme::TH => "TH",
            Viseme::CH => "CH",
            Viseme::FV => "FV",
            Viseme::MBP => "MBP",
            Viseme::KG => "KG",
            Viseme::S => "S",
            Viseme::R => "R",
            Viseme::L => "L",
            Viseme::WQ => "WQ",
        }
    }

    /// Morph channel this viseme drives on a standard avatar rig
    pub fn channel_name(self) -> &'static str {
        match self {
            Viseme::Rest => "viseme_sil",
            Viseme::AA => "viseme_aa",
            Viseme::EE => "viseme_I",
            Viseme::OO => "viseme_U",
            Viseme::TH => "viseme_TH",
            Viseme::CH => "viseme_CH",
            Viseme::FV => "viseme_FF",
            Viseme::MBP => "viseme_PP",
            Viseme::KG => "viseme_kk",
            Viseme::S => "viseme_SS",
            Viseme::R => "viseme_RR",
            Viseme::L => "viseme_nn",
            Viseme::WQ => "viseme_O",
        }
    }

    /// Open-jaw vowel shapes
    pub fn is_open_mouth(self) -> bool {
        matches!(self, Viseme::AA | Viseme::EE | Viseme::OO | Viseme::WQ)
    }

    /// Position in [`Viseme::all`]
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Viseme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Viseme {
    type Err = KelionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        // "SIL" is what most TTS aligners call silence
        if code == "SIL" {
            return Ok(Viseme::Rest);
        }
        Viseme::all()
            .iter()
            .copied()
            .find(|v| v.code() == code)
            .ok_or_else(|| KelionError::UnknownViseme(s.to_string()))
    }
}

impl TryFrom<String> for Viseme {
    type Error = KelionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Viseme> for String {
    fn from(value: Viseme) -> Self {
        value.code().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viseme_codes_parse() {
        assert_eq!("AA".parse::<Viseme>().unwrap(), Viseme::AA);
        assert_eq!("mbp".parse::<Viseme>().unwrap(), Viseme::MBP);
        assert_eq!("sil".parse::<Viseme>().unwrap(), Viseme::Rest);
        assert!("XYZ".parse::<Viseme>().is_err());
    }

    #[test]
    fn test_viseme_index_matches_table() {
        assert_eq!(Viseme::all().len(), Viseme::count());
        for (i, v) in Viseme::all().iter().enumerate() {
            assert_eq!(v.index(), i);
        }
    }

    #[test]
    fn test_viseme_channels_distinct() {
        let mut names: Vec<_> = Viseme::all().iter().map(|v| v.channel_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Viseme::count());
    }
}
