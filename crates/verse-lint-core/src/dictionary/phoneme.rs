//! ARPAbet phonemes with stress markers.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `AH0`, `T`, `UW1`: an uppercase symbol with an optional stress digit.
static PHONEME_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]+)([0-9]?)$").expect("valid regex"));

/// One sound unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Phoneme {
    /// Sound symbol without stress (`AH`, `T`, `UW`).
    pub symbol: String,
    /// 0 = unstressed, 1 = primary, 2 = secondary.
    pub stress: u8,
}

impl Phoneme {
    /// Parse a source token such as `AY1` or `T`.
    ///
    /// Returns `None` when the token is not `<UPPERCASE LETTERS><digit>?`.
    pub fn parse(token: &str) -> Option<Self> {
        let caps = PHONEME_TOKEN.captures(token)?;
        let stress = match caps.get(2).map(|m| m.as_str()) {
            Some("") | None => 0,
            Some(digit) => digit.parse().ok()?,
        };
        Some(Self {
            symbol: caps[1].to_string(),
            stress,
        })
    }

    /// Whether this phoneme carries primary or secondary stress.
    pub const fn is_stressed(&self) -> bool {
        self.stress > 0
    }
}

impl fmt::Display for Phoneme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.symbol, self.stress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vowel_with_stress() {
        let p = Phoneme::parse("AY1").unwrap();
        assert_eq!(p.symbol, "AY");
        assert_eq!(p.stress, 1);
        assert!(p.is_stressed());
    }

    #[test]
    fn consonant_defaults_to_unstressed() {
        let p = Phoneme::parse("NG").unwrap();
        assert_eq!(p.symbol, "NG");
        assert_eq!(p.stress, 0);
        assert!(!p.is_stressed());
    }

    #[test]
    fn rejects_lowercase_and_garbage() {
        assert!(Phoneme::parse("ay1").is_none());
        assert!(Phoneme::parse("").is_none());
        assert!(Phoneme::parse("1").is_none());
        assert!(Phoneme::parse("AY12").is_none());
    }

    #[test]
    fn display_always_includes_stress() {
        assert_eq!(Phoneme::parse("T").unwrap().to_string(), "T0");
        assert_eq!(Phoneme::parse("EH2").unwrap().to_string(), "EH2");
    }
}
