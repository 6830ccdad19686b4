//! Pronunciation records and CMUdict-format source parsing.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::phoneme::Phoneme;
use crate::error::{DictionaryError, DictionaryResult};

/// Rhyme key stored when a word is shorter than the window.
///
/// Never matches anything in a rhyme query.
pub const NULL_RHYME_KEY: &str = "NULL";

/// Normalize a word for dictionary lookup: uppercase, ASCII letters only.
pub fn normalize_word(word: &str) -> String {
    word.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Trailing-syllable window used as a rhyme key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RhymeTier {
    /// Last syllable only.
    One,
    /// Last two syllables.
    Two,
    /// Last three syllables.
    Three,
}

impl RhymeTier {
    /// Tiers from strongest to weakest match.
    pub const STRONGEST_FIRST: [Self; 3] = [Self::Three, Self::Two, Self::One];

    /// Number of trailing syllables in the window.
    pub const fn window(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    /// How many candidates a rhyme query takes from this tier.
    pub const fn cap(self) -> usize {
        match self {
            Self::One => 10,
            Self::Two | Self::Three => 3,
        }
    }

    const fn index(self) -> usize {
        self.window() - 1
    }
}

/// Stored phonetic data for one normalized word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PronunciationRecord {
    /// Normalized word (uppercase letters).
    pub word: String,
    /// Phonemes with stress, in order.
    pub phonemes: Vec<Phoneme>,
    /// Phoneme symbols with stress removed.
    pub symbols: Vec<String>,
    /// One syllable per phoneme.
    pub syllable_count: usize,
    /// Rhyme keys for windows of 1, 2 and 3 trailing syllables.
    pub rhyme_keys: [String; 3],
}

impl PronunciationRecord {
    /// Build a record, deriving symbols, syllable count and rhyme keys.
    pub fn new(word: impl Into<String>, phonemes: Vec<Phoneme>) -> Self {
        let symbols: Vec<String> = phonemes.iter().map(|p| p.symbol.clone()).collect();
        let rhyme_keys = [RhymeTier::One, RhymeTier::Two, RhymeTier::Three]
            .map(|tier| trailing_key(&symbols, tier.window()));
        Self {
            word: word.into(),
            syllable_count: phonemes.len(),
            phonemes,
            symbols,
            rhyme_keys,
        }
    }

    /// The rhyme key for `tier`.
    pub fn rhyme_key(&self, tier: RhymeTier) -> &str {
        &self.rhyme_keys[tier.index()]
    }
}

fn trailing_key(symbols: &[String], window: usize) -> String {
    if symbols.len() < window {
        return NULL_RHYME_KEY.to_string();
    }
    symbols[symbols.len() - window..].join(" ")
}

/// Records parsed from one pronunciation source.
#[derive(Debug, Default)]
pub struct IngestBatch {
    /// One record per distinct normalized word, in source order.
    pub records: Vec<PronunciationRecord>,
    /// Entries skipped because an earlier entry had the same normalized word.
    pub duplicates: usize,
}

/// Parse a CMUdict-format source.
///
/// Lines starting with `;` and blank lines are skipped. The first entry for a
/// normalized word wins, so alternates like `ROSES(1)` are dropped.
#[tracing::instrument(skip_all, fields(source_len = text.len()))]
pub fn parse_source(text: &str) -> DictionaryResult<IngestBatch> {
    let mut batch = IngestBatch::default();
    let mut seen = HashSet::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim_end();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        let malformed = || DictionaryError::MalformedEntry {
            line: idx + 1,
            content: line.to_string(),
        };

        let (word, phonemes) = line.split_once("  ").ok_or_else(malformed)?;
        let phonemes = phonemes
            .split_whitespace()
            .map(Phoneme::parse)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(malformed)?;
        if phonemes.is_empty() {
            return Err(malformed());
        }

        let word = normalize_word(word);
        if word.is_empty() {
            tracing::debug!(line = idx + 1, "skipping entry with no letters");
            continue;
        }
        if !seen.insert(word.clone()) {
            batch.duplicates += 1;
            continue;
        }
        batch.records.push(PronunciationRecord::new(word, phonemes));
    }

    if batch.records.is_empty() {
        return Err(DictionaryError::EmptySource);
    }
    tracing::debug!(
        records = batch.records.len(),
        duplicates = batch.duplicates,
        "parsed pronunciation source"
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phonemes(src: &str) -> Vec<Phoneme> {
        src.split(' ').map(|t| Phoneme::parse(t).unwrap()).collect()
    }

    #[test]
    fn normalize_strips_non_letters() {
        assert_eq!(normalize_word("night,"), "NIGHT");
        assert_eq!(normalize_word("O'er"), "OER");
        assert_eq!(normalize_word("ROSES(1)"), "ROSES");
        assert_eq!(normalize_word("42"), "");
    }

    #[test]
    fn rhyme_keys_are_right_aligned_windows() {
        let record = PronunciationRecord::new("DELIGHT", phonemes("D IH0 L AY1 T"));
        assert_eq!(record.syllable_count, 5);
        assert_eq!(record.symbols, vec!["D", "IH", "L", "AY", "T"]);
        assert_eq!(record.rhyme_key(RhymeTier::One), "T");
        assert_eq!(record.rhyme_key(RhymeTier::Two), "AY T");
        assert_eq!(record.rhyme_key(RhymeTier::Three), "L AY T");
    }

    #[test]
    fn short_words_get_null_keys() {
        let record = PronunciationRecord::new("ARE", phonemes("AA1 R"));
        assert_eq!(record.syllable_count, 2);
        assert_eq!(record.rhyme_key(RhymeTier::One), "R");
        assert_eq!(record.rhyme_key(RhymeTier::Two), "AA R");
        assert_eq!(record.rhyme_key(RhymeTier::Three), NULL_RHYME_KEY);

        let record = PronunciationRecord::new("EH", phonemes("EH1"));
        assert_eq!(record.rhyme_key(RhymeTier::Two), NULL_RHYME_KEY);
    }

    #[test]
    fn parse_skips_comments_and_blank_lines() {
        let src = ";;; CMUdict header\n\nRED  R EH1 D\n;;; trailing comment\nBLUE  B L UW1\n";
        let batch = parse_source(src).unwrap();
        let words: Vec<_> = batch.records.iter().map(|r| r.word.as_str()).collect();
        assert_eq!(words, vec!["RED", "BLUE"]);
    }

    #[test]
    fn syllable_count_matches_phoneme_count_for_every_entry() {
        let src = "ROSES  R OW1 Z AH0 Z\nVIOLETS  V AY1 AH0 L AH0 T S\nSO  S OW1\n";
        for record in parse_source(src).unwrap().records {
            assert_eq!(record.syllable_count, record.phonemes.len());
        }
    }

    #[test]
    fn first_duplicate_wins() {
        let src = "ROSES  R OW1 Z AH0 Z\nROSES(1)  R OW1 Z IH0 Z\n";
        let batch = parse_source(src).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.duplicates, 1);
        assert_eq!(batch.records[0].rhyme_key(RhymeTier::Two), "AH Z");
    }

    #[test]
    fn crlf_sources_parse() {
        let batch = parse_source("NIGHT  N AY1 T\r\nSIGHT  S AY1 T\r\n").unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[1].rhyme_key(RhymeTier::One), "T");
    }

    #[test]
    fn malformed_entries_fail_with_line_number() {
        let err = parse_source("RED  R EH1 D\nBLUE B L UW1\n").unwrap_err();
        assert!(matches!(err, DictionaryError::MalformedEntry { line: 2, .. }));

        let err = parse_source("RED  r eh1 d\n").unwrap_err();
        assert!(matches!(err, DictionaryError::MalformedEntry { line: 1, .. }));
    }

    #[test]
    fn empty_source_is_an_error() {
        assert!(matches!(
            parse_source(";;; only comments\n"),
            Err(DictionaryError::EmptySource)
        ));
    }
}
