//! Ranked rhyme lookup over the pronunciation store.

use std::collections::HashSet;

use crate::dictionary::{Dictionary, RhymeTier, normalize_word};
use crate::error::DictionaryResult;

/// Default number of rhymes returned.
pub const DEFAULT_RHYME_LIMIT: usize = 10;

/// Rhymes for `word`, strongest match first, at most `limit`.
///
/// Three-syllable key matches rank above two-syllable ones, which rank above
/// single-syllable ones. A word appearing in several tiers keeps its highest
/// position. The word itself is never returned, and an unknown word has no
/// rhymes.
#[tracing::instrument(skip(dictionary))]
pub fn rhymes_for_blocking(
    dictionary: &Dictionary,
    word: &str,
    limit: usize,
) -> DictionaryResult<Vec<String>> {
    let normalized = normalize_word(word);
    let Some(record) = dictionary.lookup_blocking(&normalized)? else {
        tracing::debug!("no pronunciation; no rhymes");
        return Ok(Vec::new());
    };

    let store = dictionary.store();
    let mut seen = HashSet::new();
    let mut rhymes = Vec::new();
    for tier in RhymeTier::STRONGEST_FIRST {
        // One extra so excluding the word itself still leaves a full tier.
        let matches = store.find_by_rhyme_key(tier, record.rhyme_key(tier), tier.cap() + 1);
        let tier_matches = matches
            .into_iter()
            .filter(|candidate| *candidate != record.word)
            .take(tier.cap());
        for candidate in tier_matches {
            if seen.insert(candidate.clone()) {
                rhymes.push(candidate);
            }
        }
    }
    rhymes.truncate(limit);
    Ok(rhymes)
}

/// [`rhymes_for_blocking`] on the blocking pool.
pub async fn rhymes_for(
    dictionary: &Dictionary,
    word: &str,
    limit: usize,
) -> DictionaryResult<Vec<String>> {
    let dictionary = dictionary.clone();
    let word = word.to_string();
    tokio::task::spawn_blocking(move || rhymes_for_blocking(&dictionary, &word, limit)).await?
}
