//! Rhymes for the endings of the lines before the cursor.

use super::CompletionCandidate;
use crate::dictionary::Dictionary;
use crate::error::{DictionaryError, PredictionResult};
use crate::rhyme::{DEFAULT_RHYME_LIMIT, rhymes_for_blocking};
use crate::text::{Position, split_lines};

/// How many preceding lines feed the rhyme lookup.
pub const LOOKBACK_LINES: usize = 3;

/// Suggests words that rhyme with recent line endings.
#[derive(Debug, Clone)]
pub struct DictionaryPredictor {
    dictionary: Dictionary,
}

impl DictionaryPredictor {
    /// A predictor over a built dictionary.
    pub const fn new(dictionary: Dictionary) -> Self {
        Self { dictionary }
    }

    /// Rhymes for each ending, farthest line first, labels lowercased.
    #[tracing::instrument(skip(self, text), fields(line = position.line))]
    pub async fn predict(
        &self,
        position: Position,
        text: &str,
    ) -> PredictionResult<Vec<CompletionCandidate>> {
        let endings = preceding_line_endings(text, position.line, LOOKBACK_LINES);
        tracing::debug!(?endings, "looking up rhymes");

        let handles: Vec<_> = endings
            .into_iter()
            .map(|word| {
                let dictionary = self.dictionary.clone();
                tokio::task::spawn_blocking(move || {
                    rhymes_for_blocking(&dictionary, &word, DEFAULT_RHYME_LIMIT)
                })
            })
            .collect();

        let mut rhymes = Vec::new();
        for handle in handles {
            rhymes.extend(handle.await.map_err(DictionaryError::from)??);
        }
        Ok(rhymes
            .into_iter()
            .enumerate()
            .map(|(index, word)| CompletionCandidate::text(word.to_lowercase(), index))
            .collect())
    }
}

/// Last whitespace-delimited token of each existing, non-blank line among
/// the `count` lines before `line`, in document order.
pub fn preceding_line_endings(text: &str, line: usize, count: usize) -> Vec<String> {
    let lines = split_lines(text);
    (line.saturating_sub(count)..line)
        .filter_map(|index| lines.get(index))
        .filter_map(|l| l.split_whitespace().next_back())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_dictionary;

    #[test]
    fn endings_skip_missing_and_blank_lines() {
        let text = "one light\n\n  \nred,\nsweet   \ncursor line";
        assert_eq!(preceding_line_endings(text, 5, 3), vec!["red,", "sweet"]);
        assert_eq!(preceding_line_endings(text, 1, 3), vec!["light"]);
        assert!(preceding_line_endings(text, 0, 3).is_empty());
        assert_eq!(preceding_line_endings("a b", 9, 3), Vec::<String>::new());
    }

    #[tokio::test]
    async fn concatenates_rhymes_farthest_line_first() {
        let predictor = DictionaryPredictor::new(sample_dictionary());
        let text = "so\nthe light,\n";
        let out = predictor.predict(Position::new(2, 0), text).await.unwrap();
        let labels: Vec<_> = out.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels[0], "window");
        assert_eq!(&labels[1..4], &["delight", "flight", "bright"]);
        assert_eq!(labels.len(), 11);
        assert!(out.iter().enumerate().all(|(i, c)| c.data == i));
    }

    #[tokio::test]
    async fn every_candidate_rhymes_with_a_preceding_ending() {
        use crate::dictionary::{NULL_RHYME_KEY, RhymeTier};

        let dict = sample_dictionary();
        let predictor = DictionaryPredictor::new(dict.clone());
        let out = predictor
            .predict(Position::new(3, 0), "light\nnight\nsight\n")
            .await
            .unwrap();
        assert!(!out.is_empty());

        let mut endings = Vec::new();
        for word in ["light", "night", "sight"] {
            endings.push(dict.lookup(word).await.unwrap().unwrap());
        }
        for candidate in &out {
            let record = dict.lookup(&candidate.label).await.unwrap().unwrap();
            let rhymes = RhymeTier::STRONGEST_FIRST.into_iter().any(|tier| {
                let key = record.rhyme_key(tier);
                key != NULL_RHYME_KEY && endings.iter().any(|e| e.rhyme_key(tier) == key)
            });
            assert!(rhymes, "{} shares no rhyme key", candidate.label);
        }
    }

    #[tokio::test]
    async fn first_line_and_unknown_endings_give_nothing() {
        let predictor = DictionaryPredictor::new(sample_dictionary());
        assert!(predictor.predict(Position::new(0, 3), "light").await.unwrap().is_empty());
        assert!(
            predictor
                .predict(Position::new(1, 0), "glorp\n")
                .await
                .unwrap()
                .is_empty()
        );
    }
}
