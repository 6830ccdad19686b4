//! Words with no known pronunciation.

use super::DiagnosticStrategy;
use super::diagnostic::{Diagnostic, Severity};
use crate::poem::ParsedPoem;

/// Reports every word the dictionary could not resolve.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownWords;

impl UnknownWords {
    /// Registry name.
    pub const NAME: &'static str = "unknown_words";
}

impl DiagnosticStrategy for UnknownWords {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn diagnose(&self, poem: &ParsedPoem) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for (index, line) in poem.lines().iter().enumerate() {
            for word in line.words().filter(|w| !w.is_known()) {
                diagnostics.push(Diagnostic {
                    severity: Severity::Information,
                    range: word.range(index),
                    message: format!("No pronunciation found for \"{}\".", word.text),
                    check: Self::NAME.to_string(),
                });
            }
        }
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_dictionary;
    use crate::text::Range;
    use crate::tokenizer::tokenize;

    #[tokio::test]
    async fn reports_each_unknown_word_with_its_range() {
        let poem = tokenize(&sample_dictionary(), "roses are glorp\nblorb, blue")
            .await
            .unwrap();
        let diagnostics = UnknownWords.diagnose(&poem);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].range, Range::on_line(0, 10, 15));
        assert_eq!(diagnostics[0].message, "No pronunciation found for \"glorp\".");
        assert_eq!(diagnostics[1].range, Range::on_line(1, 0, 5));
        assert_eq!(diagnostics[1].severity, Severity::Information);
    }

    #[tokio::test]
    async fn fully_known_poem_is_clean() {
        let poem = tokenize(&sample_dictionary(), "Roses are red,\nviolets are blue.")
            .await
            .unwrap();
        assert!(UnknownWords.diagnose(&poem).is_empty());
    }
}
