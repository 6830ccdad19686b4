//! Lines ending on a stressed syllable.

use super::DiagnosticStrategy;
use super::diagnostic::{Diagnostic, Severity};
use crate::poem::ParsedPoem;

/// Flags lines whose final phoneme carries stress.
#[derive(Debug, Clone, Copy, Default)]
pub struct StressedEnding;

impl StressedEnding {
    /// Registry name.
    pub const NAME: &'static str = "stressed_ending";
}

impl DiagnosticStrategy for StressedEnding {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[tracing::instrument(skip_all, name = "stressed_ending")]
    fn diagnose(&self, poem: &ParsedPoem) -> Vec<Diagnostic> {
        poem.lines()
            .iter()
            .enumerate()
            .filter_map(|(index, line)| {
                let last = line.phonemes().last()?;
                if !last.is_stressed() {
                    return None;
                }
                // The phoneme came from the last word that has one, which
                // may precede trailing unknown words.
                let word = line.words().rev().find(|w| w.is_known())?;
                Some(Diagnostic {
                    severity: Severity::Hint,
                    range: word.range(index),
                    message: "Line ends with a stressed syllable.".to_string(),
                    check: Self::NAME.to_string(),
                })
            })
            .collect()
    }
}
