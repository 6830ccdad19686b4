//! Splits text into lines of word and separator nodes.
//!
//! Each line is tokenized on its own blocking task, so lines resolve their
//! pronunciations concurrently. Lines come back in document order.

use crate::dictionary::Dictionary;
use crate::error::DictionaryResult;
use crate::poem::{Line, ParsedPoem, TextNode, Word};
use crate::text::split_lines;

/// A maximal run of one character class.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Run {
    alphabetic: bool,
    start: usize,
    text: String,
}

/// Split a line into alternating alphabetic and non-alphabetic runs.
///
/// Only ASCII letters count as alphabetic.
fn split_runs(line: &str) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut buffer = String::new();
    let mut in_word = false;
    let mut start = 0;

    for (offset, ch) in line.chars().enumerate() {
        let alphabetic = ch.is_ascii_alphabetic();
        if alphabetic != in_word && !buffer.is_empty() {
            runs.push(Run {
                alphabetic: in_word,
                start,
                text: std::mem::take(&mut buffer),
            });
            start = offset;
        }
        in_word = alphabetic;
        buffer.push(ch);
    }
    if !buffer.is_empty() {
        runs.push(Run {
            alphabetic: in_word,
            start,
            text: buffer,
        });
    }
    runs
}

/// Tokenize one line, resolving every word through `dictionary`.
pub fn tokenize_line_blocking(dictionary: &Dictionary, line: &str) -> DictionaryResult<Line> {
    let nodes = split_runs(line)
        .into_iter()
        .map(|run| {
            if run.alphabetic {
                let phonemes = dictionary
                    .lookup_blocking(&run.text)?
                    .map(|record| record.phonemes)
                    .unwrap_or_default();
                Ok(TextNode::Word(Word {
                    text: run.text,
                    start: run.start,
                    phonemes,
                }))
            } else {
                Ok(TextNode::Separator {
                    text: run.text,
                    start: run.start,
                })
            }
        })
        .collect::<DictionaryResult<Vec<_>>>()?;
    Ok(Line::new(line, nodes))
}

/// Tokenize a whole document.
///
/// Unknown words get empty phonemes. Storage errors fail the whole parse.
#[tracing::instrument(skip_all, fields(text_len = text.len()))]
pub async fn tokenize(dictionary: &Dictionary, text: &str) -> DictionaryResult<ParsedPoem> {
    let handles: Vec<_> = split_lines(text)
        .into_iter()
        .map(|line| {
            let dictionary = dictionary.clone();
            let line = line.to_string();
            tokio::task::spawn_blocking(move || tokenize_line_blocking(&dictionary, &line))
        })
        .collect();

    let mut lines = Vec::with_capacity(handles.len());
    for handle in handles {
        lines.push(handle.await??);
    }
    tracing::debug!(lines = lines.len(), "tokenized poem");
    Ok(ParsedPoem::new(lines))
}
