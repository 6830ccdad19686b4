//! Tokenized poem model.

use serde::Serialize;

use crate::dictionary::Phoneme;
use crate::text::{Range, char_len};

/// An alphabetic run with its resolved pronunciation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Word {
    /// The run exactly as written.
    pub text: String,
    /// Character offset from the start of the line.
    pub start: usize,
    /// Phonemes of the dictionary entry; empty if the word is unknown.
    pub phonemes: Vec<Phoneme>,
}

impl Word {
    /// Exclusive end offset.
    pub fn end(&self) -> usize {
        self.start + char_len(&self.text)
    }

    /// Whether a pronunciation was found.
    pub fn is_known(&self) -> bool {
        !self.phonemes.is_empty()
    }

    /// This word's span on `line`.
    pub fn range(&self, line: usize) -> Range {
        Range::on_line(line, self.start, self.end())
    }
}

/// One token of a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TextNode {
    /// An alphabetic run.
    Word(Word),
    /// Anything between words: spaces, punctuation, digits.
    Separator {
        /// The run exactly as written.
        text: String,
        /// Character offset from the start of the line.
        start: usize,
    },
}

impl TextNode {
    /// The raw text of the node.
    pub fn text(&self) -> &str {
        match self {
            Self::Word(word) => &word.text,
            Self::Separator { text, .. } => text,
        }
    }

    /// Character offset from the start of the line.
    pub const fn start(&self) -> usize {
        match self {
            Self::Word(word) => word.start,
            Self::Separator { start, .. } => *start,
        }
    }
}

/// A line of text and its tokens.
///
/// The flattened phoneme sequence and word positions are computed once here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    text: String,
    nodes: Vec<TextNode>,
    phonemes: Vec<Phoneme>,
    word_nodes: Vec<usize>,
    char_len: usize,
}

impl Line {
    /// Build a line from its text and nodes.
    pub fn new(text: impl Into<String>, nodes: Vec<TextNode>) -> Self {
        let text = text.into();
        let word_nodes: Vec<usize> = nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, node)| matches!(node, TextNode::Word(_)).then_some(idx))
            .collect();
        let phonemes = word_nodes
            .iter()
            .filter_map(|&idx| match &nodes[idx] {
                TextNode::Word(word) => Some(word.phonemes.iter().cloned()),
                TextNode::Separator { .. } => None,
            })
            .flatten()
            .collect();
        Self {
            char_len: char_len(&text),
            text,
            nodes,
            phonemes,
            word_nodes,
        }
    }

    /// The raw line.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in characters.
    pub const fn char_len(&self) -> usize {
        self.char_len
    }

    /// All tokens in order.
    pub fn nodes(&self) -> &[TextNode] {
        &self.nodes
    }

    /// Every word's phonemes, in order.
    pub fn phonemes(&self) -> &[Phoneme] {
        &self.phonemes
    }

    /// The words, in order.
    pub fn words(&self) -> impl DoubleEndedIterator<Item = &Word> {
        self.word_nodes.iter().filter_map(|&idx| match &self.nodes[idx] {
            TextNode::Word(word) => Some(word),
            TextNode::Separator { .. } => None,
        })
    }

    /// Number of words.
    pub fn word_count(&self) -> usize {
        self.word_nodes.len()
    }

    /// The last word on the line, if any.
    pub fn last_word(&self) -> Option<&Word> {
        self.words().next_back()
    }

    /// Stress digits of every phoneme, e.g. `"1000010"`.
    pub fn stress_pattern(&self) -> String {
        self.phonemes
            .iter()
            .map(|p| char::from_digit(u32::from(p.stress), 10).unwrap_or('?'))
            .collect()
    }
}

/// Every line of one document version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPoem {
    lines: Vec<Line>,
}

impl ParsedPoem {
    /// Wrap already tokenized lines.
    pub const fn new(lines: Vec<Line>) -> Self {
        Self { lines }
    }

    /// All lines.
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// One line, if it exists.
    pub fn line(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if the poem has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
