//! Text documents and line/character addressing.
//!
//! Positions count Unicode scalar values from the start of a line, and
//! lines are split on `\n` only. A trailing `\r` stays part of the line.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A zero-based (line, character) location.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    JsonSchema,
)]
pub struct Position {
    /// Zero-based line index.
    pub line: usize,
    /// Zero-based character offset within the line.
    pub character: usize,
}

impl Position {
    /// Construct a position.
    pub const fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

/// A half-open span between two positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Range {
    /// Inclusive start.
    pub start: Position,
    /// Exclusive end.
    pub end: Position,
}

impl Range {
    /// A span on a single line.
    pub const fn on_line(line: usize, start: usize, end: usize) -> Self {
        Self {
            start: Position::new(line, start),
            end: Position::new(line, end),
        }
    }
}

/// Anything that can hand out its full text.
pub trait TextDocument {
    /// The full current text.
    fn text(&self) -> String;
}

impl TextDocument for str {
    fn text(&self) -> String {
        self.to_string()
    }
}

impl TextDocument for String {
    fn text(&self) -> String {
        self.clone()
    }
}

/// A versioned document snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Identifier, usually a URI or path.
    pub uri: String,
    /// Monotonic version supplied by the client.
    pub version: i32,
    /// Full text.
    pub text: String,
}

impl Document {
    /// Construct a document snapshot.
    pub fn new(uri: impl Into<String>, version: i32, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            version,
            text: text.into(),
        }
    }
}

impl TextDocument for Document {
    fn text(&self) -> String {
        self.text.clone()
    }
}

/// Split text into lines on `\n`. Empty text is one empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

/// Number of characters in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split `line` at a character offset, clamping past-the-end offsets.
pub fn split_at_char(line: &str, character: usize) -> (&str, &str) {
    let byte = line
        .char_indices()
        .nth(character)
        .map_or(line.len(), |(idx, _)| idx);
    line.split_at(byte)
}
