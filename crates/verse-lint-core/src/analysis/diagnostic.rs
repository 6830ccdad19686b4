//! Diagnostics produced by analysis strategies.
//!
//! All structs derive `Serialize`, `Deserialize`, and `JsonSchema` for use in
//! both CLI JSON output and MCP tool responses.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::poem::ParsedPoem;
use crate::text::Range;

/// How serious a diagnostic is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must be fixed.
    Error,
    /// Should be looked at.
    Warning,
    /// Worth knowing.
    Information,
    /// A stylistic nudge.
    Hint,
}

impl Severity {
    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "information",
            Self::Hint => "hint",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finding on one line of a poem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Diagnostic {
    /// Severity.
    pub severity: Severity,
    /// Span within a single line.
    pub range: Range,
    /// Human-readable description.
    pub message: String,
    /// Name of the check that produced it.
    pub check: String,
}

impl Diagnostic {
    /// Whether the range is on one line, ordered, and inside `poem`.
    pub fn is_well_formed(&self, poem: &ParsedPoem) -> bool {
        let Range { start, end } = self.range;
        if start.line != end.line || end.character < start.character {
            return false;
        }
        poem.line(start.line)
            .is_some_and(|line| end.character <= line.char_len())
    }
}
