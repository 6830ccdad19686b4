//! Core library for verse-lint.
//!
//! Phonetic analysis and rhyme matching for poetry, built on a pronunciation
//! dictionary (CMUdict by default), with pluggable diagnostic checks and
//! completion strategies.
//!
//! # Modules
//!
//! - [`dictionary`] - Pronunciation source ingestion and the store
//! - [`rhyme`] - Ranked rhyme candidates
//! - [`tokenizer`] and [`poem`] - Words, separators, and phonemes per line
//! - [`analysis`] - Diagnostic checks
//! - [`predict`] - Completion strategies and the strategy cache
//! - [`workspace`] - Open documents, per-document settings, parse caching
//! - [`config`] - Configuration loading and management
//! - [`error`] - Error types and result aliases
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use verse_lint_core::{Config, DictionaryHandle, DictionaryOptions, Workspace};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let dictionary = Arc::new(DictionaryHandle::new(DictionaryOptions::from_config(
//!     &config.dictionary,
//! )));
//! let workspace = Workspace::new(&config, dictionary);
//! workspace.open("poem.txt", 1, "Roses are red\nViolets are blue");
//! for diagnostic in workspace.diagnostics("poem.txt").await? {
//!     println!("{}: {}", diagnostic.severity, diagnostic.message);
//! }
//! # Ok(())
//! # }
//! ```
#![deny(unsafe_code)]

pub mod analysis;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod poem;
pub mod predict;
pub mod rhyme;
pub mod rules;
pub mod settings;
pub mod text;
pub mod tokenizer;
pub mod workspace;

#[cfg(test)]
mod test_support;

pub use analysis::{Analyzer, Diagnostic, Severity};
pub use config::{Config, ConfigLoader, LogLevel};
pub use dictionary::{Dictionary, DictionaryHandle, DictionaryOptions, DictionarySource};
pub use error::{
    ConfigError, ConfigResult, DictionaryError, DictionaryResult, PredictionError,
    PredictionResult, WorkspaceError, WorkspaceResult,
};
pub use predict::{CompletionCandidate, PredictorFactory};
pub use settings::{CachingStrategy, DocumentSettings};
pub use text::{Document, Position, Range, TextDocument};
pub use workspace::Workspace;

/// Default maximum input size: 5 MiB.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 5 * 1024 * 1024;
