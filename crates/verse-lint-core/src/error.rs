//! Error types for verse-lint-core.

use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur when working with configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),

    /// Configuration file not found after searching all locations.
    #[error("no configuration file found")]
    NotFound,

    /// A diagnostic check name that is not registered.
    #[error("unknown check: {name}. Use: {available}")]
    UnknownCheck {
        /// The check name that was requested.
        name: String,
        /// Comma-separated list of registered check names.
        available: String,
    },

    /// A rule listed both `checks` and `exclude`.
    #[error("conflicting configuration: {0}")]
    Conflicting(String),
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while building or querying the pronunciation dictionary.
#[derive(Error, Debug)]
pub enum DictionaryError {
    /// Downloading the pronunciation source failed.
    #[error("failed to fetch pronunciation source: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Reading a local source or touching the store file failed.
    #[error("dictionary I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing store reported an error.
    #[error("dictionary storage error: {0}")]
    Storage(#[from] redb::Error),

    /// A stored record could not be decoded.
    #[error("corrupt dictionary record for {word}: {source}")]
    CorruptRecord {
        /// The key whose value failed to decode.
        word: String,
        /// The decode failure.
        source: serde_json::Error,
    },

    /// A source line is not `WORD  PHONEME ...`.
    #[error("malformed pronunciation entry on line {line}: {content:?}")]
    MalformedEntry {
        /// 1-indexed line number in the source.
        line: usize,
        /// The offending line.
        content: String,
    },

    /// The source produced no entries at all.
    #[error("pronunciation source contained no entries")]
    EmptySource,

    /// A blocking worker panicked or was cancelled.
    #[error("dictionary worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Result type alias using [`DictionaryError`].
pub type DictionaryResult<T> = Result<T, DictionaryError>;

/// A build failure shared by every caller that awaited the same build.
pub type SharedDictionaryError = Arc<DictionaryError>;

/// Errors raised by completion strategies.
#[derive(Error, Debug)]
pub enum PredictionError {
    /// The configured predictor identifier is not registered.
    #[error("unknown predictor type: {name}. Use: {available}")]
    UnknownPredictor {
        /// The identifier that was requested.
        name: String,
        /// Comma-separated list of registered identifiers.
        available: String,
    },

    /// The generative predictor has no API key configured.
    #[error("no Gemini API key configured (set gemini_api_key or VERSE_LINT_GEMINI_API_KEY)")]
    MissingCredential,

    /// The pronunciation dictionary could not be built.
    #[error(transparent)]
    Dictionary(#[from] SharedDictionaryError),

    /// A dictionary query failed while predicting.
    #[error(transparent)]
    Lookup(#[from] DictionaryError),

    /// The completion service could not be reached.
    #[error("completion request failed: {0}")]
    Oracle(#[from] reqwest::Error),

    /// The completion service answered with a non-success status.
    #[error("completion service returned {status}: {body}")]
    OracleStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },

    /// The completion service answered with something other than the requested JSON.
    #[error("malformed completion response: {reason}")]
    MalformedResponse {
        /// What was wrong with the response.
        reason: String,
    },
}

/// Result type alias using [`PredictionError`].
pub type PredictionResult<T> = Result<T, PredictionError>;

/// Errors raised by the document workspace.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// The URI was never opened or was already closed.
    #[error("unknown document: {0}")]
    UnknownDocument(String),

    /// The pronunciation dictionary could not be built.
    #[error(transparent)]
    Dictionary(#[from] SharedDictionaryError),

    /// Tokenizing the document failed.
    #[error(transparent)]
    Tokenize(#[from] DictionaryError),

    /// The analysis configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The completion strategy failed.
    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

/// Result type alias using [`WorkspaceError`].
pub type WorkspaceResult<T> = Result<T, WorkspaceError>;
