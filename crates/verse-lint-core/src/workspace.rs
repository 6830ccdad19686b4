//! Open documents and the per-document state derived from them.
//!
//! A [`Workspace`] holds document snapshots, resolves [`DocumentSettings`]
//! per URI, caches parsed poems under [`CachingStrategy::Eager`], and
//! routes diagnostics and completion requests to the engines. Per-document
//! state sits behind a `std::sync::Mutex` that is never held across an
//! await.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};

use crate::analysis::{Analyzer, Diagnostic, cap_problems};
use crate::config::Config;
use crate::dictionary::DictionaryHandle;
use crate::error::{WorkspaceError, WorkspaceResult};
use crate::poem::ParsedPoem;
use crate::predict::{CompletionCandidate, PredictorFactory};
use crate::rules::RuleSet;
use crate::settings::{CachingStrategy, DocumentSettings};
use crate::text::{Document, Position};
use crate::tokenizer::tokenize;

#[derive(Debug)]
struct State {
    defaults: DocumentSettings,
    rules: RuleSet,
    documents: HashMap<String, Document>,
    settings: HashMap<String, DocumentSettings>,
    rule_paths: HashMap<String, String>,
    parses: HashMap<String, (i32, Arc<ParsedPoem>)>,
}

impl State {
    fn new(config: &Config) -> Self {
        Self {
            defaults: config.document_settings(),
            rules: RuleSet::compile(config.rules.as_deref().unwrap_or_default()),
            documents: HashMap::new(),
            settings: HashMap::new(),
            rule_paths: HashMap::new(),
            parses: HashMap::new(),
        }
    }
}

/// Session state shared by the CLI and the MCP server.
#[derive(Debug)]
pub struct Workspace {
    dictionary: Arc<DictionaryHandle>,
    predictors: PredictorFactory,
    root: Option<Utf8PathBuf>,
    state: Mutex<State>,
}

impl Workspace {
    /// A workspace using `config` for defaults and rules.
    pub fn new(config: &Config, dictionary: Arc<DictionaryHandle>) -> Self {
        Self {
            predictors: PredictorFactory::new(Arc::clone(&dictionary)),
            dictionary,
            root: None,
            state: Mutex::new(State::new(config)),
        }
    }

    /// Match rule globs against paths relative to `root`.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// The shared dictionary handle.
    pub fn dictionary(&self) -> &Arc<DictionaryHandle> {
        &self.dictionary
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a newly opened document.
    pub fn open(&self, uri: impl Into<String>, version: i32, text: impl Into<String>) {
        let document = Document::new(uri, version, text);
        tracing::debug!(uri = %document.uri, version, "document opened");
        self.state().documents.insert(document.uri.clone(), document);
    }

    /// Store a document whose settings follow the rules for `path` rather
    /// than for its URI.
    pub fn open_for_path(
        &self,
        uri: impl Into<String>,
        version: i32,
        text: impl Into<String>,
        path: impl Into<String>,
    ) {
        let document = Document::new(uri, version, text);
        let path = path.into();
        tracing::debug!(uri = %document.uri, version, path, "document opened");
        let mut state = self.state();
        state.rule_paths.insert(document.uri.clone(), path);
        state.documents.insert(document.uri.clone(), document);
    }

    /// Replace a document's text with a new version.
    pub fn change(&self, uri: impl Into<String>, version: i32, text: impl Into<String>) {
        let document = Document::new(uri, version, text);
        tracing::trace!(uri = %document.uri, version, "document changed");
        self.state().documents.insert(document.uri.clone(), document);
    }

    /// Drop a document with its settings and cached parse.
    ///
    /// Returns `false` if the document was not open.
    pub fn close(&self, uri: &str) -> bool {
        let mut state = self.state();
        state.settings.remove(uri);
        state.parses.remove(uri);
        state.rule_paths.remove(uri);
        let was_open = state.documents.remove(uri).is_some();
        tracing::debug!(uri, was_open, "document closed");
        was_open
    }

    /// The current snapshot of an open document.
    pub fn document(&self, uri: &str) -> WorkspaceResult<Document> {
        self.state()
            .documents
            .get(uri)
            .cloned()
            .ok_or_else(|| WorkspaceError::UnknownDocument(uri.to_string()))
    }

    /// URIs of every open document, sorted.
    pub fn documents(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.state().documents.keys().cloned().collect();
        uris.sort();
        uris
    }

    /// Settings for `uri`: configuration defaults, then every matching rule.
    ///
    /// The result is cached until the document closes or the workspace is
    /// reconfigured.
    pub fn settings(&self, uri: &str) -> DocumentSettings {
        let mut state = self.state();
        if let Some(cached) = state.settings.get(uri) {
            return cached.clone();
        }
        let path = self.rule_path(&state, uri);
        let resolved = state.rules.resolve(&state.defaults, &path);
        tracing::debug!(uri, path, predictor = %resolved.predictor_type, "resolved document settings");
        state.settings.insert(uri.to_string(), resolved.clone());
        resolved
    }

    /// The path rule globs see for `uri`: the path it was opened for, or the
    /// URI without its scheme. With a root set, the path is made relative
    /// to it.
    fn rule_path(&self, state: &State, uri: &str) -> String {
        let path = state
            .rule_paths
            .get(uri)
            .map_or_else(|| uri.strip_prefix("file://").unwrap_or(uri), String::as_str);
        let path = Utf8Path::new(path);
        self.root
            .as_deref()
            .and_then(|root| path.strip_prefix(root).ok())
            .unwrap_or(path)
            .to_string()
    }

    /// Replace defaults and rules. Cached settings and the cached completion
    /// strategy are dropped; open documents and parses are kept.
    pub async fn configure(&self, config: &Config) {
        {
            let mut state = self.state();
            state.defaults = config.document_settings();
            state.rules = RuleSet::compile(config.rules.as_deref().unwrap_or_default());
            state.settings.clear();
        }
        self.predictors.invalidate().await;
        tracing::info!(predictor = %config.predictor_type, "workspace reconfigured");
    }

    /// The parsed poem for the current version of `uri`.
    ///
    /// Under eager caching the parse is reused until the version changes.
    #[tracing::instrument(skip(self))]
    pub async fn poem(&self, uri: &str) -> WorkspaceResult<Arc<ParsedPoem>> {
        let caching = self.settings(uri).caching;
        let document = {
            let state = self.state();
            let document = state
                .documents
                .get(uri)
                .cloned()
                .ok_or_else(|| WorkspaceError::UnknownDocument(uri.to_string()))?;
            if caching == CachingStrategy::Eager
                && let Some((version, poem)) = state.parses.get(uri)
                && *version == document.version
            {
                tracing::trace!(version, "reusing cached parse");
                return Ok(Arc::clone(poem));
            }
            document
        };

        let dictionary = self.dictionary.get().await?;
        let poem = Arc::new(tokenize(&dictionary, &document.text).await?);

        if caching == CachingStrategy::Eager {
            let mut state = self.state();
            // Only cache if the document was not closed or changed meanwhile.
            if state
                .documents
                .get(uri)
                .is_some_and(|d| d.version == document.version)
            {
                state
                    .parses
                    .insert(uri.to_string(), (document.version, Arc::clone(&poem)));
            }
        }
        Ok(poem)
    }

    /// Diagnostics for `uri`, filtered by the enabled checks and capped.
    #[tracing::instrument(skip(self))]
    pub async fn diagnostics(&self, uri: &str) -> WorkspaceResult<Vec<Diagnostic>> {
        let settings = self.settings(uri);
        let analyzer = Analyzer::new(settings.checks.as_deref(), settings.exclude.as_deref())?;
        let poem = self.poem(uri).await?;
        Ok(cap_problems(
            analyzer.analyze(&poem),
            settings.show_all_errors,
            settings.max_number_of_problems,
        ))
    }

    /// Completion candidates at `position` in `uri`.
    #[tracing::instrument(skip(self))]
    pub async fn completions(
        &self,
        uri: &str,
        position: Position,
    ) -> WorkspaceResult<Vec<CompletionCandidate>> {
        let settings = self.settings(uri);
        let document = self.document(uri)?;
        let predictor = self.predictors.get(&settings).await?;
        Ok(predictor.predict(position, &document).await?)
    }
}
