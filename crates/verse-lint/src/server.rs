//! MCP (Model Context Protocol) server implementation.
//!
//! Exposes poem analysis, rhymes, completions, and dictionary lookups to AI
//! assistants over stdio. Every tool delegates to a shared
//! [`Workspace`]; text sent with a call is opened as a transient document,
//! processed, and closed again.
//!
//! # Adding Tools
//!
//! 1. Define a parameter struct with `Deserialize` + `JsonSchema`
//! 2. Add a `#[tool(description = "...")]` method to the `#[tool_router]` impl
//! 3. Call the workspace or core functions, convert errors with [`to_mcp_error`]
//! 4. Return `CallToolResult::success(vec![Content::text(...)])`

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::schemars;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use serde::Serialize;

use verse_lint_core::error::{PredictionError, WorkspaceError};
use verse_lint_core::rhyme::{DEFAULT_RHYME_LIMIT, rhymes_for};
use verse_lint_core::{CompletionCandidate, Diagnostic, Position, Workspace};

/// Parameters for the `get_info` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct GetInfoParams {
    /// Output format: "text" or "json"
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "text".to_string()
}

/// Parameters for the `analyze_poem` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct AnalyzePoemParams {
    /// The poem text.
    pub text: String,
    /// Path the poem would live at; selects path-specific settings.
    pub path: Option<String>,
}

/// Parameters for the `find_rhymes` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct FindRhymesParams {
    /// Word to rhyme with.
    pub word: String,
    /// Maximum number of rhymes (default 10).
    pub limit: Option<usize>,
}

/// Parameters for the `suggest_completions` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SuggestCompletionsParams {
    /// The poem text.
    pub text: String,
    /// Zero-based cursor line.
    pub line: usize,
    /// Zero-based cursor character.
    #[serde(default)]
    pub character: usize,
    /// Path the poem would live at; selects path-specific settings.
    pub path: Option<String>,
}

/// Parameters for the `lookup_pronunciation` tool.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct LookupPronunciationParams {
    /// Word to look up.
    pub word: String,
}

#[derive(Serialize)]
struct RhymeReport {
    word: String,
    rhymes: Vec<String>,
}

/// Map a workspace failure to an MCP error. Caller mistakes become
/// `invalid_params`, everything else `internal_error`.
fn to_mcp_error(err: WorkspaceError) -> McpError {
    match &err {
        WorkspaceError::Config(_)
        | WorkspaceError::Prediction(
            PredictionError::UnknownPredictor { .. } | PredictionError::MissingCredential,
        ) => McpError::invalid_params(err.to_string(), None),
        _ => McpError::internal_error(err.to_string(), None),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("serialization error: {e}"), None))
}

/// MCP server over a shared poem workspace.
#[derive(Clone)]
pub struct VerseServer {
    tool_router: rmcp::handler::server::router::tool::ToolRouter<Self>,
    workspace: Arc<Workspace>,
    max_input: Option<usize>,
    counter: Arc<AtomicU64>,
}

#[tool_router]
impl VerseServer {
    /// Create a server over `workspace`. Texts longer than `max_input`
    /// bytes are rejected.
    pub fn new(workspace: Arc<Workspace>, max_input: Option<usize>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            workspace,
            max_input,
            counter: Arc::new(AtomicU64::new(1)),
        }
    }

    fn check_size(&self, text: &str) -> Result<(), McpError> {
        match self.max_input {
            Some(max) if text.len() > max => Err(McpError::invalid_params(
                format!("input too large: {} bytes (limit: {max} bytes)", text.len()),
                None,
            )),
            _ => Ok(()),
        }
    }

    /// Open `text` as a transient document and return its URI.
    ///
    /// Every call gets its own URI; `path` only selects the rules.
    fn open_transient(&self, path: Option<String>, text: String) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let uri = format!("untitled:poem-{n}");
        let version = i32::try_from(n % i32::MAX as u64).unwrap_or(1);
        match path {
            Some(path) => self.workspace.open_for_path(uri.clone(), version, text, path),
            None => self.workspace.open(uri.clone(), version, text),
        }
        uri
    }

    /// Get project information.
    #[tool(description = "Get project name, version, and description")]
    #[tracing::instrument(skip(self), fields(otel.kind = "server"))]
    fn get_info(
        &self,
        Parameters(params): Parameters<GetInfoParams>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(tool = "get_info", format = %params.format, "executing MCP tool");

        let info = serde_json::json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "description": env!("CARGO_PKG_DESCRIPTION"),
        });

        let text = if params.format == "json" {
            to_json(&info)?
        } else {
            format!(
                "{} v{}\n{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                env!("CARGO_PKG_DESCRIPTION"),
            )
        };

        tracing::info!(tool = "get_info", "MCP tool completed");
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    /// Diagnostics for a poem.
    #[tool(
        description = "Analyze a poem. Reports lines ending on a stressed syllable and words missing from the pronunciation dictionary."
    )]
    #[tracing::instrument(skip(self, params), fields(otel.kind = "server"))]
    async fn analyze_poem(
        &self,
        Parameters(params): Parameters<AnalyzePoemParams>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(tool = "analyze_poem", path = ?params.path, "executing MCP tool");
        self.check_size(&params.text)?;

        let uri = self.open_transient(params.path, params.text);
        let result = self.workspace.diagnostics(&uri).await;
        self.workspace.close(&uri);
        let diagnostics: Vec<Diagnostic> = result.map_err(to_mcp_error)?;

        tracing::info!(
            tool = "analyze_poem",
            count = diagnostics.len(),
            "MCP tool completed"
        );
        Ok(CallToolResult::success(vec![Content::text(to_json(
            &diagnostics,
        )?)]))
    }

    /// Ranked rhymes for a word.
    #[tool(description = "Find words that rhyme with a word, strongest matches first.")]
    #[tracing::instrument(skip(self, params), fields(otel.kind = "server", word = %params.word))]
    async fn find_rhymes(
        &self,
        Parameters(params): Parameters<FindRhymesParams>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(tool = "find_rhymes", limit = ?params.limit, "executing MCP tool");

        let dictionary = self
            .workspace
            .dictionary()
            .get()
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let rhymes = rhymes_for(
            &dictionary,
            &params.word,
            params.limit.unwrap_or(DEFAULT_RHYME_LIMIT),
        )
        .await
        .map_err(|e| McpError::internal_error(e.to_string(), None))?
        .into_iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>();

        tracing::info!(tool = "find_rhymes", count = rhymes.len(), "MCP tool completed");
        Ok(CallToolResult::success(vec![Content::text(to_json(
            &RhymeReport {
                word: params.word,
                rhymes,
            },
        )?)]))
    }

    /// Completion candidates at a cursor position.
    #[tool(
        description = "Suggest words to continue a poem at a cursor position (zero-based line and character), using the configured predictor."
    )]
    #[tracing::instrument(skip(self, params), fields(otel.kind = "server", line = params.line))]
    async fn suggest_completions(
        &self,
        Parameters(params): Parameters<SuggestCompletionsParams>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(tool = "suggest_completions", "executing MCP tool");
        self.check_size(&params.text)?;

        let position = Position::new(params.line, params.character);
        let uri = self.open_transient(params.path, params.text);
        let result = self.workspace.completions(&uri, position).await;
        self.workspace.close(&uri);
        let candidates: Vec<CompletionCandidate> = result
            .map_err(to_mcp_error)?
            .into_iter()
            .map(CompletionCandidate::resolve)
            .collect();

        tracing::info!(
            tool = "suggest_completions",
            count = candidates.len(),
            "MCP tool completed"
        );
        Ok(CallToolResult::success(vec![Content::text(to_json(
            &candidates,
        )?)]))
    }

    /// Dictionary entry for a word.
    #[tool(
        description = "Look up a word's pronunciation: phonemes with stress digits, syllable count, and rhyme keys."
    )]
    #[tracing::instrument(skip(self, params), fields(otel.kind = "server", word = %params.word))]
    async fn lookup_pronunciation(
        &self,
        Parameters(params): Parameters<LookupPronunciationParams>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(tool = "lookup_pronunciation", "executing MCP tool");

        let dictionary = self
            .workspace
            .dictionary()
            .get()
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let record = dictionary
            .lookup(&params.word)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        let json = serde_json::json!({
            "word": params.word,
            "found": record.is_some(),
            "entry": record,
        });

        tracing::info!(tool = "lookup_pronunciation", "MCP tool completed");
        Ok(CallToolResult::success(vec![Content::text(to_json(&json)?)]))
    }
}

#[tool_handler]
impl ServerHandler for VerseServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(format!(
                "{} MCP server. Analyze poems for stressed line endings and unknown words, \
                 find rhymes, look up pronunciations, and suggest completions.",
                env!("CARGO_PKG_NAME"),
            )),
        }
    }
}
