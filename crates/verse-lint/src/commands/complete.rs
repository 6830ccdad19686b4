//! Complete command: suggestions at a cursor position.

use std::time::Duration;

use anyhow::Context as _;
use camino::Utf8PathBuf;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument, warn};

use verse_lint_core::config::Config;
use verse_lint_core::{CompletionCandidate, Position, Workspace};

use super::{Context, dictionary_handle, read_input_file, ready_dictionary};

/// Arguments for the `complete` subcommand.
#[derive(Args, Debug)]
pub struct CompleteArgs {
    /// Poem to complete.
    pub file: Utf8PathBuf,

    /// Zero-based cursor line. Defaults to the line after the last one.
    #[arg(long)]
    pub line: Option<usize>,

    /// Zero-based cursor character within the line.
    #[arg(long, default_value_t = 0)]
    pub character: usize,

    /// Completion strategy (overrides `predictor_type`): cmudict or gemini.
    #[arg(long)]
    pub predictor: Option<String>,

    /// Give up after this many seconds.
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,
}

/// Print completion candidates for a position in a file.
#[instrument(name = "cmd_complete", skip_all, fields(file = %args.file))]
pub async fn cmd_complete(args: CompleteArgs, ctx: &Context, mut config: Config) -> anyhow::Result<()> {
    if let Some(predictor) = args.predictor {
        config.predictor_type = predictor;
    }
    let text = read_input_file(&args.file, ctx.max_input)?;
    let line = args
        .line
        .unwrap_or_else(|| text.split('\n').count().saturating_sub(usize::from(text.ends_with('\n'))));
    let position = Position::new(line, args.character);
    debug!(?position, predictor = %config.predictor_type, "executing complete command");

    let dictionary = dictionary_handle(&config, false);
    // Gemini uses the dictionary only for prompt hints.
    match ready_dictionary(&dictionary, ctx).await {
        Ok(_) => {}
        Err(e) if config.predictor_type == "gemini" => {
            warn!(error = %e, "completing without dictionary hints");
        }
        Err(e) => return Err(e),
    }
    let workspace = Workspace::new(&config, dictionary).with_root(ctx.cwd.clone());
    workspace.open(args.file.as_str(), 1, text);

    let candidates = tokio::time::timeout(
        Duration::from_secs(args.timeout),
        workspace.completions(args.file.as_str(), position),
    )
    .await
    .with_context(|| format!("completion timed out after {}s", args.timeout))?
    .with_context(|| format!("failed to complete {}", args.file))?;

    let candidates: Vec<CompletionCandidate> =
        candidates.into_iter().map(CompletionCandidate::resolve).collect();

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
    } else if candidates.is_empty() {
        if !ctx.quiet {
            println!("{}", "No suggestions.".yellow());
        }
    } else {
        for candidate in &candidates {
            println!("{}", candidate.label);
        }
    }
    Ok(())
}
