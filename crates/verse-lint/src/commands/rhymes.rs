//! Rhymes command.

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use verse_lint_core::config::Config;
use verse_lint_core::rhyme::{DEFAULT_RHYME_LIMIT, rhymes_for};

use super::{Context, dictionary_handle, ready_dictionary};

/// Arguments for the `rhymes` subcommand.
#[derive(Args, Debug)]
pub struct RhymesArgs {
    /// Word to find rhymes for.
    pub word: String,

    /// Maximum number of rhymes.
    #[arg(short = 'n', long, default_value_t = DEFAULT_RHYME_LIMIT)]
    pub limit: usize,
}

#[derive(Serialize)]
struct RhymeOutput<'a> {
    word: &'a str,
    rhymes: Vec<String>,
}

/// Print rhymes for a word, strongest match first.
#[instrument(name = "cmd_rhymes", skip_all, fields(word = %args.word))]
pub async fn cmd_rhymes(args: RhymesArgs, ctx: &Context, config: &Config) -> anyhow::Result<()> {
    debug!(limit = args.limit, "executing rhymes command");

    let handle = dictionary_handle(config, false);
    let dictionary = ready_dictionary(&handle, ctx).await?;
    let rhymes: Vec<String> = rhymes_for(&dictionary, &args.word, args.limit)
        .await?
        .into_iter()
        .map(|w| w.to_lowercase())
        .collect();

    if ctx.json {
        let output = RhymeOutput {
            word: &args.word,
            rhymes,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if rhymes.is_empty() {
        if !ctx.quiet {
            println!("{} {}", "No rhymes found for".yellow(), args.word.bold());
        }
    } else {
        for rhyme in &rhymes {
            println!("{rhyme}");
        }
    }
    Ok(())
}
