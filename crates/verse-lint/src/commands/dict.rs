//! Dictionary maintenance commands.

use clap::Subcommand;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use verse_lint_core::config::Config;
use verse_lint_core::dictionary::BuildOrigin;
use verse_lint_core::dictionary::record::PronunciationRecord;

use super::{Context, dictionary_handle, ready_dictionary};

/// Pronunciation dictionary subcommands.
#[derive(Subcommand, Debug)]
pub enum DictCommand {
    /// Build the persistent store, or report on the existing one.
    Build {
        /// Discard the existing store and ingest the source again.
        #[arg(long)]
        rebuild: bool,
    },
    /// Show the pronunciation entry for a word.
    Lookup {
        /// Word to look up.
        word: String,
    },
}

#[derive(Serialize)]
struct LookupOutput<'a> {
    word: &'a str,
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry: Option<&'a PronunciationRecord>,
}

/// Run a `dict` subcommand.
#[instrument(name = "cmd_dict", skip_all)]
pub async fn cmd_dict(cmd: DictCommand, ctx: &Context, config: &Config) -> anyhow::Result<()> {
    match cmd {
        DictCommand::Build { rebuild } => {
            debug!(rebuild, "building dictionary");
            let handle = dictionary_handle(config, rebuild);
            let dictionary = ready_dictionary(&handle, ctx).await?;
            let report = dictionary.report();

            if ctx.json {
                println!("{}", serde_json::to_string_pretty(report)?);
                return Ok(());
            }
            let verb = match report.origin {
                BuildOrigin::Ingested => "Ingested",
                BuildOrigin::Reused => "Reused",
            };
            println!(
                "{} {} words from {}",
                verb.green(),
                report.words.to_string().bold(),
                handle.options().source
            );
            if report.duplicates > 0 {
                println!("  {} duplicate entries skipped", report.duplicates);
            }
            match &report.path {
                Some(path) => println!("  {} {path}", "store:".cyan()),
                None => println!("  {} in memory", "store:".cyan()),
            }
        }
        DictCommand::Lookup { word } => {
            debug!(%word, "looking up word");
            let handle = dictionary_handle(config, false);
            let dictionary = ready_dictionary(&handle, ctx).await?;
            let record = dictionary.lookup(&word).await?;

            if ctx.json {
                let output = LookupOutput {
                    word: &word,
                    found: record.is_some(),
                    entry: record.as_ref(),
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
                return Ok(());
            }
            match record {
                Some(record) => print_record(&record),
                None => {
                    if !ctx.quiet {
                        println!("{} {}", "Not in the dictionary:".yellow(), word.bold());
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_record(record: &PronunciationRecord) {
    println!("{}", record.word.bold());
    println!("  {} {}", "phonemes:".cyan(), record.symbols.join(" "));
    println!("  {} {}", "syllables:".cyan(), record.syllable_count);
    println!("  {} {}", "rhyme keys:".cyan(), record.rhyme_keys.join(" | "));
}
