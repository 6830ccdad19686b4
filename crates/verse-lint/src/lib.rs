//! Library interface for the `verse-lint` CLI.
//!
//! This crate exposes the CLI's argument parser and command structure as a library,
//! primarily for documentation generation and testing. The actual entry point is
//! in `main.rs`.
//!
//! # Structure
//!
//! - [`Cli`] - The root argument parser (clap derive)
//! - [`Commands`] - Available subcommands
//! - [`commands`] - Command implementations
//!
//! # Documentation Generation
//!
//! The [`command()`] function returns the clap `Command` for generating man pages
//! and shell completions via `xtask`.

pub mod commands;

#[cfg(feature = "mcp")]
pub mod server;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// Color output preference.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect terminal capabilities automatically.
    #[default]
    Auto,
    /// Always emit colors.
    Always,
    /// Never emit colors.
    Never,
}

impl ColorChoice {
    /// Configure global color output based on this choice.
    ///
    /// Call this once at startup to set the color mode.
    pub fn apply(self) {
        match self {
            Self::Auto => {} // owo-colors auto-detects by default
            Self::Always => owo_colors::set_override(true),
            Self::Never => owo_colors::set_override(false),
        }
    }
}

const ENV_HELP: &str = "\
ENVIRONMENT VARIABLES:
    RUST_LOG                       Log filter (e.g., debug, verse_lint_core=trace)
    VERSE_LINT_LOG_PATH            Explicit log file path
    VERSE_LINT_LOG_DIR             Log directory
    VERSE_LINT_PREDICTOR_TYPE      Completion strategy (cmudict, gemini)
    VERSE_LINT_GEMINI_API_KEY      API key for the gemini strategy
    VERSE_LINT_DICTIONARY__PATH    Pronunciation store file
";

/// Command-line interface definition for verse-lint.
#[derive(Parser)]
#[command(name = "verse-lint")]
#[command(about = "Rhyme, stress, and completion tooling for poetry", long_about = None)]
#[command(version, arg_required_else_help = true)]
#[command(after_long_help = ENV_HELP)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Print only the version number (for scripting)
    #[arg(long)]
    pub version_only: bool,

    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run as if started in DIR
    #[arg(short = 'C', long, global = true)]
    pub chdir: Option<PathBuf>,

    /// Only print errors (suppresses warnings/info)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// More detail (repeatable; e.g. -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Colorize output
    #[arg(long, global = true, value_enum, default_value_t)]
    pub color: ColorChoice,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Pronunciation source file (overrides `dictionary.source_file`)
    #[arg(long, global = true, value_name = "FILE")]
    pub dict_source: Option<PathBuf>,

    /// Keep the dictionary in memory instead of the store file
    #[arg(long, global = true)]
    pub in_memory: bool,
}

/// Available subcommands for the CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Report stressed line endings and unknown words in a poem
    Analyze(commands::analyze::AnalyzeArgs),

    /// List words that rhyme with a word
    Rhymes(commands::rhymes::RhymesArgs),

    /// Suggest completions at a position in a poem
    Complete(commands::complete::CompleteArgs),

    /// Build or query the pronunciation dictionary
    #[command(subcommand)]
    Dict(commands::dict::DictCommand),

    /// Show package information
    Info(commands::info::InfoArgs),

    /// Start MCP (Model Context Protocol) server on stdio
    #[cfg(feature = "mcp")]
    Serve(commands::serve::ServeArgs),
}

/// Returns the clap command for documentation generation
pub fn command() -> clap::Command {
    Cli::command()
}
