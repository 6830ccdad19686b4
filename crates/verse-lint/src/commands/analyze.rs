//! Analyze command: stressed endings and unknown words.

use anyhow::Context as _;
use camino::Utf8PathBuf;
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use verse_lint_core::config::Config;
use verse_lint_core::{Diagnostic, Severity, Workspace};

use super::{Context, dictionary_handle, read_input_file, ready_dictionary};

/// Arguments for the `analyze` subcommand.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Poems to analyze.
    #[arg(required = true)]
    pub files: Vec<Utf8PathBuf>,

    /// Checks to run (comma-separated). Omit for all checks.
    #[arg(long, value_delimiter = ',')]
    pub checks: Option<Vec<String>>,

    /// Checks to skip (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub exclude: Option<Vec<String>>,

    /// Report every problem, ignoring `max_number_of_problems`.
    #[arg(long)]
    pub show_all: bool,

    /// Maximum problems reported per file.
    #[arg(long)]
    pub max_problems: Option<usize>,
}

#[derive(Serialize)]
struct FileReport<'a> {
    file: &'a str,
    diagnostics: Vec<Diagnostic>,
}

/// Analyze each file and print its diagnostics.
#[instrument(name = "cmd_analyze", skip_all, fields(files = args.files.len()))]
pub async fn cmd_analyze(args: AnalyzeArgs, ctx: &Context, mut config: Config) -> anyhow::Result<()> {
    debug!(checks = ?args.checks, exclude = ?args.exclude, "executing analyze command");

    if args.checks.is_some() {
        config.checks = args.checks;
    }
    if args.exclude.is_some() {
        config.exclude = args.exclude;
    }
    if args.show_all {
        config.show_all_errors = true;
    }
    if let Some(max) = args.max_problems {
        config.max_number_of_problems = max;
    }

    let dictionary = dictionary_handle(&config, false);
    ready_dictionary(&dictionary, ctx).await?;
    let workspace = Workspace::new(&config, dictionary).with_root(ctx.cwd.clone());

    let mut reports = Vec::with_capacity(args.files.len());
    for file in &args.files {
        let text = read_input_file(file, ctx.max_input)?;
        workspace.open(file.as_str(), 1, text);
        let diagnostics = workspace
            .diagnostics(file.as_str())
            .await
            .with_context(|| format!("failed to analyze {file}"))?;
        workspace.close(file.as_str());
        reports.push(FileReport {
            file: file.as_str(),
            diagnostics,
        });
    }

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        for d in &report.diagnostics {
            println!("{}", format_diagnostic(report.file, d));
        }
    }
    let total: usize = reports.iter().map(|r| r.diagnostics.len()).sum();
    if !ctx.quiet {
        if total == 0 {
            println!("{}", "No problems found.".green());
        } else {
            println!(
                "{} {} in {} file(s)",
                total.to_string().bold(),
                if total == 1 { "problem" } else { "problems" },
                reports.len()
            );
        }
    }
    Ok(())
}

/// `file:line:col: severity message [check]`, 1-based like compiler output.
fn format_diagnostic(file: &str, d: &Diagnostic) -> String {
    let severity = match d.severity {
        Severity::Error => d.severity.as_str().red().to_string(),
        Severity::Warning => d.severity.as_str().yellow().to_string(),
        Severity::Information => d.severity.as_str().cyan().to_string(),
        Severity::Hint => d.severity.as_str().dimmed().to_string(),
    };
    format!(
        "{}:{}:{}: {} {} {}",
        file,
        d.range.start.line + 1,
        d.range.start.character + 1,
        severity,
        d.message,
        format!("[{}]", d.check).dimmed()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use verse_lint_core::Range;

    #[test]
    fn diagnostics_print_one_based_positions() {
        owo_colors::set_override(false);
        let d = Diagnostic {
            severity: Severity::Hint,
            range: Range::on_line(1, 10, 14),
            message: "Line ends with a stressed syllable.".to_string(),
            check: "stressed_ending".to_string(),
        };
        assert_eq!(
            format_diagnostic("poem.txt", &d),
            "poem.txt:2:11: hint Line ends with a stressed syllable. [stressed_ending]"
        );
    }
}
