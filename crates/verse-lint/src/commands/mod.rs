//! Command implementations.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use camino::{Utf8Path, Utf8PathBuf};
use indicatif::{ProgressBar, ProgressStyle};
use verse_lint_core::config::Config;
use verse_lint_core::{Dictionary, DictionaryHandle, DictionaryOptions};

pub mod analyze;
pub mod complete;
pub mod dict;
pub mod info;
pub mod rhymes;
#[cfg(feature = "mcp")]
pub mod serve;

/// Global flags and environment every command sees.
#[derive(Debug, Clone)]
pub struct Context {
    /// Emit JSON instead of text.
    pub json: bool,
    /// Suppress progress output.
    pub quiet: bool,
    /// Working directory; path rules are relative to it.
    pub cwd: Utf8PathBuf,
    /// Input size limit, `None` when disabled.
    pub max_input: Option<usize>,
}

/// Read a file and validate its size against the configured limit.
pub fn read_input_file(path: &Utf8Path, max_bytes: Option<usize>) -> anyhow::Result<String> {
    // Preflight: check file size via metadata before reading into memory.
    let metadata =
        std::fs::metadata(path.as_std_path()).with_context(|| format!("failed to read {path}"))?;
    if let Some(max) = max_bytes {
        let size = metadata.len() as usize;
        if size > max {
            anyhow::bail!("input too large: {path} is {size} bytes (limit: {max} bytes)");
        }
    }

    std::fs::read_to_string(path.as_std_path()).with_context(|| format!("failed to read {path}"))
}

/// A dictionary handle for the `[dictionary]` section of `config`.
pub fn dictionary_handle(config: &Config, rebuild: bool) -> Arc<DictionaryHandle> {
    Arc::new(DictionaryHandle::new(
        DictionaryOptions::from_config(&config.dictionary).with_rebuild(rebuild),
    ))
}

/// Await the dictionary build, showing a spinner while it runs.
pub async fn ready_dictionary(
    handle: &DictionaryHandle,
    ctx: &Context,
) -> anyhow::Result<Dictionary> {
    if handle.is_ready() {
        return handle.get().await.map_err(anyhow::Error::from);
    }

    let spinner = if ctx.quiet || ctx.json {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(format!(
            "Loading pronunciation dictionary from {}",
            handle.options().source
        ));
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    };

    let result = handle.get().await;
    spinner.finish_and_clear();
    result.context("failed to build the pronunciation dictionary")
}
