//! Tracing setup: human-readable events on stderr, plus an optional JSONL
//! log file.
//!
//! The filter comes from `RUST_LOG` when set, otherwise from `-q`/`-v` and
//! the configured log level. The file layer is enabled by
//! `VERSE_LINT_LOG_PATH` (exact file), `VERSE_LINT_LOG_DIR`, or `log_dir` in
//! the configuration, in that order.

use std::path::PathBuf;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Explicit log file path.
const ENV_LOG_PATH: &str = "VERSE_LINT_LOG_PATH";
/// Log directory.
const ENV_LOG_DIR: &str = "VERSE_LINT_LOG_DIR";
/// File name used inside a log directory.
const LOG_FILE_NAME: &str = "verse-lint.jsonl";

/// Where log records go besides stderr.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// Exact log file; wins over `log_dir`.
    pub log_path: Option<PathBuf>,
    /// Directory for `verse-lint.jsonl`.
    pub log_dir: Option<PathBuf>,
}

impl ObservabilityConfig {
    /// Read the environment, falling back to the configured directory.
    pub fn from_env_with_overrides(config_log_dir: Option<PathBuf>) -> Self {
        Self {
            log_path: std::env::var_os(ENV_LOG_PATH).map(PathBuf::from),
            log_dir: std::env::var_os(ENV_LOG_DIR)
                .map(PathBuf::from)
                .or(config_log_dir),
        }
    }

    /// The (directory, file name) of the log file, if file logging is on.
    fn file_target(&self) -> Option<(PathBuf, String)> {
        if let Some(path) = &self.log_path {
            let dir = path
                .parent()
                .map_or_else(|| PathBuf::from("."), PathBuf::from);
            let name = path
                .file_name()
                .map_or_else(|| LOG_FILE_NAME.to_string(), |n| n.to_string_lossy().into_owned());
            return Some((dir, name));
        }
        self.log_dir
            .as_ref()
            .map(|dir| (dir.clone(), LOG_FILE_NAME.to_string()))
    }
}

/// Build the event filter.
///
/// `RUST_LOG` wins. Otherwise `-q` means errors only, each `-v` raises the
/// level, and with neither the configured level applies.
pub fn env_filter(quiet: bool, verbose: u8, config_level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => config_level,
            1 => "debug",
            _ => "trace",
        }
    };
    EnvFilter::new(level)
}

/// Keeps the file writer flushing until dropped.
#[derive(Debug)]
pub struct ObservabilityGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
pub fn init_observability(
    config: &ObservabilityConfig,
    filter: EnvFilter,
) -> anyhow::Result<ObservabilityGuard> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = match config.file_target() {
        Some((dir, name)) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::never(&dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    Ok(ObservabilityGuard { _file: guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins_over_directory() {
        let config = ObservabilityConfig {
            log_path: Some(PathBuf::from("/var/log/poems/run.jsonl")),
            log_dir: Some(PathBuf::from("/tmp/elsewhere")),
        };
        let (dir, name) = config.file_target().unwrap();
        assert_eq!(dir, PathBuf::from("/var/log/poems"));
        assert_eq!(name, "run.jsonl");
    }

    #[test]
    fn directory_uses_default_file_name() {
        let config = ObservabilityConfig {
            log_path: None,
            log_dir: Some(PathBuf::from("/tmp/logs")),
        };
        assert_eq!(
            config.file_target(),
            Some((PathBuf::from("/tmp/logs"), LOG_FILE_NAME.to_string()))
        );
        assert!(ObservabilityConfig::default().file_target().is_none());
    }
}
