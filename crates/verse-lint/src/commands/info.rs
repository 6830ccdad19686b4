//! Info command implementation

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};
use verse_lint_core::config::{Config, ConfigSources, user_data_dir};
use verse_lint_core::dictionary::Backend;
use verse_lint_core::DictionaryOptions;

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct PackageInfo {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    repository: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    license: &'static str,
}

impl PackageInfo {
    const fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            repository: env!("CARGO_PKG_REPOSITORY"),
            license: env!("CARGO_PKG_LICENSE"),
        }
    }
}

#[derive(Serialize)]
struct ConfigInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
    predictor: String,
    gemini_key_set: bool,
    caching: &'static str,
    show_all_errors: bool,
    max_number_of_problems: usize,
    rules: usize,
}

impl ConfigInfo {
    fn from_config(config: &Config, sources: &ConfigSources) -> Self {
        Self {
            config_file: sources.primary_file().map(|p| p.to_string()),
            log_level: config.log_level.as_str().to_string(),
            log_dir: config.log_dir.as_ref().map(|p| p.to_string()),
            predictor: config.predictor_type.clone(),
            gemini_key_set: config
                .gemini_api_key
                .as_deref()
                .is_some_and(|k| !k.is_empty()),
            caching: config.caching.as_str(),
            show_all_errors: config.show_all_errors,
            max_number_of_problems: config.max_number_of_problems,
            rules: config.rules.as_ref().map_or(0, Vec::len),
        }
    }
}

#[derive(Serialize)]
struct DictionaryInfo {
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_dir: Option<String>,
}

impl DictionaryInfo {
    fn from_config(config: &Config) -> Self {
        let options = DictionaryOptions::from_config(&config.dictionary);
        Self {
            source: options.source.to_string(),
            store: match options.backend {
                Backend::Redb(path) => Some(path.to_string()),
                Backend::Memory => None,
            },
            data_dir: user_data_dir().map(|p| p.to_string()),
        }
    }
}

#[derive(Serialize)]
struct FullInfo {
    #[serde(flatten)]
    package: PackageInfo,
    config: ConfigInfo,
    dictionary: DictionaryInfo,
}

/// Print package information
///
/// # Arguments
/// * `global_json` - Global `--json` flag from CLI
/// * `config` - Loaded configuration
/// * `sources` - Config source metadata from loading
#[instrument(name = "cmd_info", skip_all, fields(json_output))]
pub fn cmd_info(
    _args: InfoArgs,
    global_json: bool,
    config: &Config,
    sources: &ConfigSources,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing info command");

    let full_info = FullInfo {
        package: PackageInfo::new(),
        config: ConfigInfo::from_config(config, sources),
        dictionary: DictionaryInfo::from_config(config),
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&full_info)?);
        return Ok(());
    }

    println!(
        "{} {}",
        full_info.package.name.bold(),
        full_info.package.version.green()
    );
    if !full_info.package.description.is_empty() {
        println!("{}", full_info.package.description);
    }
    if !full_info.package.license.is_empty() {
        println!("{}: {}", "License".dimmed(), full_info.package.license);
    }
    if !full_info.package.repository.is_empty() {
        println!(
            "{}: {}",
            "Repository".dimmed(),
            full_info.package.repository.cyan()
        );
    }

    let cfg = &full_info.config;
    println!();
    println!("{}", "Configuration".bold().underline());
    if let Some(ref path) = cfg.config_file {
        println!("{}: {}", "Config file".dimmed(), path.cyan());
    } else {
        println!("{}: {}", "Config file".dimmed(), "none loaded".yellow());
    }
    println!("{}: {}", "Log level".dimmed(), cfg.log_level);
    if let Some(ref dir) = cfg.log_dir {
        println!("{}: {}", "Log directory".dimmed(), dir);
    }
    println!("{}: {}", "Predictor".dimmed(), cfg.predictor);
    if cfg.predictor == "gemini" && !cfg.gemini_key_set {
        println!("{}: {}", "Gemini API key".dimmed(), "not set".yellow());
    }
    println!("{}: {}", "Caching".dimmed(), cfg.caching);
    if cfg.show_all_errors {
        println!("{}: {}", "Max problems".dimmed(), "unlimited");
    } else {
        println!("{}: {}", "Max problems".dimmed(), cfg.max_number_of_problems);
    }
    if cfg.rules > 0 {
        println!("{}: {}", "Path rules".dimmed(), cfg.rules);
    }

    let dict = &full_info.dictionary;
    println!();
    println!("{}", "Dictionary".bold().underline());
    println!("{}: {}", "Source".dimmed(), dict.source.cyan());
    match dict.store {
        Some(ref store) => println!("{}: {}", "Store".dimmed(), store),
        None => println!("{}: {}", "Store".dimmed(), "in memory".yellow()),
    }
    if let Some(ref dir) = dict.data_dir {
        println!("{}: {}", "Data directory".dimmed(), dir);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_info_text_succeeds() {
        assert!(cmd_info(InfoArgs::default(), false, &Config::default(), &ConfigSources::default()).is_ok());
    }

    #[test]
    fn test_cmd_info_json_via_global() {
        assert!(cmd_info(InfoArgs::default(), true, &Config::default(), &ConfigSources::default()).is_ok());
    }

    #[test]
    fn test_config_info_no_file() {
        let info = ConfigInfo::from_config(&Config::default(), &ConfigSources::default());
        assert!(info.config_file.is_none());
        assert_eq!(info.log_level, "info");
        assert_eq!(info.predictor, "cmudict");
        assert_eq!(info.caching, "eager");
        assert!(!info.gemini_key_set);
    }

    #[test]
    fn test_empty_gemini_key_counts_as_unset() {
        let config = Config {
            gemini_api_key: Some(String::new()),
            ..Config::default()
        };
        let info = ConfigInfo::from_config(&config, &ConfigSources::default());
        assert!(!info.gemini_key_set);
    }

    #[test]
    fn test_in_memory_dictionary_has_no_store() {
        let mut config = Config::default();
        config.dictionary.in_memory = true;
        let info = DictionaryInfo::from_config(&config);
        assert!(info.store.is_none());
    }
}
