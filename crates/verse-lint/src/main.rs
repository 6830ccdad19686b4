//! verse-lint CLI
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use verse_lint::{Cli, Commands, commands};
use verse_lint_core::config::ConfigLoader;

mod observability;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.color.apply();

    if cli.version_only {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // arg_required_else_help ensures we have --version-only or a subcommand
    let Some(command) = cli.command else {
        return Ok(());
    };

    if let Some(ref dir) = cli.chdir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("failed to change directory to {}", dir.display()))?;
    }

    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let cwd = camino::Utf8PathBuf::try_from(cwd).map_err(|e| {
        anyhow::anyhow!(
            "current directory is not valid UTF-8: {}",
            e.into_path_buf().display()
        )
    })?;
    let mut loader = ConfigLoader::new().with_project_search(&cwd);
    if let Some(ref config_path) = cli.config {
        let config_path = camino::Utf8PathBuf::try_from(config_path.clone()).map_err(|e| {
            anyhow::anyhow!(
                "config path is not valid UTF-8: {}",
                e.into_path_buf().display()
            )
        })?;
        loader = loader.with_file(&config_path);
    }
    let (mut config, config_sources) = loader.load().context("failed to load configuration")?;

    if let Some(ref source) = cli.dict_source {
        let source = camino::Utf8PathBuf::try_from(source.clone()).map_err(|e| {
            anyhow::anyhow!(
                "dictionary source path is not valid UTF-8: {}",
                e.into_path_buf().display()
            )
        })?;
        config.dictionary.source_file = Some(source);
    }
    if cli.in_memory {
        config.dictionary.in_memory = true;
    }

    let obs_config = observability::ObservabilityConfig::from_env_with_overrides(
        config
            .log_dir
            .as_ref()
            .map(|dir| dir.as_std_path().to_path_buf()),
    );
    let env_filter = observability::env_filter(cli.quiet, cli.verbose, config.log_level.as_str());
    let _guard = observability::init_observability(&obs_config, env_filter)
        .context("failed to initialize logging/tracing")?;

    debug!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        json = cli.json,
        color = ?cli.color,
        chdir = ?cli.chdir,
        "CLI initialized"
    );

    let max_input = if config.disable_input_limit {
        None
    } else {
        config
            .max_input_bytes
            .or(Some(verse_lint_core::DEFAULT_MAX_INPUT_BYTES))
    };
    let ctx = commands::Context {
        json: cli.json,
        quiet: cli.quiet,
        cwd,
        max_input,
    };

    let rt = tokio::runtime::Runtime::new().context("failed to create async runtime")?;
    let result = rt.block_on(async {
        match command {
            Commands::Analyze(args) => commands::analyze::cmd_analyze(args, &ctx, config).await,
            Commands::Rhymes(args) => commands::rhymes::cmd_rhymes(args, &ctx, &config).await,
            Commands::Complete(args) => {
                commands::complete::cmd_complete(args, &ctx, config).await
            }
            Commands::Dict(cmd) => commands::dict::cmd_dict(cmd, &ctx, &config).await,
            Commands::Info(args) => {
                commands::info::cmd_info(args, ctx.json, &config, &config_sources)
            }
            #[cfg(feature = "mcp")]
            Commands::Serve(args) => commands::serve::cmd_serve(args, &ctx, config).await,
        }
    });
    if let Err(ref err) = result {
        tracing::error!(error = %err, "fatal error");
    }
    result
}
