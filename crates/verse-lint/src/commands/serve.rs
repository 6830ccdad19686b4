//! Serve command: MCP server on stdio.

use std::sync::Arc;

use clap::Args;
use rmcp::ServiceExt;
use tracing::{info, instrument, warn};

use verse_lint_core::Workspace;
use verse_lint_core::config::Config;

use super::{Context, dictionary_handle};
use crate::server::VerseServer;

/// Arguments for the `serve` subcommand.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Build the dictionary before accepting requests instead of in the
    /// background.
    #[arg(long)]
    pub wait_for_dictionary: bool,
}

/// Run the MCP server until the client disconnects.
#[instrument(name = "cmd_serve", skip_all)]
pub async fn cmd_serve(args: ServeArgs, ctx: &Context, config: Config) -> anyhow::Result<()> {
    let dictionary = dictionary_handle(&config, false);
    if args.wait_for_dictionary {
        dictionary.get().await?;
    } else {
        let warm = Arc::clone(&dictionary);
        tokio::spawn(async move {
            if let Err(e) = warm.get().await {
                warn!(error = %e, "background dictionary build failed");
            }
        });
    }

    let workspace = Arc::new(Workspace::new(&config, dictionary).with_root(ctx.cwd.clone()));
    let server = VerseServer::new(workspace, ctx.max_input);

    info!("starting MCP server on stdio");
    server
        .serve(rmcp::transport::stdio())
        .await?
        .waiting()
        .await?;
    info!("MCP server stopped");
    Ok(())
}
