//! The `tagsense server` command.

use std::path::PathBuf;

use clap::Args;
use tagsense_core::{Config, TagModel};

use super::expand_path;

/// Arguments for the `server` command.
#[derive(Args, Debug)]
pub struct ServerArgs {
    /// Model directory (defaults to general.model_dir)
    pub model: Option<PathBuf>,

    /// Width images are resized to before batching
    #[arg(long)]
    pub resize_image_width: Option<u32>,

    /// Socket address to listen on
    #[arg(long)]
    pub listen: Option<String>,
}

/// Execute the server command. Runs until Ctrl-C.
pub async fn execute(args: ServerArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(width) = args.resize_image_width {
        config.inference.resize_image_width = width;
    }
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }
    config.validate()?;

    let model_dir = args
        .model
        .as_deref()
        .map(expand_path)
        .unwrap_or_else(|| config.model_dir());
    let model = tokio::task::spawn_blocking(move || TagModel::load(&model_dir)).await??;

    tagsense_core::server::serve(model, &config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
        }
        tracing::info!("Shutting down");
    })
    .await?;
    Ok(())
}
