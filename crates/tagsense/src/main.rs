//! tagsense CLI - image tag suggestion with a multi-label vision transformer.
//!
//! # Usage
//!
//! ```bash
//! # Prepare a dataset (rotate, resize, split)
//! tagsense preprocess ./raw ./data
//!
//! # Write labels.json and start the configured trainer
//! tagsense train ./data ./model
//!
//! # Score images locally
//! tagsense predict ./model cat.jpg dog.jpg
//!
//! # Serve tag_suggestion.v1.TagSuggestionService
//! tagsense server ./model --listen 0.0.0.0:50051
//!
//! # Call a running server
//! tagsense suggest cat.jpg --endpoint http://127.0.0.1:50051
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// tagsense - image tag suggestion service and tooling.
#[derive(Parser, Debug)]
#[command(name = "tagsense")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "TAGSENSE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Rotate, resize and split a raw dataset
    Preprocess(cli::preprocess::PreprocessArgs),

    /// Derive the label set and hand off to the trainer
    Train(cli::train::TrainArgs),

    /// Score images with a local model and print the result
    Predict(cli::predict::PredictArgs),

    /// Run the gRPC suggestion service
    Server(cli::server::ServerArgs),

    /// Dump dataset images as numbered PNGs
    Extract(cli::extract::ExtractArgs),

    /// Call a running suggestion service
    Suggest(cli::suggest::SuggestArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match &cli.config {
        Some(path) => tagsense_core::Config::load_from(path)?,
        None => match tagsense_core::Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check your config file with `tagsense config path`."
                );
                tagsense_core::Config::default()
            }
        },
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("tagsense v{}", tagsense_core::VERSION);

    match cli.command {
        Commands::Preprocess(args) => cli::preprocess::execute(args, config).await,
        Commands::Train(args) => cli::train::execute(args, config).await,
        Commands::Predict(args) => cli::predict::execute(args, config).await,
        Commands::Server(args) => cli::server::execute(args, config).await,
        Commands::Extract(args) => cli::extract::execute(args).await,
        Commands::Suggest(args) => cli::suggest::execute(args).await,
        Commands::Config(args) => cli::config::execute(args, cli.config).await,
    }
}
