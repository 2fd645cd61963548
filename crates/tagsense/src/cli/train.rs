//! The `tagsense train` command.

use std::path::PathBuf;

use clap::Args;
use tagsense_core::train::TrainOutcome;
use tagsense_core::{Config, TrainingPlan};

use super::expand_path;

/// Arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Preprocessed dataset directory
    pub input: PathBuf,

    /// Directory the trained model is written to
    pub output: PathBuf,
}

/// Execute the train command.
pub async fn execute(args: TrainArgs, config: Config) -> anyhow::Result<()> {
    let input = expand_path(&args.input);
    let output = expand_path(&args.output);

    let plan = TrainingPlan::prepare(&input, &output, &config.train)?;
    match plan.run().await? {
        TrainOutcome::LabelsWritten(path) => {
            println!("Labels written to {}", path.display());
            println!("Set [train] command in the config to run a trainer automatically.");
        }
        TrainOutcome::Trained(dir) => {
            println!("Model written to {}", dir.display());
        }
    }
    Ok(())
}
