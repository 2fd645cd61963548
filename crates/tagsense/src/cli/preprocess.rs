//! The `tagsense preprocess` command.

use std::path::PathBuf;

use clap::Args;
use tagsense_core::{Config, Preprocessor};

use super::{expand_path, spinner};

/// Arguments for the `preprocess` command.
#[derive(Args, Debug)]
pub struct PreprocessArgs {
    /// Raw dataset directory (tags.json + split directories with metadata.jsonl)
    pub input: PathBuf,

    /// Directory to write the processed dataset to
    pub output: PathBuf,

    /// Width every image is resized to
    #[arg(long)]
    pub target_width: Option<u32>,

    /// Rotation augmentation step in degrees (0 disables)
    #[arg(long)]
    pub rotation_step: Option<u32>,

    /// Fraction of source images moved to the validation split
    #[arg(long)]
    pub validation_ratio: Option<f64>,

    /// Seed for the train/validation shuffle
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Execute the preprocess command.
pub async fn execute(args: PreprocessArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(width) = args.target_width {
        config.preprocess.target_width = width;
    }
    if let Some(step) = args.rotation_step {
        config.preprocess.rotation_step_degrees = step;
    }
    if let Some(ratio) = args.validation_ratio {
        config.preprocess.validation_ratio = ratio;
    }
    if let Some(seed) = args.seed {
        config.preprocess.seed = seed;
    }
    config.validate()?;

    let input = expand_path(&args.input);
    let output = expand_path(&args.output);
    if input == output {
        anyhow::bail!("Output directory must differ from the input directory");
    }

    let progress = spinner(format!("Preprocessing {}", input.display()));
    let result = Preprocessor::new(config.preprocess.clone(), config.limits.clone())
        .run(&input, &output)
        .await;
    progress.finish_and_clear();
    let report = result?;

    eprintln!();
    eprintln!("  Preprocessing complete");
    eprintln!("  ----------------------");
    eprintln!("  Sources:     {}", report.sources);
    eprintln!("  Skipped:     {}", report.skipped);
    eprintln!("  Train:       {}", report.train_images);
    eprintln!("  Validation:  {}", report.validation_images);
    eprintln!("  Output:      {}", output.display());
    Ok(())
}
