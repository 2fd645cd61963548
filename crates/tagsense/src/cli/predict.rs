//! The `tagsense predict` command: score images with a local model.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tagsense_core::{Config, LabelVocabulary, Suggestion, SuggestionPipeline, TagModel};

use super::expand_path;

/// Arguments for the `predict` command.
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Model directory (model.onnx, config.json, ...)
    pub model: PathBuf,

    /// Image paths or URLs
    #[arg(required = true)]
    pub images: Vec<String>,

    /// Width images are resized to before batching
    #[arg(long)]
    pub resize_image_width: Option<u32>,
}

/// JSON printed on stdout.
#[derive(Debug, Serialize)]
pub struct PredictOutput {
    pub scores: Vec<Vec<f32>>,
    pub sorted_indices: Vec<Vec<usize>>,
    pub tags: BTreeMap<u32, String>,
}

impl PredictOutput {
    pub fn new(suggestions: Vec<Suggestion>, vocabulary: &LabelVocabulary) -> Self {
        let (scores, sorted_indices) = suggestions
            .into_iter()
            .map(|s| (s.scores, s.ranking))
            .unzip();
        Self {
            scores,
            sorted_indices,
            tags: vocabulary.id2label(),
        }
    }
}

/// Execute the predict command.
pub async fn execute(args: PredictArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(width) = args.resize_image_width {
        config.inference.resize_image_width = width;
    }
    config.validate()?;

    let model_dir = expand_path(&args.model);
    let model = tokio::task::spawn_blocking(move || TagModel::load(&model_dir)).await??;
    let pipeline = SuggestionPipeline::new(model, &config.inference, &config.limits)?;

    let suggestions = pipeline.suggest(&args.images).await?;
    let output = PredictOutput::new(suggestions, pipeline.vocabulary());
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
