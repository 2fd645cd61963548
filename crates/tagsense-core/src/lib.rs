//! tagsense core - image tag suggestion with a multi-label ViT classifier.
//!
//! The inference path is a straight pipeline with no shared mutable state:
//!
//! ```text
//! references → load & normalize → batch → classifier → sigmoid → rank → suggestions
//! ```
//!
//! Around it sit the collaborators that produce a model: dataset
//! preprocessing (rotate/resize/split), the training hand-off and the gRPC
//! service that exposes suggestions to other processes.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tagsense_core::{Config, SuggestionPipeline, TagModel};
//!
//! #[tokio::main]
//! async fn main() -> tagsense_core::Result<()> {
//!     let config = Config::load()?;
//!     let model = TagModel::load(&config.model_dir())?;
//!     let pipeline = SuggestionPipeline::new(model, &config.inference, &config.limits)?;
//!
//!     let suggestions = pipeline.suggest(&["./cat.jpg".to_string()]).await?;
//!     println!("Best label: {:?}", suggestions[0].ranking.first());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod math;
pub mod model;
pub mod normalize;
pub mod server;
pub mod suggest;
pub mod train;
pub mod vocabulary;

pub use config::{Config, InvalidImagePolicy};
pub use dataset::{PreprocessReport, Preprocessor};
pub use error::{
    ConfigError, DatasetError, ImageError, ModelError, Result, ServerError, SuggestError,
    TagSenseError, VocabularyError,
};
pub use model::{BatchPredictor, Classifier, OnnxClassifier, Prediction, TagModel};
pub use normalize::{ImageNormalizer, NormalizedImage};
pub use suggest::{Suggestion, SuggestionPipeline};
pub use train::{LabelSet, TrainingPlan};
pub use vocabulary::{Label, LabelVocabulary, TagTree};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
