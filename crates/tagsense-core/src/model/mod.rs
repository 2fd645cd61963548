//! Trained classifier loading and batched prediction.
//!
//! A model is a directory holding the exported ONNX graph plus the JSON files
//! `transformers` writes next to it:
//!
//! ```text
//! model_dir/
//! ├── model.onnx                 # NCHW f32 in, logits [N, L] out
//! ├── config.json                # id2label
//! ├── preprocessor_config.json   # optional pixel preprocessing
//! └── tags.json                  # optional tag tree for full names
//! ```

pub mod config;
pub mod onnx;
pub mod predictor;
pub mod tensor;

pub use config::{ClassifierConfig, InputSize, PreprocessorConfig};
pub use onnx::OnnxClassifier;
pub use predictor::{BatchPredictor, Classifier, Prediction};
pub use tensor::PixelTransform;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ModelError;
use crate::vocabulary::{LabelVocabulary, TagTree};

pub const MODEL_FILE: &str = "model.onnx";
pub const CONFIG_FILE: &str = "config.json";
pub const PREPROCESSOR_FILE: &str = "preprocessor_config.json";
pub const TAGS_FILE: &str = "tags.json";

/// A loaded classifier together with its label vocabulary.
///
/// Cheap to clone; weights and labels are shared behind `Arc`.
#[derive(Clone)]
pub struct TagModel {
    predictor: BatchPredictor,
    vocabulary: Arc<LabelVocabulary>,
}

impl TagModel {
    /// Load every artifact from a model directory.
    pub fn load(model_dir: &Path) -> Result<Self, ModelError> {
        if !model_dir.is_dir() {
            return Err(ModelError::NotFound(model_dir.to_path_buf()));
        }

        let classifier_config: ClassifierConfig = config::read_json(&model_dir.join(CONFIG_FILE))?;
        if let Some(problem_type) = classifier_config.problem_type.as_deref() {
            if problem_type != "multi_label_classification" {
                tracing::warn!(
                    "Model declares problem_type {problem_type:?}; scores are still sigmoid-activated"
                );
            }
        }

        let mut vocabulary = LabelVocabulary::from_id2label(&classifier_config.id2label)?;
        let tags_path = model_dir.join(TAGS_FILE);
        if tags_path.exists() {
            let tree = TagTree::load(&tags_path)?;
            vocabulary = vocabulary.with_hierarchy(&tree);
        }

        let preprocessor_path = model_dir.join(PREPROCESSOR_FILE);
        let preprocessor = if preprocessor_path.exists() {
            config::read_json(&preprocessor_path)?
        } else {
            tracing::debug!("No {PREPROCESSOR_FILE} in {model_dir:?}, using ViT defaults");
            PreprocessorConfig::default()
        };

        let classifier = OnnxClassifier::load(&model_dir.join(MODEL_FILE))?;

        tracing::info!(
            "Loaded model from {:?}: {} labels, input {}x{}",
            model_dir,
            vocabulary.len(),
            preprocessor.size.width,
            preprocessor.size.height
        );

        Self::from_parts(Arc::new(classifier), preprocessor, vocabulary)
    }

    /// Assemble a model from an arbitrary classifier.
    pub fn from_parts(
        classifier: Arc<dyn Classifier>,
        preprocessor: PreprocessorConfig,
        vocabulary: LabelVocabulary,
    ) -> Result<Self, ModelError> {
        if vocabulary.is_empty() {
            return Err(ModelError::Config {
                path: PathBuf::from(CONFIG_FILE),
                message: "id2label is empty".to_string(),
            });
        }
        let predictor = BatchPredictor::new(
            classifier,
            PixelTransform::new(preprocessor),
            vocabulary.len(),
        );
        Ok(Self {
            predictor,
            vocabulary: Arc::new(vocabulary),
        })
    }

    pub fn predictor(&self) -> &BatchPredictor {
        &self.predictor
    }

    pub fn vocabulary(&self) -> &Arc<LabelVocabulary> {
        &self.vocabulary
    }

    pub fn num_labels(&self) -> usize {
        self.vocabulary.len()
    }
}

#[cfg(test)]
mod tests {
    use super::predictor::tests::LinearClassifier;
    use crate::error::VocabularyError;
    use super::*;

    #[test]
    fn test_from_parts() {
        let vocabulary = LabelVocabulary::from_pairs([(0, "cat"), (1, "dog")]).unwrap();
        let model = TagModel::from_parts(
            Arc::new(LinearClassifier {
                bias: vec![0.0, 0.0],
            }),
            PreprocessorConfig::default(),
            vocabulary,
        )
        .unwrap();
        assert_eq!(model.num_labels(), 2);
        assert_eq!(model.predictor().num_labels(), 2);
    }

    #[test]
    fn test_empty_vocabulary_rejected() {
        let result = TagModel::from_parts(
            Arc::new(LinearClassifier { bias: vec![] }),
            PreprocessorConfig::default(),
            LabelVocabulary::default(),
        );
        assert!(matches!(result, Err(ModelError::Config { .. })));
    }

    #[test]
    fn test_load_missing_dir() {
        let result = TagModel::load(Path::new("/definitely/not/a/model"));
        assert!(matches!(result, Err(ModelError::NotFound(_))));
    }

    #[test]
    fn test_load_missing_onnx() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"id2label": {"0": "cat", "1": "dog"}}"#,
        )
        .unwrap();
        let result = TagModel::load(dir.path());
        match result {
            Err(ModelError::NotFound(path)) => assert!(path.ends_with(MODEL_FILE)),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected missing model.onnx"),
        }
    }

    #[test]
    fn test_load_bad_tags_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), r#"{"id2label": {"0": "cat"}}"#).unwrap();
        std::fs::write(dir.path().join(TAGS_FILE), "not json").unwrap();
        let result = TagModel::load(dir.path());
        assert!(matches!(result, Err(ModelError::Vocabulary(_))));
    }

    #[test]
    fn test_load_huge_label_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"id2label": {"4294967295": "x"}}"#,
        )
        .unwrap();
        let result = TagModel::load(dir.path());
        assert!(matches!(
            result,
            Err(ModelError::Vocabulary(VocabularyError::InvalidId(_)))
        ));
    }
}
