//! One request's path: normalize every reference, predict once, assemble.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Semaphore;

use crate::config::{InferenceConfig, InvalidImagePolicy, LimitsConfig};
use crate::error::{ConfigError, ImageError, ModelError, SuggestError};
use crate::model::{Prediction, TagModel};
use crate::normalize::{ImageNormalizer, NormalizedImage};
use crate::vocabulary::LabelVocabulary;

use super::assembler::{assemble, Suggestion};

/// Shared, read-only request pipeline.
///
/// Normalization concurrency is bounded across all requests by one
/// semaphore; model evaluation runs on the blocking pool.
pub struct SuggestionPipeline {
    normalizer: ImageNormalizer,
    model: TagModel,
    policy: InvalidImagePolicy,
    permits: Arc<Semaphore>,
}

impl SuggestionPipeline {
    pub fn new(
        model: TagModel,
        inference: &InferenceConfig,
        limits: &LimitsConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            normalizer: ImageNormalizer::new(inference, limits)?,
            model,
            policy: inference.on_invalid_image,
            permits: Arc::new(Semaphore::new(inference.effective_normalize_workers())),
        })
    }

    pub fn vocabulary(&self) -> &Arc<LabelVocabulary> {
        self.model.vocabulary()
    }

    pub fn model(&self) -> &TagModel {
        &self.model
    }

    pub fn policy(&self) -> InvalidImagePolicy {
        self.policy
    }

    /// Suggest tags for every reference, in request order.
    pub async fn suggest(&self, references: &[String]) -> Result<Vec<Suggestion>, SuggestError> {
        if references.is_empty() {
            return Err(ModelError::EmptyBatch.into());
        }

        let normalized = join_all(references.iter().map(|r| self.normalize_one(r))).await;

        let mut images: Vec<NormalizedImage> = Vec::with_capacity(references.len());
        let mut positions = Vec::with_capacity(references.len());
        for (i, result) in normalized.into_iter().enumerate() {
            match result {
                Ok(image) => {
                    images.push(image);
                    positions.push(i);
                }
                Err(e) => match self.policy {
                    InvalidImagePolicy::Fail => return Err(e.into()),
                    InvalidImagePolicy::Skip => {
                        tracing::warn!(reference = e.reference(), error = %e, "Skipping invalid image");
                    }
                },
            }
        }

        let prediction = if images.is_empty() {
            tracing::debug!("No valid images in request, skipping model evaluation");
            Prediction::default()
        } else {
            self.predict(images).await?
        };

        let prediction = prediction.scatter(&positions, references.len());
        Ok(assemble(references, prediction)?)
    }

    async fn normalize_one(&self, reference: &str) -> Result<NormalizedImage, ImageError> {
        // The semaphore is never closed; a missing permit only lifts the bound.
        let _permit = self.permits.acquire().await.ok();
        self.normalizer.normalize(reference).await
    }

    async fn predict(&self, images: Vec<NormalizedImage>) -> Result<Prediction, SuggestError> {
        let predictor = self.model.predictor().clone();
        let start = std::time::Instant::now();
        let count = images.len();

        let prediction = tokio::task::spawn_blocking(move || predictor.predict(&images))
            .await
            .map_err(|e| ModelError::Inference(format!("Inference task failed: {e}")))??;

        tracing::debug!("Evaluated {} images in {:?}", count, start.elapsed());
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::predictor::tests::LinearClassifier;
    use crate::model::{Classifier, PreprocessorConfig};
    use image::{Rgb, RgbImage};
    use ndarray::{Array2, Array4};
    use std::path::Path;

    struct Unreachable;

    impl Classifier for Unreachable {
        fn logits(&self, _pixels: &Array4<f32>) -> Result<Array2<f32>, ModelError> {
            panic!("model must not be called");
        }
    }

    fn pipeline_with(
        classifier: Arc<dyn Classifier>,
        labels: usize,
        policy: InvalidImagePolicy,
    ) -> SuggestionPipeline {
        let names: Vec<String> = (0..labels).map(|i| format!("tag{i}")).collect();
        let vocabulary = LabelVocabulary::from_pairs(
            names.iter().enumerate().map(|(i, n)| (i as u32, n.as_str())),
        )
        .unwrap();
        let model =
            TagModel::from_parts(classifier, PreprocessorConfig::default(), vocabulary).unwrap();
        let inference = InferenceConfig {
            resize_image_width: 32,
            on_invalid_image: policy,
            ..InferenceConfig::default()
        };
        SuggestionPipeline::new(model, &inference, &LimitsConfig::default()).unwrap()
    }

    fn pipeline(policy: InvalidImagePolicy) -> SuggestionPipeline {
        pipeline_with(
            Arc::new(LinearClassifier {
                bias: vec![0.0, 0.2, 0.4],
            }),
            3,
            policy,
        )
    }

    fn write_png(dir: &Path, name: &str, value: u8) -> String {
        let path = dir.join(name);
        RgbImage::from_pixel(40, 30, Rgb([value, value, value]))
            .save(&path)
            .unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_suggest_keeps_request_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_png(dir.path(), "img1.png", 10);
        let b = write_png(dir.path(), "img2.png", 240);

        let p = pipeline(InvalidImagePolicy::Fail);
        let out = p.suggest(&[b.clone(), a.clone()]).await.unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].image_ref, b);
        assert_eq!(out[1].image_ref, a);
        for s in &out {
            assert_eq!(s.scores.len(), 3);
            assert_eq!(s.ranking.len(), 3);
        }
        assert_ne!(out[0].scores, out[1].scores);
    }

    #[tokio::test]
    async fn test_fail_policy_fails_request() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_png(dir.path(), "ok.png", 10);
        let missing = dir.path().join("missing.png").to_string_lossy().into_owned();

        let p = pipeline(InvalidImagePolicy::Fail);
        let err = p.suggest(&[a, missing.clone()]).await.unwrap_err();
        match err {
            SuggestError::Image(e) => assert_eq!(e.reference(), missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_skip_policy_keeps_positions() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_png(dir.path(), "a.png", 10);
        let corrupt = dir.path().join("corrupt.jpg");
        std::fs::write(&corrupt, b"\xFF\xD8\xFF\xE0 definitely not a jpeg").unwrap();
        let corrupt = corrupt.to_string_lossy().into_owned();
        let b = write_png(dir.path(), "b.png", 200);

        let p = pipeline(InvalidImagePolicy::Skip);
        let out = p.suggest(&[a, corrupt.clone(), b]).await.unwrap();

        assert_eq!(out.len(), 3);
        assert_eq!(out[1].image_ref, corrupt);
        assert!(out[1].is_skipped());
        assert!(out[1].ranking.is_empty());
        assert_eq!(out[0].scores.len(), 3);
        assert_eq!(out[2].scores.len(), 3);
    }

    #[tokio::test]
    async fn test_all_invalid_never_calls_model() {
        let p = pipeline_with(Arc::new(Unreachable), 2, InvalidImagePolicy::Skip);
        let out = p
            .suggest(&["/nope/1.jpg".to_string(), "/nope/2.jpg".to_string()])
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(Suggestion::is_skipped));
    }

    #[tokio::test]
    async fn test_empty_request() {
        let p = pipeline(InvalidImagePolicy::Fail);
        let err = p.suggest(&[]).await.unwrap_err();
        assert!(matches!(err, SuggestError::Model(ModelError::EmptyBatch)));
    }
}
