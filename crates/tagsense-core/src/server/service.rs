//! `TagSuggestionService` implementation.

use std::sync::Arc;
use std::time::Instant;

use tonic::{Code, Request, Response, Status};

use crate::error::{ModelError, SuggestError};
use crate::suggest::Suggestion;
use crate::vocabulary::LabelVocabulary;

use super::pool::WorkerPool;
use super::proto::tag_suggestion_service_server::TagSuggestionService;
use super::proto::{self, SuggestRequest, SuggestResponse};

/// Stateless handler; every request goes through the worker pool.
pub struct SuggestService {
    pool: WorkerPool,
    vocabulary: Arc<LabelVocabulary>,
}

impl SuggestService {
    pub fn new(pool: WorkerPool, vocabulary: Arc<LabelVocabulary>) -> Self {
        Self { pool, vocabulary }
    }
}

#[tonic::async_trait]
impl TagSuggestionService for SuggestService {
    async fn suggest(
        &self,
        request: Request<SuggestRequest>,
    ) -> Result<Response<SuggestResponse>, Status> {
        let references = request.into_inner().image_urls;
        let count = references.len();
        let start = Instant::now();

        match self.pool.submit(references).await {
            Ok(suggestions) => {
                tracing::info!(
                    method = "Suggest",
                    images = count,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Request served"
                );
                Ok(Response::new(build_response(suggestions, &self.vocabulary)))
            }
            Err(e) => {
                tracing::error!(method = "Suggest", images = count, error = %e, "Request failed");
                Err(to_status(&e))
            }
        }
    }
}

/// Map a request failure onto a gRPC status.
pub fn to_status(error: &SuggestError) -> Status {
    let code = match error {
        SuggestError::Image(_) => Code::InvalidArgument,
        SuggestError::Model(ModelError::EmptyBatch) => Code::InvalidArgument,
        SuggestError::Model(_) => Code::Internal,
        SuggestError::Saturated { .. } => Code::ResourceExhausted,
        SuggestError::WorkerLost(_) => Code::Internal,
    };
    Status::new(code, error.to_string())
}

/// Convert suggestions plus the vocabulary into the wire response.
pub fn build_response(suggestions: Vec<Suggestion>, vocabulary: &LabelVocabulary) -> SuggestResponse {
    let suggestions = suggestions
        .into_iter()
        .map(|s| proto::Suggestion {
            image_url: s.image_ref,
            scores: s.scores.into_iter().map(f64::from).collect(),
            sorted_score_indices: s.ranking.into_iter().map(|i| i as i64).collect(),
        })
        .collect();

    let all_tags = vocabulary
        .iter()
        .map(|label| (label.id as i64, label.name.clone()))
        .collect();

    let tags = if vocabulary.is_hierarchical() {
        vocabulary
            .iter()
            .map(|label| {
                (
                    label.id as i64,
                    proto::Tag {
                        id: label.id as i64,
                        name: label.name.clone(),
                        full_name: label.full_name.clone().unwrap_or_default(),
                    },
                )
            })
            .collect()
    } else {
        Default::default()
    };

    SuggestResponse {
        suggestions,
        all_tags,
        tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InferenceConfig, LimitsConfig};
    use crate::error::ImageError;
    use crate::model::predictor::tests::LinearClassifier;
    use crate::model::{PreprocessorConfig, TagModel};
    use crate::suggest::SuggestionPipeline;
    use crate::vocabulary::TagTree;
    use image::{Rgb, RgbImage};

    fn vocabulary() -> LabelVocabulary {
        LabelVocabulary::from_pairs([(0, "cat"), (1, "dog"), (2, "bird")]).unwrap()
    }

    fn service(workers: usize, capacity: usize) -> SuggestService {
        let model = TagModel::from_parts(
            Arc::new(LinearClassifier {
                bias: vec![0.0, 0.1, 0.2],
            }),
            PreprocessorConfig::default(),
            vocabulary(),
        )
        .unwrap();
        let vocabulary = Arc::clone(model.vocabulary());
        let inference = InferenceConfig {
            resize_image_width: 16,
            ..InferenceConfig::default()
        };
        let pipeline = Arc::new(
            SuggestionPipeline::new(model, &inference, &LimitsConfig::default()).unwrap(),
        );
        SuggestService::new(WorkerPool::spawn(pipeline, workers, capacity), vocabulary)
    }

    #[tokio::test]
    async fn test_suggest_two_images() {
        let dir = tempfile::tempdir().unwrap();
        let mut urls = Vec::new();
        for (name, value) in [("img1.jpg", 30u8), ("img2.jpg", 220u8)] {
            let path = dir.path().join(name);
            RgbImage::from_pixel(20, 10, Rgb([value; 3])).save(&path).unwrap();
            urls.push(path.to_string_lossy().into_owned());
        }

        let response = service(2, 8)
            .suggest(Request::new(SuggestRequest {
                image_urls: urls.clone(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.all_tags.len(), 3);
        assert_eq!(response.all_tags[&1], "dog");
        assert!(response.tags.is_empty());
        assert_eq!(response.suggestions.len(), 2);
        assert_eq!(response.suggestions[0].image_url, urls[0]);
        assert_eq!(response.suggestions[1].image_url, urls[1]);
        for s in &response.suggestions {
            assert_eq!(s.scores.len(), 3);
            assert_eq!(s.sorted_score_indices.len(), 3);
        }
    }

    #[tokio::test]
    async fn test_bad_image_is_invalid_argument() {
        let status = service(1, 4)
            .suggest(Request::new(SuggestRequest {
                image_urls: vec!["/no/such/image.jpg".to_string()],
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
        assert!(status.message().contains("/no/such/image.jpg"));
    }

    #[tokio::test]
    async fn test_saturated_is_resource_exhausted() {
        let svc = service(0, 1);
        let _pending = svc.pool.enqueue(vec!["x.jpg".to_string()]).unwrap();
        let status = svc
            .suggest(Request::new(SuggestRequest {
                image_urls: vec!["y.jpg".to_string()],
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::ResourceExhausted);
    }

    #[test]
    fn test_status_mapping() {
        let image = SuggestError::Image(ImageError::Empty {
            reference: "a".to_string(),
        });
        assert_eq!(to_status(&image).code(), Code::InvalidArgument);
        assert_eq!(
            to_status(&SuggestError::Model(ModelError::EmptyBatch)).code(),
            Code::InvalidArgument
        );
        assert_eq!(
            to_status(&SuggestError::Model(ModelError::Inference("x".into()))).code(),
            Code::Internal
        );
        assert_eq!(
            to_status(&SuggestError::WorkerLost("gone".into())).code(),
            Code::Internal
        );
    }

    #[test]
    fn test_hierarchical_tags_filled() {
        let tree = TagTree::from_json(
            r#"[{"id": 0, "name": "Animals", "children": [{"id": 1, "name": "Cat"}]}]"#,
        )
        .unwrap();
        let vocabulary = LabelVocabulary::from_pairs([(0, "Animals"), (1, "Cat")])
            .unwrap()
            .with_hierarchy(&tree);
        let response = build_response(Vec::new(), &vocabulary);
        assert_eq!(response.tags.len(), 2);
        assert_eq!(response.tags[&1].full_name, "Animals > Cat");
    }
}
