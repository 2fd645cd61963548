//! Zipping image references with prediction rows.

use serde::Serialize;

use crate::error::ModelError;
use crate::model::Prediction;

/// Tag suggestions for one image of a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    /// The reference exactly as the caller sent it
    pub image_ref: String,
    /// One score per label, indexed by label id
    pub scores: Vec<f32>,
    /// Label ids by descending score
    pub ranking: Vec<usize>,
}

impl Suggestion {
    /// Whether this image was left out of the model batch.
    pub fn is_skipped(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Pair each reference with its prediction row, keeping request order.
pub fn assemble(
    references: &[String],
    prediction: Prediction,
) -> Result<Vec<Suggestion>, ModelError> {
    if references.len() != prediction.scores.len()
        || references.len() != prediction.rankings.len()
    {
        return Err(ModelError::ShapeMismatch {
            expected: format!("{} prediction rows", references.len()),
            actual: format!(
                "{} score rows, {} ranking rows",
                prediction.scores.len(),
                prediction.rankings.len()
            ),
        });
    }

    Ok(references
        .iter()
        .zip(prediction.scores)
        .zip(prediction.rankings)
        .map(|((image_ref, scores), ranking)| Suggestion {
            image_ref: image_ref.clone(),
            scores,
            ranking,
        })
        .collect())
}
