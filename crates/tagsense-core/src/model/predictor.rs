//! Batched multi-label prediction: logits → sigmoid scores → rankings.

use std::sync::Arc;

use ndarray::{Array2, Array4};
use serde::Serialize;

use crate::error::ModelError;
use crate::math::{rank_descending, sigmoid_in_place};
use crate::normalize::NormalizedImage;

use super::tensor::PixelTransform;

/// Anything that maps an NCHW pixel batch to raw per-label logits.
///
/// Implementations must not mutate model weights between calls.
pub trait Classifier: Send + Sync {
    /// Returns logits shaped `[N, L]` for an input shaped `[N, 3, H, W]`.
    fn logits(&self, pixels: &Array4<f32>) -> Result<Array2<f32>, ModelError>;
}

/// Scores and rankings for one batch, row `i` belonging to image `i`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Prediction {
    /// Independent per-label probabilities in [0, 1]
    pub scores: Vec<Vec<f32>>,
    /// Label indices by descending score
    pub rankings: Vec<Vec<usize>>,
}

impl Prediction {
    /// Number of image rows.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Spread the rows of a prediction over a larger batch.
    ///
    /// `positions[i]` is the row in the result that receives row `i`; every
    /// other row is left empty.
    pub fn scatter(self, positions: &[usize], total: usize) -> Self {
        let mut scores = vec![Vec::new(); total];
        let mut rankings = vec![Vec::new(); total];
        for ((&pos, s), r) in positions.iter().zip(self.scores).zip(self.rankings) {
            scores[pos] = s;
            rankings[pos] = r;
        }
        Self { scores, rankings }
    }
}

/// Runs a whole batch through the classifier in one call.
#[derive(Clone)]
pub struct BatchPredictor {
    classifier: Arc<dyn Classifier>,
    transform: PixelTransform,
    num_labels: usize,
}

impl BatchPredictor {
    pub fn new(classifier: Arc<dyn Classifier>, transform: PixelTransform, num_labels: usize) -> Self {
        Self {
            classifier,
            transform,
            num_labels,
        }
    }

    /// Number of labels (L) every score vector has.
    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    /// Score every image against every label.
    ///
    /// Either the whole batch succeeds or the call fails; nothing partial is
    /// returned.
    pub fn predict(&self, images: &[NormalizedImage]) -> Result<Prediction, ModelError> {
        if images.is_empty() {
            return Err(ModelError::EmptyBatch);
        }

        let pixels = self.transform.batch(images)?;
        let logits = self.classifier.logits(&pixels)?;

        let (rows, cols) = logits.dim();
        if rows != images.len() || cols != self.num_labels {
            return Err(ModelError::ShapeMismatch {
                expected: format!("[{}, {}]", images.len(), self.num_labels),
                actual: format!("[{rows}, {cols}]"),
            });
        }

        let mut scores = Vec::with_capacity(rows);
        let mut rankings = Vec::with_capacity(rows);
        for row in logits.outer_iter() {
            let mut probabilities = row.to_vec();
            sigmoid_in_place(&mut probabilities);
            rankings.push(rank_descending(&probabilities));
            scores.push(probabilities);
        }

        tracing::debug!("Predicted {} images x {} labels", rows, cols);
        Ok(Prediction { scores, rankings })
    }
}
