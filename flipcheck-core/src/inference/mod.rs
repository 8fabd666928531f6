//! Sentiment classifier trait and batched, order-preserving inference.

pub mod http;

use crate::error::FlipcheckError;
use crate::label::{Label, normalize_label};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

pub use http::HttpClassifier;

/// A classifier's answer for one text, before label normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    pub label: String,
    pub score: f64,
}

/// A normalized prediction ready to be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Label,
    pub confidence: f64,
}

/// Sentiment classifier trait.
#[async_trait]
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    /// Classify a batch, returning one prediction per text in input order.
    async fn classify(&self, texts: &[String]) -> Result<Vec<RawPrediction>, FlipcheckError>;
}

/// Classify `texts` in batches of `batch_size`, one request at a time.
///
/// The result is index-aligned with `texts`. A batch answered with the wrong number
/// of predictions, or a score outside [0, 1], is an error.
pub async fn classify_all(
    classifier: &dyn Classifier,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Prediction>, FlipcheckError> {
    if batch_size == 0 {
        return Err(FlipcheckError::invalid_input("batch_size must be at least 1"));
    }
    let total_batches = texts.len().div_ceil(batch_size);
    let mut predictions = Vec::with_capacity(texts.len());

    for (batch_idx, batch) in texts.chunks(batch_size).enumerate() {
        let raw = classifier.classify(batch).await?;
        if raw.len() != batch.len() {
            return Err(FlipcheckError::classifier(format!(
                "{} returned {} predictions for a batch of {}",
                classifier.name(),
                raw.len(),
                batch.len()
            )));
        }
        for p in raw {
            if !(0.0..=1.0).contains(&p.score) {
                return Err(FlipcheckError::classifier(format!(
                    "{} returned score {} outside [0, 1]",
                    classifier.name(),
                    p.score
                )));
            }
            predictions.push(Prediction {
                label: normalize_label(&p.label),
                confidence: p.score,
            });
        }
        info!(
            batch = batch_idx + 1,
            total = total_batches,
            "Classified batch"
        );
    }

    Ok(predictions)
}
