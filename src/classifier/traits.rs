// Scorer trait: the seam between the classification policy and the model.
//
// The default implementation runs a local ONNX model. Tests swap in
// fixed-probability scorers without touching the rest of the pipeline.

use anyhow::Result;
use async_trait::async_trait;

/// Trait for scoring how offensive a piece of text is. Implementations must be
/// async because inference is offloaded to a blocking thread.
#[async_trait]
pub trait OffensivenessScorer: Send + Sync {
    /// Score a single text. Returns a probability in [0.0, 1.0].
    async fn score_text(&self, text: &str) -> Result<f64>;
}
