// Local ONNX offensiveness scorer.
//
// Runs the exported sequence model entirely on the local CPU. The model takes
// a single `[1, max_length]` id sequence and emits one score per row, either
// already squashed by a sigmoid output layer or as a raw logit.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::{DynValue, Tensor};
use tracing::debug;

use super::sequence::SequenceSpec;
use super::tokenizer::SequenceTokenizer;
use super::traits::OffensivenessScorer;

/// Element type of the model's input tensor.
///
/// Keras models exported with tf2onnx usually keep the float32 `Input` dtype
/// even though the values are vocabulary ids.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelInput {
    Float32,
    Int64,
    Int32,
}

impl ModelInput {
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "float32" | "f32" => Ok(Self::Float32),
            "int64" | "i64" => Ok(Self::Int64),
            "int32" | "i32" => Ok(Self::Int32),
            other => anyhow::bail!(
                "Unknown model input type '{other}' (expected float32, int64 or int32)"
            ),
        }
    }
}

/// How to read the model's scalar output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelOutput {
    /// Output layer already applies sigmoid
    Probability,
    /// Raw logit; sigmoid is applied here
    Logit,
}

impl ModelOutput {
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "probability" | "sigmoid" => Ok(Self::Probability),
            "logit" | "logits" => Ok(Self::Logit),
            other => anyhow::bail!(
                "Unknown model output kind '{other}' (expected probability or logit)"
            ),
        }
    }
}

/// Everything about the model's I/O contract that isn't in the ONNX file.
#[derive(Debug, Clone, Copy)]
pub struct OnnxOptions {
    pub sequence: SequenceSpec,
    pub input: ModelInput,
    pub output: ModelOutput,
}

/// ONNX-backed scorer. Holds the session behind Arc<Mutex> because
/// `Session::run` takes &mut self and spawn_blocking needs 'static handles.
pub struct OnnxOffensivenessScorer {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<dyn SequenceTokenizer>,
    options: OnnxOptions,
}

impl OnnxOffensivenessScorer {
    /// Load the ONNX model from `model_path`, pairing it with an already
    /// loaded tokenizer.
    pub fn load(
        model_path: &Path,
        tokenizer: Box<dyn SequenceTokenizer>,
        options: OnnxOptions,
    ) -> Result<Self> {
        if !model_path.exists() {
            anyhow::bail!("Model file not found: {}", model_path.display());
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        debug!(
            max_length = options.sequence.max_length,
            input = ?options.input,
            output = ?options.output,
            "Loaded ONNX model from {}",
            model_path.display()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::from(tokenizer),
            options,
        })
    }
}

#[async_trait]
impl OffensivenessScorer for OnnxOffensivenessScorer {
    async fn score_text(&self, text: &str) -> Result<f64> {
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let options = self.options;
        let text = text.to_string();

        // Tokenization and inference are CPU-bound; keep them off the runtime.
        tokio::task::spawn_blocking(move || {
            let ids = tokenizer.encode(&text)?;
            let padded = options.sequence.pad(&ids);
            let input = input_tensor(&padded, options.input)?;

            let raw = {
                let mut session = session
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

                let outputs = session
                    .run(ort::inputs![input])
                    .context("ONNX inference failed")?;

                // Output shape: [1, 1] or [1], one score for our single row
                let (_shape, data) = outputs[0]
                    .try_extract_tensor::<f32>()
                    .context("Failed to extract output tensor")?;

                *data
                    .first()
                    .ok_or_else(|| anyhow::anyhow!("Model produced an empty output tensor"))?
            };

            let probability = to_probability(raw as f64, options.output)?;

            debug!(
                tokens = ids.len(),
                probability,
                text_preview = %crate::output::truncate_chars(&text, 50),
                "ONNX scored text"
            );

            Ok(probability)
        })
        .await
        .context("spawn_blocking panicked")?
    }
}

/// Build the `[1, max_length]` input tensor in the element type the model expects.
fn input_tensor(ids: &[i64], input: ModelInput) -> Result<DynValue> {
    let shape = [1_i64, ids.len() as i64];
    let value = match input {
        ModelInput::Float32 => {
            let data: Vec<f32> = ids.iter().map(|&id| id as f32).collect();
            Tensor::from_array((shape, data))
                .context("Failed to create input tensor")?
                .into_dyn()
        }
        ModelInput::Int64 => Tensor::from_array((shape, ids.to_vec()))
            .context("Failed to create input tensor")?
            .into_dyn(),
        ModelInput::Int32 => {
            let data: Vec<i32> = ids.iter().map(|&id| id as i32).collect();
            Tensor::from_array((shape, data))
                .context("Failed to create input tensor")?
                .into_dyn()
        }
    };
    Ok(value)
}

/// Turn the raw model output into a probability in [0, 1].
fn to_probability(raw: f64, output: ModelOutput) -> Result<f64> {
    if !raw.is_finite() {
        anyhow::bail!("Model produced a non-finite score: {raw}");
    }
    let probability = match output {
        ModelOutput::Probability => raw,
        ModelOutput::Logit => sigmoid(raw),
    };
    Ok(probability.clamp(0.0, 1.0))
}

/// Sigmoid activation: maps any real number to (0, 1).
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
