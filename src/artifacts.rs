// Artifact loading: model, tokenizer and denylist, read once at startup.
//
// Files live in a platform-appropriate directory
// (~/.local/share/chatguard/models/ on Linux) unless overridden per file.
//
// A load failure is fatal unless degraded mode is explicitly allowed, in
// which case the failure is logged and recorded in ModelState so the health
// endpoint can report it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::classifier::onnx::{OnnxOffensivenessScorer, OnnxOptions};
use crate::classifier::tokenizer::load_tokenizer;
use crate::classifier::{Classifier, ModelState};
use crate::config::Config;
use crate::denylist::Denylist;

pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const DENYLIST_FILE: &str = "en.txt";

/// Returns the default directory for model artifacts.
/// Uses the platform data directory: ~/.local/share/chatguard/models/ on Linux.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chatguard")
        .join("models")
}

/// Check whether the model and tokenizer files both exist.
pub fn model_files_present(model_path: &Path, tokenizer_path: &Path) -> bool {
    model_path.exists() && tokenizer_path.exists()
}

/// Load the tokenizer and ONNX model into a ready scorer.
pub fn load_scorer(config: &Config) -> Result<OnnxOffensivenessScorer> {
    let tokenizer = load_tokenizer(&config.tokenizer_path, config.tokenizer_format)
        .context("Failed to load tokenizer artifact")?;
    let options = OnnxOptions {
        sequence: config.sequence,
        input: config.model_input,
        output: config.model_output,
    };
    OnnxOffensivenessScorer::load(&config.model_path, tokenizer, options)
        .context("Failed to load model artifact")
}

/// Build the shared Classifier from the configured artifacts.
pub fn load_classifier(config: &Config) -> Result<Classifier> {
    info!(policy = %config.policy, "Loading model and tokenizer...");

    let model = match load_scorer(config) {
        Ok(scorer) => {
            info!(
                model = %config.model_path.display(),
                tokenizer = %config.tokenizer_path.display(),
                "Model and tokenizer loaded"
            );
            ModelState::Ready(Arc::new(scorer))
        }
        Err(e) if config.allow_degraded => {
            warn!(error = %format!("{e:#}"), "Model unavailable, starting in degraded mode");
            ModelState::Unavailable(format!("{e:#}"))
        }
        Err(e) => {
            return Err(e.context(
                "Set CHATGUARD_ALLOW_DEGRADED=true to start without a working model",
            ))
        }
    };

    let (denylist, denylist_failure) = match Denylist::load(&config.denylist_path) {
        Ok(list) => (list, None),
        Err(e) if config.allow_degraded => {
            warn!(error = %format!("{e:#}"), "Denylist unavailable, continuing with an empty list");
            (Denylist::default(), Some(format!("{e:#}")))
        }
        Err(e) => return Err(e),
    };

    let classifier = Classifier::new(config.policy, denylist, model, config.default_threshold);
    Ok(match denylist_failure {
        Some(reason) => classifier.with_denylist_failure(reason),
        None => classifier,
    })
}
