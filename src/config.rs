use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::classifier::onnx::{ModelInput, ModelOutput};
use crate::classifier::policy::Policy;
use crate::classifier::sequence::SequenceSpec;
use crate::classifier::tokenizer::TokenizerFormat;

pub const DEFAULT_THRESHOLD: f64 = 0.5;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy. Every
/// setting has a default, so an empty environment is valid as long as the
/// artifacts sit in the default model directory.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory containing the model artifacts
    pub model_dir: PathBuf,
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub denylist_path: PathBuf,
    pub tokenizer_format: TokenizerFormat,
    /// Which classification policy to run (default: model-first)
    pub policy: Policy,
    /// Threshold used when a request doesn't send one
    pub default_threshold: f64,
    /// Padded sequence length and filler id the model was trained with
    pub sequence: SequenceSpec,
    pub model_input: ModelInput,
    pub model_output: ModelOutput,
    /// Start even if artifacts fail to load (CHATGUARD_ALLOW_DEGRADED)
    pub allow_degraded: bool,
    pub bind: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_dir = var("CHATGUARD_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(crate::artifacts::default_model_dir);

        let file = |key: &str, name: &str| {
            var(key)
                .map(PathBuf::from)
                .unwrap_or_else(|| model_dir.join(name))
        };

        let tokenizer_format = match var("CHATGUARD_TOKENIZER_FORMAT") {
            Some(v) => TokenizerFormat::parse(&v)?,
            None => TokenizerFormat::Keras,
        };

        let policy = match var("CHATGUARD_POLICY") {
            Some(v) => Policy::parse(&v)?,
            None => Policy::ModelFirst,
        };

        let default_threshold = match var("CHATGUARD_THRESHOLD") {
            Some(v) => parse_threshold(&v)?,
            None => DEFAULT_THRESHOLD,
        };

        let defaults = SequenceSpec::default();
        let max_length = match var("CHATGUARD_MAX_LENGTH") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .with_context(|| format!("CHATGUARD_MAX_LENGTH is not a valid length: '{v}'"))?,
            None => defaults.max_length,
        };
        if max_length == 0 {
            anyhow::bail!("CHATGUARD_MAX_LENGTH must be at least 1");
        }
        let pad_id = match var("CHATGUARD_PAD_ID") {
            Some(v) => v
                .trim()
                .parse::<i64>()
                .with_context(|| format!("CHATGUARD_PAD_ID is not a valid integer: '{v}'"))?,
            None => defaults.pad_id,
        };

        let model_input = match var("CHATGUARD_MODEL_INPUT") {
            Some(v) => ModelInput::parse(&v)?,
            None => ModelInput::Float32,
        };
        let model_output = match var("CHATGUARD_MODEL_OUTPUT") {
            Some(v) => ModelOutput::parse(&v)?,
            None => ModelOutput::Probability,
        };

        let allow_degraded = match var("CHATGUARD_ALLOW_DEGRADED") {
            Some(v) => parse_bool(&v)
                .with_context(|| "CHATGUARD_ALLOW_DEGRADED must be true or false")?,
            None => false,
        };

        let port = match var("CHATGUARD_PORT") {
            Some(v) => v
                .trim()
                .parse::<u16>()
                .with_context(|| format!("CHATGUARD_PORT is not a valid port: '{v}'"))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            model_path: file("CHATGUARD_MODEL_PATH", crate::artifacts::MODEL_FILE),
            tokenizer_path: file("CHATGUARD_TOKENIZER_PATH", crate::artifacts::TOKENIZER_FILE),
            denylist_path: file("CHATGUARD_DENYLIST_PATH", crate::artifacts::DENYLIST_FILE),
            model_dir,
            tokenizer_format,
            policy,
            default_threshold,
            sequence: SequenceSpec { max_length, pad_id },
            model_input,
            model_output,
            allow_degraded,
            bind: var("CHATGUARD_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port,
        })
    }
}

/// Parse a threshold value; it only has to be a finite number.
pub fn parse_threshold(value: &str) -> Result<f64> {
    let threshold: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("Invalid threshold: '{value}'"))?;
    if !threshold.is_finite() {
        anyhow::bail!("Invalid threshold: '{value}'");
    }
    Ok(threshold)
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("not a boolean: '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("CHATGUARD_MODEL_DIR", "/srv/models")]).unwrap();
        assert_eq!(config.model_path, PathBuf::from("/srv/models/model.onnx"));
        assert_eq!(config.tokenizer_path, PathBuf::from("/srv/models/tokenizer.json"));
        assert_eq!(config.denylist_path, PathBuf::from("/srv/models/en.txt"));
        assert_eq!(config.policy, Policy::ModelFirst);
        assert_eq!(config.tokenizer_format, TokenizerFormat::Keras);
        assert_eq!(config.default_threshold, 0.5);
        assert_eq!(config.sequence, SequenceSpec { max_length: 100, pad_id: 0 });
        assert_eq!(config.model_input, ModelInput::Float32);
        assert_eq!(config.model_output, ModelOutput::Probability);
        assert!(!config.allow_degraded);
        assert_eq!(config.port, 5000);
        assert_eq!(config.bind, "0.0.0.0");
    }

    #[test]
    fn test_per_file_overrides() {
        let config = config_from(&[
            ("CHATGUARD_MODEL_DIR", "/srv/models"),
            ("CHATGUARD_DENYLIST_PATH", "/etc/chatguard/words.txt"),
        ])
        .unwrap();
        assert_eq!(config.denylist_path, PathBuf::from("/etc/chatguard/words.txt"));
        assert_eq!(config.model_path, PathBuf::from("/srv/models/model.onnx"));
    }

    #[test]
    fn test_overrides_parsed() {
        let config = config_from(&[
            ("CHATGUARD_POLICY", "denylist-first"),
            ("CHATGUARD_THRESHOLD", "0.7"),
            ("CHATGUARD_MAX_LENGTH", "64"),
            ("CHATGUARD_PAD_ID", "1"),
            ("CHATGUARD_MODEL_INPUT", "int64"),
            ("CHATGUARD_MODEL_OUTPUT", "logit"),
            ("CHATGUARD_ALLOW_DEGRADED", "true"),
            ("CHATGUARD_PORT", "8080"),
        ])
        .unwrap();
        assert_eq!(config.policy, Policy::DenylistFirst);
        assert!((config.default_threshold - 0.7).abs() < 1e-10);
        assert_eq!(config.sequence, SequenceSpec { max_length: 64, pad_id: 1 });
        assert_eq!(config.model_input, ModelInput::Int64);
        assert_eq!(config.model_output, ModelOutput::Logit);
        assert!(config.allow_degraded);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_parse_threshold_rejects_non_finite() {
        for bad in ["NaN", "inf", "-inf", "infinity", ""] {
            assert!(parse_threshold(bad).is_err(), "{bad:?} should be rejected");
        }
        assert_eq!(parse_threshold(" 0.25 ").unwrap(), 0.25);
        assert_eq!(parse_threshold("1.5").unwrap(), 1.5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(config_from(&[("CHATGUARD_THRESHOLD", "high")]).is_err());
        assert!(config_from(&[("CHATGUARD_THRESHOLD", "NaN")]).is_err());
        assert!(config_from(&[("CHATGUARD_MAX_LENGTH", "0")]).is_err());
        assert!(config_from(&[("CHATGUARD_POLICY", "vibes")]).is_err());
        assert!(config_from(&[("CHATGUARD_ALLOW_DEGRADED", "maybe")]).is_err());
        assert!(config_from(&[("CHATGUARD_PORT", "99999")]).is_err());
    }
}
