// Text → integer id conversion for the model input.
//
// The model ships with the tokenizer it was trained with. Two artifact formats
// are understood:
//   - keras: the JSON written by Keras `Tokenizer.to_json()` (word index + OOV)
//   - huggingface: a `tokenizer.json` loaded with the `tokenizers` crate
//
// Either way the result is an unpadded id sequence; padding to the model's
// fixed length happens in `sequence.rs`.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

/// Keras' default `filters` argument.
const KERAS_DEFAULT_FILTERS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~\t\n";

/// Which on-disk tokenizer format to load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenizerFormat {
    /// Keras `Tokenizer.to_json()` output (default)
    Keras,
    /// HuggingFace `tokenizer.json`
    HuggingFace,
}

impl TokenizerFormat {
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "keras" => Ok(Self::Keras),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            other => anyhow::bail!(
                "Unknown tokenizer format '{other}' (expected 'keras' or 'huggingface')"
            ),
        }
    }
}

/// Converts raw text into the id sequence the model was trained on.
pub trait SequenceTokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<i64>>;
}

/// Load a tokenizer artifact in the given format.
pub fn load_tokenizer(path: &Path, format: TokenizerFormat) -> Result<Box<dyn SequenceTokenizer>> {
    if !path.exists() {
        anyhow::bail!("Tokenizer file not found: {}", path.display());
    }

    let tokenizer: Box<dyn SequenceTokenizer> = match format {
        TokenizerFormat::Keras => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read tokenizer from {}", path.display()))?;
            Box::new(KerasTokenizer::from_json(&json)?)
        }
        TokenizerFormat::HuggingFace => Box::new(HfSequenceTokenizer::from_file(path)?),
    };

    debug!(format = ?format, "Loaded tokenizer from {}", path.display());
    Ok(tokenizer)
}

// --- Keras ---

#[derive(Deserialize)]
struct KerasTokenizerJson {
    config: KerasTokenizerConfig,
}

#[derive(Deserialize)]
struct KerasTokenizerConfig {
    #[serde(default)]
    num_words: Option<usize>,
    #[serde(default)]
    filters: Option<String>,
    #[serde(default)]
    lower: Option<bool>,
    #[serde(default)]
    split: Option<String>,
    #[serde(default)]
    char_level: bool,
    #[serde(default)]
    oov_token: Option<String>,
    word_index: WordIndexField,
}

/// Keras stores `word_index` as a JSON-encoded string inside the config;
/// hand-exported files often store it as a plain object.
#[derive(Deserialize)]
#[serde(untagged)]
enum WordIndexField {
    Encoded(String),
    Map(HashMap<String, i64>),
}

/// Word-index tokenizer reproducing Keras `texts_to_sequences`.
#[derive(Debug, Clone)]
pub struct KerasTokenizer {
    word_index: HashMap<String, i64>,
    num_words: Option<usize>,
    filters: String,
    lower: bool,
    split: String,
    char_level: bool,
    oov_index: Option<i64>,
}

impl KerasTokenizer {
    /// Parse the output of Keras `Tokenizer.to_json()`.
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: KerasTokenizerJson =
            serde_json::from_str(json).context("Failed to parse Keras tokenizer JSON")?;
        let config = parsed.config;

        let word_index = match config.word_index {
            WordIndexField::Map(map) => map,
            WordIndexField::Encoded(encoded) => serde_json::from_str(&encoded)
                .context("Failed to parse Keras tokenizer word_index")?,
        };

        let split = config.split.unwrap_or_else(|| " ".to_string());
        // Keras raises on an empty separator the first time it splits text
        if split.is_empty() && !config.char_level {
            anyhow::bail!("Keras tokenizer has an empty split string");
        }

        let oov_index = config
            .oov_token
            .as_ref()
            .and_then(|token| word_index.get(token).copied());

        Ok(Self {
            // Keras treats num_words=0 like None: no vocabulary cutoff
            num_words: config.num_words.filter(|&n| n > 0),
            filters: config
                .filters
                .unwrap_or_else(|| KERAS_DEFAULT_FILTERS.to_string()),
            lower: config.lower.unwrap_or(true),
            split,
            char_level: config.char_level,
            oov_index,
            word_index,
        })
    }

    /// Number of entries in the word index.
    pub fn vocab_size(&self) -> usize {
        self.word_index.len()
    }

    /// Keras `text_to_word_sequence`: lowercase, turn filter characters into
    /// the split string, split, drop empty pieces.
    fn words(&self, text: &str) -> Vec<String> {
        let text = if self.lower {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        if self.char_level {
            return text.chars().map(|c| c.to_string()).collect();
        }

        let mut replaced = String::with_capacity(text.len());
        for c in text.chars() {
            if self.filters.contains(c) {
                replaced.push_str(&self.split);
            } else {
                replaced.push(c);
            }
        }

        replaced
            .split(self.split.as_str())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl SequenceTokenizer for KerasTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<i64>> {
        let mut ids = Vec::new();
        for word in self.words(text) {
            match self.word_index.get(&word) {
                // Rare words beyond the num_words cutoff collapse into OOV
                Some(&index) if self.num_words.is_some_and(|n| index >= n as i64) => {
                    if let Some(oov) = self.oov_index {
                        ids.push(oov);
                    }
                }
                Some(&index) => ids.push(index),
                None => {
                    if let Some(oov) = self.oov_index {
                        ids.push(oov);
                    }
                }
            }
        }
        Ok(ids)
    }
}

// --- HuggingFace ---

/// Adapter over a HuggingFace `tokenizers::Tokenizer`.
pub struct HfSequenceTokenizer {
    inner: tokenizers::Tokenizer,
}

impl HfSequenceTokenizer {
    pub fn from_file(path: &Path) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        Ok(Self { inner })
    }
}

impl SequenceTokenizer for HfSequenceTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<i64>> {
        let encoding = self
            .inner
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;
        Ok(encoding.get_ids().iter().map(|&id| id as i64).collect())
    }
}
