// Static denylist of offensive words.
//
// Loaded once from a newline-delimited UTF-8 file and never modified. Used
// either as an authoritative override (denylist-first policy) or to explain
// which words likely triggered the model (model-first policy).

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// Characters stripped from both ends of a token before lookup.
const STRIP_CHARS: &[char] = &['.', ',', '!', '?', ';', ':', '"', '\''];

#[derive(Debug, Clone, Default)]
pub struct Denylist {
    words: HashSet<String>,
}

impl Denylist {
    /// Load from a file with one word per line. Blank lines are skipped.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read denylist from {}", path.display()))?;
        let denylist = Self::from_lines(&contents);
        info!(words = denylist.len(), "Loaded denylist from {}", path.display());
        Ok(denylist)
    }

    pub fn from_lines(contents: &str) -> Self {
        Self::from_words(contents.lines())
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// Every denylisted token in `text`, in order of appearance.
    /// Repeated occurrences are reported each time.
    pub fn find_matches(&self, text: &str) -> Vec<String> {
        if self.words.is_empty() {
            return Vec::new();
        }
        text.split_whitespace()
            .map(clean_token)
            .filter(|w| !w.is_empty() && self.words.contains(w))
            .collect()
    }
}

/// Lowercase a whitespace-delimited token and strip surrounding punctuation.
pub fn clean_token(token: &str) -> String {
    token.to_lowercase().trim_matches(STRIP_CHARS).to_string()
}
