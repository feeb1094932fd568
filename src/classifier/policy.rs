// Classification policy: turns a text, the denylist and a model score into
// a labelled result.
//
// Two policies exist:
//   - model-first: the model decides; the denylist only annotates offensive
//     results with the words that likely triggered them.
//   - denylist-first: any denylisted word short-circuits to offensive with
//     probability 1.0; otherwise the model decides.
//
// In both, `is_offensive` is derived from the label so the two can't disagree.

use std::fmt;

use anyhow::Result;
use serde::Serialize;

/// Which classification policy the service runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    /// Model is authoritative; denylist is explanatory metadata (default)
    ModelFirst,
    /// Denylist is an authoritative override; model only sees clean text
    DenylistFirst,
}

impl Policy {
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().replace('_', "-").as_str() {
            "model-first" | "model" => Ok(Self::ModelFirst),
            "denylist-first" | "denylist" => Ok(Self::DenylistFirst),
            other => anyhow::bail!(
                "Unknown classification policy '{other}' (expected model-first or denylist-first)"
            ),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModelFirst => "model-first",
            Self::DenylistFirst => "denylist-first",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Label {
    #[serde(rename = "offensive")]
    Offensive,
    #[serde(rename = "not offensive")]
    NotOffensive,
}

impl Label {
    /// Threshold rule shared by both policies: strictly greater is offensive.
    pub fn from_score(probability: f64, threshold: f64) -> Self {
        if probability > threshold {
            Self::Offensive
        } else {
            Self::NotOffensive
        }
    }

    pub fn is_offensive(&self) -> bool {
        matches!(self, Self::Offensive)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offensive => "offensive",
            Self::NotOffensive => "not offensive",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one text. Serialized as the `/api/analyze` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub text: String,
    pub label: Label,
    pub probability: f64,
    pub is_offensive: bool,
    pub offensive_words: Vec<String>,
}

impl Analysis {
    pub fn new(text: &str, label: Label, probability: f64, offensive_words: Vec<String>) -> Self {
        Self {
            text: text.to_string(),
            label,
            probability,
            is_offensive: label.is_offensive(),
            offensive_words,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parse() {
        assert_eq!(Policy::parse("model-first").unwrap(), Policy::ModelFirst);
        assert_eq!(Policy::parse("DENYLIST_FIRST").unwrap(), Policy::DenylistFirst);
        assert!(Policy::parse("both").is_err());
    }

    #[test]
    fn test_label_threshold_is_strict() {
        assert_eq!(Label::from_score(0.5, 0.5), Label::NotOffensive);
        assert_eq!(Label::from_score(0.51, 0.5), Label::Offensive);
    }

    #[test]
    fn test_analysis_flag_follows_label() {
        let a = Analysis::new("x", Label::Offensive, 1.0, vec!["x".to_string()]);
        assert!(a.is_offensive);
        let b = Analysis::new("y", Label::NotOffensive, 0.2, Vec::new());
        assert!(!b.is_offensive);
    }

    #[test]
    fn test_analysis_serializes_wire_shape() {
        let a = Analysis::new("You are so dumb", Label::Offensive, 1.0, vec!["dumb".into()]);
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["label"], "offensive");
        assert_eq!(json["is_offensive"], true);
        assert_eq!(json["offensive_words"][0], "dumb");
        assert_eq!(json["text"], "You are so dumb");

        let b = Analysis::new("hi", Label::NotOffensive, 0.0, Vec::new());
        assert_eq!(serde_json::to_value(&b).unwrap()["label"], "not offensive");
    }
}
