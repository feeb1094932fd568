// Offensiveness classification: artifacts, policy, and the Classifier that
// ties them together.
//
// The Classifier is built once at startup and shared (via Arc) with every
// request handler. It owns the denylist and the model state; the model sits
// behind the OffensivenessScorer trait so tests can substitute fixed scores.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

pub mod onnx;
pub mod policy;
pub mod sequence;
pub mod tokenizer;
pub mod traits;

use crate::denylist::Denylist;
use policy::{Analysis, Label, Policy};
use traits::OffensivenessScorer;

/// Outcome of loading the model + tokenizer at startup.
pub enum ModelState {
    Ready(Arc<dyn OffensivenessScorer>),
    /// Load failed and the service was started in degraded mode.
    Unavailable(String),
}

impl ModelState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Per-request classification failure.
#[derive(Debug)]
pub enum ClassifyError {
    /// Threshold is NaN or infinite; every comparison against it would be false
    InvalidThreshold(f64),
    /// Model-first policy needs the model and it isn't loaded
    ModelUnavailable,
    /// Tokenization or inference failed for this text
    Inference(anyhow::Error),
}

impl fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidThreshold(t) => write!(f, "Invalid threshold: {t}"),
            Self::ModelUnavailable => f.write_str("Model unavailable"),
            Self::Inference(e) => write!(f, "Inference failed: {e:#}"),
        }
    }
}

impl std::error::Error for ClassifyError {}

pub struct Classifier {
    policy: Policy,
    denylist: Denylist,
    /// Why the denylist failed to load, when running degraded without it
    denylist_failure: Option<String>,
    model: ModelState,
    default_threshold: f64,
}

impl Classifier {
    pub fn new(policy: Policy, denylist: Denylist, model: ModelState, default_threshold: f64) -> Self {
        Self {
            policy,
            denylist,
            denylist_failure: None,
            model,
            default_threshold,
        }
    }

    /// Record that the denylist failed to load and an empty one stands in.
    pub fn with_denylist_failure(mut self, reason: String) -> Self {
        self.denylist_failure = Some(reason);
        self
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn denylist(&self) -> &Denylist {
        &self.denylist
    }

    pub fn denylist_ready(&self) -> bool {
        self.denylist_failure.is_none()
    }

    pub fn model_ready(&self) -> bool {
        self.model.is_ready()
    }

    pub fn default_threshold(&self) -> f64 {
        self.default_threshold
    }

    /// Classify `text`, using the configured default when `threshold` is None.
    pub async fn analyze(
        &self,
        text: &str,
        threshold: Option<f64>,
    ) -> Result<Analysis, ClassifyError> {
        let threshold = threshold.unwrap_or(self.default_threshold);
        if !threshold.is_finite() {
            return Err(ClassifyError::InvalidThreshold(threshold));
        }
        match self.policy {
            Policy::ModelFirst => self.analyze_model_first(text, threshold).await,
            Policy::DenylistFirst => self.analyze_denylist_first(text, threshold).await,
        }
    }

    async fn analyze_model_first(&self, text: &str, threshold: f64) -> Result<Analysis, ClassifyError> {
        let scorer = match &self.model {
            ModelState::Ready(scorer) => scorer,
            ModelState::Unavailable(_) => return Err(ClassifyError::ModelUnavailable),
        };

        let probability = scorer
            .score_text(text)
            .await
            .map_err(ClassifyError::Inference)?;
        let label = Label::from_score(probability, threshold);

        // Denylist hits only explain an offensive verdict; they never make one
        let offensive_words = if label.is_offensive() {
            self.denylist.find_matches(text)
        } else {
            Vec::new()
        };

        Ok(Analysis::new(text, label, probability, offensive_words))
    }

    async fn analyze_denylist_first(
        &self,
        text: &str,
        threshold: f64,
    ) -> Result<Analysis, ClassifyError> {
        let matches = self.denylist.find_matches(text);
        if !matches.is_empty() {
            return Ok(Analysis::new(text, Label::Offensive, 1.0, matches));
        }

        match &self.model {
            ModelState::Ready(scorer) => {
                let probability = scorer
                    .score_text(text)
                    .await
                    .map_err(ClassifyError::Inference)?;
                let label = Label::from_score(probability, threshold);
                Ok(Analysis::new(text, label, probability, Vec::new()))
            }
            ModelState::Unavailable(reason) => {
                warn!(
                    reason = %reason,
                    "Model unavailable, classifying by denylist only"
                );
                Ok(Analysis::new(text, Label::NotOffensive, 0.0, Vec::new()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedScorer {
        probability: f64,
        calls: AtomicUsize,
    }

    impl FixedScorer {
        fn new(probability: f64) -> Arc<Self> {
            Arc::new(Self {
                probability,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl OffensivenessScorer for FixedScorer {
        async fn score_text(&self, _text: &str) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.probability)
        }
    }

    struct FailingScorer;

    #[async_trait]
    impl OffensivenessScorer for FailingScorer {
        async fn score_text(&self, _text: &str) -> Result<f64> {
            anyhow::bail!("unexpected output shape")
        }
    }

    fn classifier(policy: Policy, scorer: Arc<dyn OffensivenessScorer>) -> Classifier {
        Classifier::new(
            policy,
            Denylist::from_words(["dumb"]),
            ModelState::Ready(scorer),
            0.5,
        )
    }

    #[tokio::test]
    async fn test_denylist_first_short_circuits() {
        let scorer = FixedScorer::new(0.1);
        let c = classifier(Policy::DenylistFirst, scorer.clone());
        let a = c.analyze("You are so dumb", None).await.unwrap();
        assert_eq!(a.label, Label::Offensive);
        assert_eq!(a.probability, 1.0);
        assert!(a.is_offensive);
        assert_eq!(a.offensive_words, vec!["dumb"]);
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 0, "model must not run");
    }

    #[tokio::test]
    async fn test_denylist_first_falls_through_to_model() {
        let c = classifier(Policy::DenylistFirst, FixedScorer::new(0.8));
        let a = c.analyze("You are so rude", None).await.unwrap();
        assert_eq!(a.label, Label::Offensive);
        assert!((a.probability - 0.8).abs() < 1e-10);
        assert!(a.offensive_words.is_empty());
    }

    #[tokio::test]
    async fn test_denylist_first_degraded_is_not_offensive() {
        let c = Classifier::new(
            Policy::DenylistFirst,
            Denylist::from_words(["dumb"]),
            ModelState::Unavailable("missing model".into()),
            0.5,
        );
        let a = c.analyze("Hello friend", None).await.unwrap();
        assert_eq!(a.label, Label::NotOffensive);
        assert_eq!(a.probability, 0.0);
        // The denylist still works without the model
        let b = c.analyze("so dumb", None).await.unwrap();
        assert!(b.is_offensive);
    }

    #[tokio::test]
    async fn test_model_first_ignores_denylist_when_model_says_clean() {
        let scorer = FixedScorer::new(0.3);
        let c = classifier(Policy::ModelFirst, scorer.clone());
        let a = c.analyze("You are so dumb", None).await.unwrap();
        assert_eq!(a.label, Label::NotOffensive);
        assert!((a.probability - 0.3).abs() < 1e-10);
        assert!(a.offensive_words.is_empty());
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_model_first_annotates_offensive_result() {
        let c = classifier(Policy::ModelFirst, FixedScorer::new(0.9));
        let a = c.analyze("You are so dumb!", None).await.unwrap();
        assert!(a.is_offensive);
        assert_eq!(a.offensive_words, vec!["dumb"]);
    }

    #[tokio::test]
    async fn test_model_first_unavailable_is_error() {
        let c = Classifier::new(
            Policy::ModelFirst,
            Denylist::default(),
            ModelState::Unavailable("missing model".into()),
            0.5,
        );
        let err = c.analyze("anything", None).await.unwrap_err();
        assert!(matches!(err, ClassifyError::ModelUnavailable));
    }

    #[tokio::test]
    async fn test_inference_failure_is_reported() {
        let c = classifier(Policy::ModelFirst, Arc::new(FailingScorer));
        let err = c.analyze("anything", None).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Inference(_)));
        assert!(err.to_string().contains("unexpected output shape"));
    }

    #[tokio::test]
    async fn test_non_finite_threshold_is_rejected() {
        // NaN would make every `p > threshold` false and report clean text
        for policy in [Policy::ModelFirst, Policy::DenylistFirst] {
            let scorer = FixedScorer::new(0.99);
            let c = classifier(policy, scorer.clone());
            for threshold in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
                let err = c.analyze("text", Some(threshold)).await.unwrap_err();
                assert!(matches!(err, ClassifyError::InvalidThreshold(_)));
            }
            assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
        }
    }

    #[test]
    fn test_denylist_failure_is_recorded() {
        let c = Classifier::new(
            Policy::ModelFirst,
            Denylist::default(),
            ModelState::Unavailable("missing model".into()),
            0.5,
        );
        assert!(c.denylist_ready());
        let c = c.with_denylist_failure("Failed to read denylist".into());
        assert!(!c.denylist_ready());
    }

    #[tokio::test]
    async fn test_explicit_threshold_overrides_default() {
        let c = classifier(Policy::ModelFirst, FixedScorer::new(0.6));
        assert!(c.analyze("text", None).await.unwrap().is_offensive);
        assert!(!c.analyze("text", Some(0.7)).await.unwrap().is_offensive);
    }
}
