//! Hybrid orchestration over the pattern classifier and the learned models.
//!
//! The detector is constructed unconfigured: pure pattern analysis works
//! immediately, while the learned-fusion path requires an explicit
//! `initialize_models` call. The phase is a tagged state checked once at
//! each entry point, so no method ever probes half-initialized fields.
//!
//! The additive regex score computed here (severity weights 10/20/30,
//! capped at 100) feeds only the learned-fusion path and is intentionally
//! not the same rule as the classifier's subtractive confidence.

use crate::classifier::{ContentClassifier, FullAnalysis, PatternMatch, Snapshot};
use crate::config::DetectorConfig;
use crate::error::{ConfigError, ModelError};
use crate::features::{FeatureExtractor, InteractionRecord};
use crate::model::{ContentScorer, EnsembleCombiner, SequenceScorer, Verdict};

/// Outcome of one hybrid analysis pass.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub matches: Vec<PatternMatch>,
    /// Additive pattern score in [0, 100].
    pub regex_score: f64,
    /// Fused model probability scaled to [0, 100]; `None` while learned
    /// scoring is disabled or uninitialized.
    pub ml_score: Option<f64>,
    /// Hybrid score in [0, 100].
    pub final_score: f64,
    /// `min(1, final_score / 100)`.
    pub confidence: f64,
    pub verdict: Verdict,
    pub log: Vec<String>,
}

struct Models {
    extractor: FeatureExtractor,
    content: ContentScorer,
    sequence: SequenceScorer,
    ensemble: EnsembleCombiner,
}

enum Phase {
    Unconfigured,
    Ready(Models),
}

/// Detection pipeline combining deterministic rules with learned scoring.
pub struct HybridDetector {
    config: DetectorConfig,
    classifier: ContentClassifier,
    phase: Phase,
}

impl HybridDetector {
    /// Validates the config and starts unconfigured (pattern analysis only).
    pub fn new(config: DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            classifier: ContentClassifier::new(),
            phase: Phase::Unconfigured,
        })
    }

    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    #[must_use]
    pub fn classifier(&self) -> &ContentClassifier {
        &self.classifier
    }

    /// Mutable access for runtime pattern registration.
    pub fn classifier_mut(&mut self) -> &mut ContentClassifier {
        &mut self.classifier
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.phase, Phase::Ready(_))
    }

    /// Move to the ready phase: build the feature extractor and both
    /// scorers. Idempotent in effect — reinitializing replaces the models.
    pub fn initialize_models(&mut self) {
        let extractor = FeatureExtractor::new(
            self.config.vocab_capacity,
            self.config.content_vector_len,
            self.config.sequence_len,
        );
        let content = ContentScorer::new(self.config.content_vector_len, 0x5eed_c0de);
        let sequence = SequenceScorer::new(self.config.sequence_len, 0x5eed_5e01);
        let ensemble = EnsembleCombiner::new(self.config.regex_weight, self.config.ml_weight);
        tracing::info!(
            vector_len = self.config.content_vector_len,
            sequence_len = self.config.sequence_len,
            "learned models initialized"
        );
        self.phase = Phase::Ready(Models {
            extractor,
            content,
            sequence,
            ensemble,
        });
    }

    /// Dispose both scorers and return to the unconfigured phase.
    pub fn dispose_models(&mut self) {
        if let Phase::Ready(models) = &mut self.phase {
            models.content.dispose();
            models.sequence.dispose();
            self.phase = Phase::Unconfigured;
        }
    }

    /// Pure pattern analysis; available in either phase.
    #[must_use]
    pub fn analyze(&self, content: &str) -> Vec<PatternMatch> {
        self.classifier.analyze(content)
    }

    /// Pure-pattern full pass (analysis + click verification); available in
    /// either phase.
    #[must_use]
    pub fn full_analysis(&self, content: &str, before: &Snapshot, after: &Snapshot) -> FullAnalysis {
        self.classifier.run_full_analysis(content, before, after)
    }

    /// Additive hybrid-path pattern score: per-match severity weight,
    /// capped at 100.
    #[must_use]
    pub fn additive_regex_score(matches: &[PatternMatch]) -> f64 {
        let sum: f64 = matches.iter().map(|m| m.severity.hybrid_weight()).sum();
        sum.min(100.0)
    }

    /// Hybrid analysis: pattern score plus learned fusion when enabled.
    ///
    /// Interaction history is vectorized only when non-empty; an empty
    /// history contributes a zero sequence score. Fails with
    /// [`ModelError::NotInitialized`] when learned scoring is enabled but
    /// `initialize_models` has not been called.
    pub async fn analyze_with_ml(
        &self,
        content: &str,
        interactions: &[InteractionRecord],
    ) -> Result<AnalysisResult, ModelError> {
        let mut log = Vec::new();
        let matches = self.classifier.analyze(content);
        let regex_score = Self::additive_regex_score(&matches);
        log.push(format!(
            "pattern pass: {} match(es), additive score {regex_score:.1}",
            matches.len()
        ));

        if !self.config.enable_learned_scoring {
            let final_score = regex_score;
            let confidence = (final_score / 100.0).min(1.0);
            let ensemble =
                EnsembleCombiner::new(self.config.regex_weight, self.config.ml_weight);
            let verdict = ensemble.verdict(confidence);
            log.push(format!(
                "learned scoring disabled; final score {final_score:.1}, verdict {verdict}"
            ));
            return Ok(AnalysisResult {
                matches,
                regex_score,
                ml_score: None,
                final_score,
                confidence,
                verdict,
                log,
            });
        }

        let Phase::Ready(models) = &self.phase else {
            return Err(ModelError::NotInitialized);
        };

        let content_features = models.extractor.vectorize_content(content);
        let content_score = models.content.predict(&content_features).await?;
        log.push(format!("content model score {content_score:.3}"));

        let sequence_score = if interactions.is_empty() {
            log.push("no interaction history; sequence score 0".to_string());
            0.0
        } else {
            let rows = models.extractor.vectorize_interactions(interactions);
            let score = models.sequence.predict(&rows).await?;
            log.push(format!(
                "sequence model score {score:.3} over {} record(s)",
                interactions.len()
            ));
            score
        };

        let fused = models
            .ensemble
            .predict(content_score, sequence_score, regex_score / 100.0);
        let ml_score = fused * 100.0;
        let final_score = models.ensemble.hybrid_score(regex_score, fused);
        let confidence = (final_score / 100.0).min(1.0);
        let verdict = models.ensemble.verdict(confidence);
        log.push(format!(
            "fusion: ml {ml_score:.1}, final {final_score:.1}, verdict {verdict}"
        ));

        Ok(AnalysisResult {
            matches,
            regex_score,
            ml_score: Some(ml_score),
            final_score,
            confidence,
            verdict,
            log,
        })
    }
}
