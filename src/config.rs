//! Detector configuration — state graph, feature bounds, fusion weights.
//!
//! Everything here is validated once at construction; a malformed config
//! never reaches the pipeline.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default share of the hybrid score contributed by the pattern classifier.
pub const DEFAULT_REGEX_WEIGHT: f64 = 0.40;
/// Default share of the hybrid score contributed by the learned models.
pub const DEFAULT_ML_WEIGHT: f64 = 0.60;

/// State-machine shape for one interaction lifecycle.
///
/// A state absent from `transitions` has no outgoing edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    pub initial: String,
    pub states: BTreeSet<String>,
    pub transitions: BTreeMap<String, BTreeSet<String>>,
}

impl StateConfig {
    /// The lifecycle used for click attempts: IDLE → PENDING →
    /// {VERIFIED, FAILED} → IDLE.
    #[must_use]
    pub fn interaction_default() -> Self {
        let states: BTreeSet<String> = ["IDLE", "PENDING", "VERIFIED", "FAILED"]
            .into_iter()
            .map(String::from)
            .collect();
        let mut transitions: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        transitions.insert("IDLE".into(), BTreeSet::from(["PENDING".to_string()]));
        transitions.insert(
            "PENDING".into(),
            BTreeSet::from(["VERIFIED".to_string(), "FAILED".to_string()]),
        );
        transitions.insert("VERIFIED".into(), BTreeSet::from(["IDLE".to_string()]));
        transitions.insert("FAILED".into(), BTreeSet::from(["IDLE".to_string()]));
        Self {
            initial: "IDLE".into(),
            states,
            transitions,
        }
    }

    /// Fail fast on a malformed graph: empty state set, initial outside the
    /// set, or transition endpoints naming unknown states.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.states.is_empty() {
            return Err(ConfigError::EmptyStateSet);
        }
        if !self.states.contains(&self.initial) {
            return Err(ConfigError::UnknownInitialState(self.initial.clone()));
        }
        for (from, targets) in &self.transitions {
            if !self.states.contains(from) {
                return Err(ConfigError::UnknownTransitionState(from.clone()));
            }
            for to in targets {
                if !self.states.contains(to) {
                    return Err(ConfigError::UnknownTransitionState(to.clone()));
                }
            }
        }
        Ok(())
    }
}

/// Top-level tunables for the detection pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub state_config: StateConfig,
    /// Maximum vocabulary entries the feature extractor may hold.
    pub vocab_capacity: usize,
    /// Fixed length of the content feature vector.
    pub content_vector_len: usize,
    /// Fixed number of interaction rows fed to the sequence model.
    pub sequence_len: usize,
    /// Whether the learned-fusion path participates in scoring.
    pub enable_learned_scoring: bool,
    /// Pattern-classifier share of the hybrid score.
    pub regex_weight: f64,
    /// Learned-model share of the hybrid score.
    pub ml_weight: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            state_config: StateConfig::interaction_default(),
            vocab_capacity: 1000,
            content_vector_len: 100,
            sequence_len: 10,
            enable_learned_scoring: true,
            regex_weight: DEFAULT_REGEX_WEIGHT,
            ml_weight: DEFAULT_ML_WEIGHT,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.state_config.validate()?;
        if self.content_vector_len == 0 || self.sequence_len == 0 {
            return Err(ConfigError::Validation(
                "feature dimensions must be non-zero".into(),
            ));
        }
        if self.vocab_capacity == 0 {
            return Err(ConfigError::Validation(
                "vocabulary capacity must be non-zero".into(),
            ));
        }
        let sum = self.regex_weight + self.ml_weight;
        if !(self.regex_weight >= 0.0 && self.ml_weight >= 0.0 && (sum - 1.0).abs() < 1e-9) {
            return Err(ConfigError::Validation(format!(
                "hybrid weights must be non-negative and sum to 1.0 (got {sum})"
            )));
        }
        Ok(())
    }
}
