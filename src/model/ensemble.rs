//! Fusion of pattern score and learned-model probabilities into one
//! calibrated probability, plus the verdict step function.

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_ML_WEIGHT, DEFAULT_REGEX_WEIGHT};

/// Discrete risk tier derived from a normalized score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Safe,
    LowRisk,
    Medium,
    HighThreat,
}

/// Logistic weights over (content, sequence, pattern) inputs, calibrated so
/// that all-zero inputs land well inside SAFE and all-one inputs well inside
/// HIGH_THREAT.
const FUSION_WEIGHTS: [f64; 3] = [2.2, 1.6, 2.6];
const FUSION_BIAS: f64 = -3.0;

/// Secondary meta-model fusing the three signal sources.
#[derive(Debug, Clone)]
pub struct EnsembleCombiner {
    regex_weight: f64,
    ml_weight: f64,
}

impl Default for EnsembleCombiner {
    fn default() -> Self {
        Self::new(DEFAULT_REGEX_WEIGHT, DEFAULT_ML_WEIGHT)
    }
}

impl EnsembleCombiner {
    /// `regex_weight`/`ml_weight` are the hybrid-score shares (defaults
    /// 0.40/0.60).
    #[must_use]
    pub fn new(regex_weight: f64, ml_weight: f64) -> Self {
        Self {
            regex_weight,
            ml_weight,
        }
    }

    /// Calibrated fused probability from the content-model score, the
    /// sequence-model score, and the pattern score normalized to [0, 1].
    #[must_use]
    pub fn predict(&self, content_score: f64, sequence_score: f64, regex_norm: f64) -> f64 {
        let z = FUSION_WEIGHTS[0] * content_score
            + FUSION_WEIGHTS[1] * sequence_score
            + FUSION_WEIGHTS[2] * regex_norm
            + FUSION_BIAS;
        1.0 / (1.0 + (-z).exp())
    }

    /// Fixed-weight hybrid score on the 0–100 scale:
    /// `regex * regex_weight + ml * 100 * ml_weight`.
    #[must_use]
    pub fn hybrid_score(&self, regex_score: f64, ml_probability: f64) -> f64 {
        regex_score * self.regex_weight + ml_probability * 100.0 * self.ml_weight
    }

    /// Verdict bucket for a score normalized to [0, 1]: below 0.2 SAFE,
    /// below 0.4 LOW_RISK, below 0.7 MEDIUM, otherwise HIGH_THREAT.
    #[must_use]
    pub fn verdict(&self, score: f64) -> Verdict {
        if score < 0.2 {
            Verdict::Safe
        } else if score < 0.4 {
            Verdict::LowRisk
        } else if score < 0.7 {
            Verdict::Medium
        } else {
            Verdict::HighThreat
        }
    }
}
