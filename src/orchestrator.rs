//! End-to-end click orchestration.
//!
//! The orchestrator is the serialization point of the whole pipeline: one
//! attempt at a time, guard check first, then dispatch, verification,
//! analysis, lifecycle transition, and audit. Driver and analysis failures
//! are folded into the audit trail and the returned verdict instead of
//! aborting an in-flight attempt.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::classifier::Snapshot;
use crate::config::DetectorConfig;
use crate::error::ConfigError;
use crate::features::InteractionRecord;
use crate::guard::SpatialGuard;
use crate::hybrid::HybridDetector;
use crate::ledger::{AuditEntry, AuditLedger, InteractionLedger};
use crate::model::{EnsembleCombiner, Verdict};

/// External browser-automation boundary. The driver owns navigation and
/// click mechanics; the orchestrator only consumes snapshots and content.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Key-value snapshot of the current page; by convention carries a
    /// `url` entry.
    async fn snapshot(&self) -> anyhow::Result<Snapshot>;

    /// Raw markup of the current page.
    async fn page_content(&self) -> anyhow::Result<String>;

    /// Perform the click. Timing out is the driver's responsibility.
    async fn dispatch_click(&self, x: f64, y: f64) -> anyhow::Result<()>;
}

/// Result of one click attempt.
#[derive(Debug, Clone)]
pub struct ClickOutcome {
    pub verdict: Verdict,
    /// Normalized to [0, 1]. Hybrid path: `min(1, final_score / 100)`;
    /// pure path: the subtractive pattern confidence scaled down.
    pub confidence: f64,
    pub success: bool,
    /// True when the spatial guard vetoed the click before dispatch.
    pub vetoed: bool,
    /// Lifecycle state after the attempt.
    pub final_state: String,
    /// Audit entries accumulated during this call only.
    pub audit: Vec<AuditEntry>,
}

/// Drives one click attempt end-to-end against an external driver.
pub struct InteractionOrchestrator<D> {
    driver: D,
    guard: SpatialGuard,
    detector: HybridDetector,
    ledger: InteractionLedger,
    audit: AuditLedger,
    combiner: EnsembleCombiner,
}

impl<D: BrowserDriver> InteractionOrchestrator<D> {
    pub fn new(driver: D, config: DetectorConfig) -> Result<Self, ConfigError> {
        for required in ["PENDING", "VERIFIED", "FAILED"] {
            if !config.state_config.states.contains(required) {
                return Err(ConfigError::Validation(format!(
                    "orchestrator lifecycle requires state {required:?}"
                )));
            }
        }
        let detector = HybridDetector::new(config.clone())?;
        let ledger = InteractionLedger::new(config.state_config.clone())?;
        let combiner = EnsembleCombiner::new(config.regex_weight, config.ml_weight);
        Ok(Self {
            driver,
            guard: SpatialGuard::new(),
            detector,
            ledger,
            audit: AuditLedger::new(),
            combiner,
        })
    }

    pub fn guard_mut(&mut self) -> &mut SpatialGuard {
        &mut self.guard
    }

    #[must_use]
    pub fn guard(&self) -> &SpatialGuard {
        &self.guard
    }

    pub fn detector_mut(&mut self) -> &mut HybridDetector {
        &mut self.detector
    }

    #[must_use]
    pub fn detector(&self) -> &HybridDetector {
        &self.detector
    }

    #[must_use]
    pub fn audit_ledger(&self) -> &AuditLedger {
        &self.audit
    }

    #[must_use]
    pub fn interaction_history(&self) -> Vec<crate::ledger::State> {
        self.ledger.history()
    }

    /// Attempt one click at `(x, y)` on `target`.
    ///
    /// Each attempt runs one full lifecycle; a ledger left in a terminal
    /// state by a previous attempt is reset first.
    pub async fn attempt_click(
        &mut self,
        target: &str,
        x: f64,
        y: f64,
        interactions: &[InteractionRecord],
    ) -> ClickOutcome {
        let audit_start = self.audit.len();
        tracing::info!(target, x, y, "click attempt started");

        if self.ledger.state().name != self.ledger.history()[0].name {
            self.ledger.reset();
        }
        if let Err(err) = self.ledger.transition("PENDING", meta(&[("target", target)])) {
            tracing::warn!(%err, "could not enter PENDING");
        }

        let before = match self.driver.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.audit.log(
                    "before_snapshot_failed",
                    &self.ledger.state().name,
                    0.0,
                    meta(&[("error", &err.to_string())]),
                );
                Snapshot::new()
            }
        };

        // Spatial pre-filter: a danger-zone click never reaches the driver.
        if self.guard.blocks_click(x, y) {
            let zones = self.guard.zones_at(x, y);
            let zone_ids: Vec<String> = zones.iter().map(|z| z.id.clone()).collect();
            if let Err(err) = self.ledger.transition("FAILED", meta(&[("reason", "guard_veto")])) {
                tracing::warn!(%err, "could not enter FAILED after veto");
            }
            let state = self.ledger.state().name;
            let mut metadata = meta(&[("target", target)]);
            metadata.insert("zones".into(), serde_json::json!(zone_ids));
            self.audit.log("guard_veto", &state, 1.0, metadata);
            tracing::warn!(target, x, y, "click vetoed by spatial guard");
            return ClickOutcome {
                verdict: Verdict::HighThreat,
                confidence: 1.0,
                success: false,
                vetoed: true,
                final_state: state,
                audit: self.audit.entries()[audit_start..].to_vec(),
            };
        }

        let dispatched = match self.driver.dispatch_click(x, y).await {
            Ok(()) => {
                self.audit.log(
                    "click_dispatched",
                    &self.ledger.state().name,
                    0.0,
                    meta(&[("target", target)]),
                );
                true
            }
            Err(err) => {
                self.audit.log(
                    "click_dispatch_failed",
                    &self.ledger.state().name,
                    0.0,
                    meta(&[("target", target), ("error", &err.to_string())]),
                );
                false
            }
        };

        // An undispatched or unsnapshottable click verifies against an
        // unchanged page and therefore fails verification.
        let after = if dispatched {
            match self.driver.snapshot().await {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    self.audit.log(
                        "after_snapshot_failed",
                        &self.ledger.state().name,
                        0.0,
                        meta(&[("error", &err.to_string())]),
                    );
                    before.clone()
                }
            }
        } else {
            before.clone()
        };

        let content = match self.driver.page_content().await {
            Ok(content) => content,
            Err(err) => {
                self.audit.log(
                    "page_content_failed",
                    &self.ledger.state().name,
                    0.0,
                    meta(&[("error", &err.to_string())]),
                );
                String::new()
            }
        };

        let full = self.detector.full_analysis(&content, &before, &after);
        let mut log = full.log.clone();

        let (verdict, confidence, success) = if self.detector.config().enable_learned_scoring {
            match self.detector.analyze_with_ml(&content, interactions).await {
                Ok(analysis) => {
                    log.extend(analysis.log.iter().cloned());
                    let success =
                        full.verification.verified && analysis.verdict <= Verdict::LowRisk;
                    (analysis.verdict, analysis.confidence, success)
                }
                Err(err) => {
                    self.audit.log(
                        "learned_analysis_failed",
                        &self.ledger.state().name,
                        0.0,
                        meta(&[("error", &err.to_string())]),
                    );
                    let additive = HybridDetector::additive_regex_score(&full.matches);
                    let confidence = (additive / 100.0).min(1.0);
                    (self.combiner.verdict(confidence), confidence, full.verified)
                }
            }
        } else {
            // pure-pattern path: subtractive confidence, additive verdict
            let additive = HybridDetector::additive_regex_score(&full.matches);
            let risk = (additive / 100.0).min(1.0);
            (
                self.combiner.verdict(risk),
                full.confidence / 100.0,
                full.verified,
            )
        };

        let next = if success { "VERIFIED" } else { "FAILED" };
        if let Err(err) = self.ledger.transition(next, meta(&[("verdict", &verdict.to_string())])) {
            tracing::warn!(%err, next, "lifecycle transition failed");
        }
        let state = self.ledger.state().name;

        let mut metadata = meta(&[("target", target), ("verdict", &verdict.to_string())]);
        metadata.insert("log".into(), serde_json::json!(log));
        metadata.insert("dispatched".into(), serde_json::json!(dispatched));
        self.audit
            .log("interaction_complete", &state, confidence, metadata);
        tracing::info!(target, %verdict, confidence, success, "click attempt finished");

        ClickOutcome {
            verdict,
            confidence,
            success,
            vetoed: false,
            final_state: state,
            audit: self.audit.entries()[audit_start..].to_vec(),
        }
    }
}

fn meta(pairs: &[(&str, &str)]) -> BTreeMap<String, serde_json::Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), serde_json::json!(v)))
        .collect()
}
