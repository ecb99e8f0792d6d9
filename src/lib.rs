#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::return_self_not_must_use
)]

//! Trapsight decides, for an automated agent clicking through adversarial
//! web content, whether an interaction encountered deception and whether
//! the click produced a genuine effect, and emits a calibrated risk verdict
//! gating further automation.

pub mod classifier;
pub mod config;
pub mod error;
pub mod features;
pub mod guard;
pub mod hybrid;
pub mod ledger;
pub mod model;
pub mod observability;
pub mod orchestrator;

pub use classifier::{
    ClickVerification, ContentClassifier, DeceptionPattern, FullAnalysis, MatchRule,
    PatternMatch, Severity, Snapshot,
};
pub use config::{DetectorConfig, StateConfig};
pub use error::{
    ConfigError, LedgerError, ModelError, PatternError, Result, TrapsightError,
};
pub use features::{ActionKind, FeatureExtractor, InteractionRecord};
pub use guard::{SpatialGuard, SpatialReport, SpatialZone, ZoneKind};
pub use hybrid::{AnalysisResult, HybridDetector};
pub use ledger::{AuditEntry, AuditLedger, InteractionLedger, State};
pub use model::{ContentScorer, EnsembleCombiner, Evaluation, SequenceScorer, Verdict};
pub use orchestrator::{BrowserDriver, ClickOutcome, InteractionOrchestrator};
