use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `Trapsight`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide whether automation should proceed; internal code continues
/// to use `anyhow::Result` for ad-hoc context chains at the driver boundary.
#[derive(Debug, Error)]
pub enum TrapsightError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Interaction ledger ──────────────────────────────────────────────
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    // ── Deception patterns ──────────────────────────────────────────────
    #[error("pattern: {0}")]
    Pattern(#[from] PatternError),

    // ── Learned models ──────────────────────────────────────────────────
    #[error("model: {0}")]
    Model(#[from] ModelError),

    // ── Browser driver boundary ─────────────────────────────────────────
    #[error("driver: {0}")]
    Driver(String),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("state set is empty")]
    EmptyStateSet,

    #[error("initial state {0:?} is not in the state set")]
    UnknownInitialState(String),

    #[error("transition table references unknown state {0:?}")]
    UnknownTransitionState(String),
}

// ─── Interaction ledger errors ──────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("state {name:?} is not in the configured state set")]
    InvalidStateName { name: String },

    #[error("no transition from {from:?} to {to:?}")]
    IllegalTransition { from: String, to: String },
}

// ─── Deception pattern errors ───────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("pattern {name:?} failed to compile: {source}")]
    Compile {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("pattern {name:?} uses unsupported flag {flag:?}")]
    UnsupportedFlag { name: String, flag: char },
}

// ─── Learned model errors ───────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("learned models not initialized; call initialize_models first")]
    NotInitialized,

    #[error("feature vector has length {got}, model expects {expected}")]
    Dimension { expected: usize, got: usize },

    #[error("training set is empty or label count mismatches sample count")]
    InvalidTrainingSet,
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, TrapsightError>;
