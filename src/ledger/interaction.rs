//! Lifecycle state machine for one interaction attempt.
//!
//! The ledger owns a current [`State`] and an ordered, append-only history.
//! `transition` is the validated path; `set_state` is a deliberate escape
//! hatch that bypasses the transition table and must stay a separate entry
//! point, never the default.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::StateConfig;
use crate::error::{ConfigError, LedgerError};

/// One recorded lifecycle state. `name` is always a member of the configured
/// state set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub id: String,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub data: BTreeMap<String, serde_json::Value>,
}

impl State {
    fn new(name: &str, data: BTreeMap<String, serde_json::Value>) -> Self {
        Self {
            id: generate_id(),
            name: name.to_string(),
            timestamp: Utc::now(),
            data,
        }
    }
}

/// UUID v4 when an entropy source is available; otherwise a
/// timestamp+random composite so ids are always producible.
pub(crate) fn generate_id() -> String {
    std::panic::catch_unwind(|| Uuid::new_v4().to_string()).unwrap_or_else(|_| fallback_id())
}

pub(crate) fn fallback_id() -> String {
    use rand::Rng;
    let salt: u32 = rand::rng().random();
    format!("{:x}-{salt:08x}", Utc::now().timestamp_micros())
}

/// State machine with an append-only history of every state it has held.
#[derive(Debug, Clone)]
pub struct InteractionLedger {
    config: StateConfig,
    current: State,
    history: Vec<State>,
}

impl InteractionLedger {
    /// Build a ledger from a validated graph. The initial state is created
    /// here and recorded as `history[0]`.
    pub fn new(config: StateConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let initial = State::new(&config.initial, BTreeMap::new());
        Ok(Self {
            config,
            current: initial.clone(),
            history: vec![initial],
        })
    }

    /// Unconditional override. Skips the transition table on purpose; fails
    /// only when `name` is outside the configured state set, leaving the
    /// current state untouched.
    pub fn set_state(
        &mut self,
        name: &str,
        data: BTreeMap<String, serde_json::Value>,
    ) -> Result<(), LedgerError> {
        if !self.config.states.contains(name) {
            return Err(LedgerError::InvalidStateName {
                name: name.to_string(),
            });
        }
        let next = State::new(name, data);
        tracing::info!(from = %self.current.name, to = %next.name, id = %next.id, "state set");
        self.current = next.clone();
        self.history.push(next);
        Ok(())
    }

    /// Validated move: succeeds iff `to` is in the allowed set for the
    /// current state, then delegates to [`Self::set_state`].
    pub fn transition(
        &mut self,
        to: &str,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> Result<(), LedgerError> {
        let allowed = self
            .config
            .transitions
            .get(&self.current.name)
            .is_some_and(|targets| targets.contains(to));
        if !allowed {
            return Err(LedgerError::IllegalTransition {
                from: self.current.name.clone(),
                to: to.to_string(),
            });
        }
        self.set_state(to, metadata)
    }

    /// Defensive copy of the current state.
    #[must_use]
    pub fn state(&self) -> State {
        self.current.clone()
    }

    /// Defensive copy of the full history, insertion order preserved.
    #[must_use]
    pub fn history(&self) -> Vec<State> {
        self.history.clone()
    }

    /// Return to a fresh copy of the original initial state (new id and
    /// timestamp, original name and data) and truncate history to it.
    pub fn reset(&mut self) {
        let mut first = self.history[0].clone();
        first.id = generate_id();
        first.timestamp = Utc::now();
        tracing::info!(to = %first.name, id = %first.id, "ledger reset");
        self.current = first.clone();
        self.history = vec![first];
    }
}
