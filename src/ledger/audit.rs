//! Append-only audit trail for click attempts.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One structured audit event. Entries are owned exclusively by the
/// [`AuditLedger`]; callers only ever see copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Literal action string as logged, preserved verbatim on export.
    pub action: String,
    /// Lifecycle state label at the time of the event.
    pub state: String,
    pub confidence: f64,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// In-memory append-only ordered log.
#[derive(Debug, Default)]
pub struct AuditLedger {
    entries: Vec<AuditEntry>,
}

impl AuditLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fully materialized entry; the timestamp is generated here.
    pub fn log(
        &mut self,
        action: &str,
        state: &str,
        confidence: f64,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> AuditEntry {
        let entry = AuditEntry {
            action: action.to_string(),
            state: state.to_string(),
            confidence,
            metadata,
            timestamp: Utc::now(),
        };
        tracing::debug!(action = %entry.action, state = %entry.state, "audit");
        self.entries.push(entry.clone());
        entry
    }

    /// Defensive copy of every entry, insertion order preserved.
    #[must_use]
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the full list as a JSON array. Action strings round-trip
    /// literally.
    pub fn export(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }

    /// One JSON object per line, for line-oriented sinks.
    pub fn export_jsonl(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&serde_json::to_string(entry)?);
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_appends_in_order() {
        let mut ledger = AuditLedger::new();
        ledger.log("click_dispatched", "PENDING", 0.5, BTreeMap::new());
        ledger.log("click_verified", "VERIFIED", 1.0, BTreeMap::new());
        let entries = ledger.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "click_dispatched");
        assert_eq!(entries[1].action, "click_verified");
    }

    #[test]
    fn entries_are_defensive_copies() {
        let mut ledger = AuditLedger::new();
        ledger.log("guard_veto", "FAILED", 1.0, BTreeMap::new());
        let mut copy = ledger.entries();
        copy.clear();
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn export_round_trips_literal_action_strings() {
        let mut ledger = AuditLedger::new();
        let mut meta = BTreeMap::new();
        meta.insert("target".to_string(), serde_json::json!("#submit"));
        ledger.log("click: \"Submit / Continue\"", "PENDING", 0.25, meta);

        let json = ledger.export().unwrap();
        let parsed: Vec<AuditEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0].action, "click: \"Submit / Continue\"");
        assert_eq!(parsed[0].metadata["target"], serde_json::json!("#submit"));
    }

    #[test]
    fn jsonl_export_emits_one_line_per_entry() {
        let mut ledger = AuditLedger::new();
        ledger.log("a", "IDLE", 0.0, BTreeMap::new());
        ledger.log("b", "IDLE", 0.0, BTreeMap::new());
        let out = ledger.export_jsonl().unwrap();
        assert_eq!(out.lines().count(), 2);
        for line in out.lines() {
            assert!(serde_json::from_str::<AuditEntry>(line).is_ok());
        }
    }
}
