//! Append-only ledgers: the interaction lifecycle state machine and the
//! structured audit trail.

pub mod audit;
pub mod interaction;

pub use audit::{AuditEntry, AuditLedger};
pub use interaction::{InteractionLedger, State};
