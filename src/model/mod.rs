//! Learned scoring subsystem: content and sequence scorers plus the
//! ensemble meta-model that fuses them with the pattern score.

pub mod ensemble;
pub mod scorer;

pub use ensemble::{EnsembleCombiner, Verdict};
pub use scorer::{ContentScorer, Evaluation, SequenceScorer};
