//! Fixed-shape feature extraction for the learned scorers.
//!
//! The extractor is caller-owned; there is no shared default instance, so
//! vocabularies learned by independent sessions can never bleed into each
//! other.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Viewport bounds used to normalize click coordinates into [0, 1].
const VIEWPORT_WIDTH: f64 = 1920.0;
const VIEWPORT_HEIGHT: f64 = 1080.0;

/// Number of features per interaction row.
pub const INTERACTION_FEATURES: usize = 4;

/// What the agent did at one step of the session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Click,
    Submit,
    Input,
    Hover,
    Scroll,
    Unknown,
}

impl ActionKind {
    /// Fixed per-action weight fed to the sequence model.
    #[must_use]
    pub fn weight(self) -> f32 {
        match self {
            ActionKind::Click | ActionKind::Submit => 1.0,
            ActionKind::Input => 0.7,
            ActionKind::Hover => 0.5,
            ActionKind::Scroll => 0.3,
            ActionKind::Unknown => 0.1,
        }
    }
}

/// One step of interaction history, input to the sequence scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub action: ActionKind,
    pub timestamp: DateTime<Utc>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    /// Confidence scalar carried in the record metadata, if any.
    pub confidence: Option<f64>,
}

impl InteractionRecord {
    #[must_use]
    pub fn new(action: ActionKind) -> Self {
        Self {
            action,
            timestamp: Utc::now(),
            x: None,
            y: None,
            confidence: None,
        }
    }

    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Bounded-vocabulary vectorizer for page content and interaction history.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    vocab: HashMap<String, usize>,
    next_index: usize,
    capacity: usize,
    vector_len: usize,
    sequence_len: usize,
}

/// Seed tokens covering the deception domain. Index 0 is reserved for
/// unknown tokens, so seeds start at 1.
const SEED_TOKENS: &[&str] = &[
    "captcha", "recaptcha", "hcaptcha", "robot", "human", "verify", "verification",
    "challenge", "puzzle", "honeypot", "hidden", "invisible", "trap", "decoy", "bait",
    "phishing", "suspended", "locked", "urgent", "confirm", "password", "account",
    "identity", "fake", "overlay", "popup", "redirect", "click", "submit", "free",
    "winner", "prize",
];

impl FeatureExtractor {
    /// `capacity` bounds the vocabulary; `vector_len` and `sequence_len` fix
    /// the output shapes.
    #[must_use]
    pub fn new(capacity: usize, vector_len: usize, sequence_len: usize) -> Self {
        let mut extractor = Self {
            vocab: HashMap::new(),
            next_index: 1,
            capacity: capacity.max(SEED_TOKENS.len() + 1),
            vector_len,
            sequence_len,
        };
        for token in SEED_TOKENS {
            extractor.add_token(token);
        }
        extractor
    }

    /// Insert a token if there is room. Returns the token's index whether it
    /// was already known or newly added; `None` once the vocabulary is full.
    pub fn add_token(&mut self, token: &str) -> Option<usize> {
        if let Some(&index) = self.vocab.get(token) {
            return Some(index);
        }
        if self.next_index >= self.capacity {
            return None;
        }
        let index = self.next_index;
        self.vocab.insert(token.to_string(), index);
        self.next_index += 1;
        Some(index)
    }

    /// Snapshot of the vocabulary for diagnostics. Defensive copy.
    #[must_use]
    pub fn vocabulary(&self) -> BTreeMap<String, usize> {
        self.vocab
            .iter()
            .map(|(token, &index)| (token.clone(), index))
            .collect()
    }

    #[must_use]
    pub fn vector_len(&self) -> usize {
        self.vector_len
    }

    #[must_use]
    pub fn sequence_len(&self) -> usize {
        self.sequence_len
    }

    /// Strip markup, tokenize, map through the vocabulary (unknown → 0),
    /// then truncate or zero-pad to the fixed vector length.
    #[must_use]
    pub fn vectorize_content(&self, html: &str) -> Vec<f32> {
        let text = strip_markup(html);
        let mut vector: Vec<f32> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .take(self.vector_len)
            .map(|token| self.vocab.get(token).copied().unwrap_or(0) as f32)
            .collect();
        vector.resize(self.vector_len, 0.0);
        vector
    }

    /// Map up to `sequence_len` records into rows of
    /// `[action weight, x / viewport width, y / viewport height, confidence]`,
    /// padding with zero rows.
    #[must_use]
    pub fn vectorize_interactions(
        &self,
        records: &[InteractionRecord],
    ) -> Vec<[f32; INTERACTION_FEATURES]> {
        let mut rows: Vec<[f32; INTERACTION_FEATURES]> = records
            .iter()
            .take(self.sequence_len)
            .map(|record| {
                [
                    record.action.weight(),
                    (record.x.unwrap_or(0.0) / VIEWPORT_WIDTH) as f32,
                    (record.y.unwrap_or(0.0) / VIEWPORT_HEIGHT) as f32,
                    record.confidence.unwrap_or(0.0) as f32,
                ]
            })
            .collect();
        rows.resize(self.sequence_len, [0.0; INTERACTION_FEATURES]);
        rows
    }
}

/// Remove script/style blocks and all tags, decode the common entities, and
/// lowercase the remainder.
fn strip_markup(html: &str) -> String {
    let without_blocks = strip_blocks(&strip_blocks(html, "script"), "style");

    let mut text = String::with_capacity(without_blocks.len());
    let mut in_tag = false;
    for c in without_blocks.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    let decoded = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");
    decoded.to_lowercase()
}

/// Drop `<tag ...>...</tag>` blocks, case-insensitively, content included.
fn strip_blocks(html: &str, tag: &str) -> String {
    // ASCII lowering keeps byte offsets aligned with the original
    let lower = html.to_ascii_lowercase();
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;
    while let Some(start) = lower[cursor..].find(&open) {
        let start = cursor + start;
        out.push_str(&html[cursor..start]);
        match lower[start..].find(&close) {
            Some(end) => cursor = start + end + close.len(),
            None => {
                // unterminated block swallows the rest
                cursor = html.len();
                break;
            }
        }
    }
    out.push_str(&html[cursor..]);
    out
}
