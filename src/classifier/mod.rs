//! Deterministic content-pattern classifier and click verification.
//!
//! This is the pure-pattern analysis path: no learned models involved. Its
//! subtractive confidence rule (100 minus severity penalties, valid only for
//! verified clicks) is deliberately distinct from the additive score used by
//! the learned-fusion path in [`crate::hybrid`].

pub mod patterns;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use patterns::{DeceptionPattern, MatchRule, Severity};

use crate::error::PatternError;

/// Opaque page snapshot supplied by the browser driver. The `url` key is
/// interpreted specially by [`ContentClassifier::verify_click`].
pub type Snapshot = BTreeMap<String, String>;

/// A rule that fired against analyzed content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub name: String,
    pub severity: Severity,
}

/// Outcome of the before/after snapshot comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickVerification {
    pub before: Snapshot,
    pub after: Snapshot,
    pub verified: bool,
    pub confidence: f64,
}

/// Composed result of the pure-pattern path.
#[derive(Debug, Clone)]
pub struct FullAnalysis {
    pub matches: Vec<PatternMatch>,
    pub verification: ClickVerification,
    /// Subtractive confidence in [0, 100].
    pub confidence: f64,
    /// Overall call verdict: click verified AND confidence above 50.
    pub verified: bool,
    pub log: Vec<String>,
}

/// Matches page content against registered deception rules, in registration
/// order.
#[derive(Debug)]
pub struct ContentClassifier {
    patterns: Vec<DeceptionPattern>,
}

impl Default for ContentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentClassifier {
    /// Classifier pre-loaded with the CAPTCHA / HONEYPOT / PHISHING /
    /// FAKE_ELEMENT rules. A builtin that fails to compile is skipped and
    /// logged so the remaining rules still load.
    #[must_use]
    pub fn new() -> Self {
        let mut patterns = Vec::new();
        for (name, rule, severity) in patterns::builtin_rules() {
            match DeceptionPattern::new(name, rule, severity) {
                Ok(pattern) => patterns.push(pattern),
                Err(err) => tracing::warn!(%name, %err, "builtin pattern skipped"),
            }
        }
        Self { patterns }
    }

    /// Register an additional rule. Compilation happens here; a malformed
    /// rule fails the registration and leaves the set unchanged.
    pub fn add_pattern(
        &mut self,
        name: &str,
        rule: MatchRule,
        severity: Severity,
    ) -> Result<(), PatternError> {
        let pattern = DeceptionPattern::new(name, rule, severity)?;
        self.patterns.push(pattern);
        Ok(())
    }

    /// Names of registered patterns, registration order.
    #[must_use]
    pub fn pattern_names(&self) -> Vec<String> {
        self.patterns.iter().map(|p| p.name.clone()).collect()
    }

    /// Test content against every registered pattern. Pure: identical input
    /// yields identical, registration-ordered output.
    #[must_use]
    pub fn analyze(&self, content: &str) -> Vec<PatternMatch> {
        self.patterns
            .iter()
            .filter(|pattern| pattern.regex.is_match(content))
            .map(|pattern| PatternMatch {
                name: pattern.name.clone(),
                severity: pattern.severity,
            })
            .collect()
    }

    /// A click counts as verified when the `url` field changed, or failing
    /// that, when the serialized snapshots differ at all.
    #[must_use]
    pub fn verify_click(&self, before: &Snapshot, after: &Snapshot) -> ClickVerification {
        let url_changed = match (before.get("url"), after.get("url")) {
            (Some(a), Some(b)) => a != b,
            (None, None) => false,
            _ => true,
        };
        let verified = url_changed || serialize(before) != serialize(after);
        ClickVerification {
            before: before.clone(),
            after: after.clone(),
            verified,
            confidence: if verified { 1.0 } else { 0.0 },
        }
    }

    /// Subtractive confidence: zero for an unverified click, otherwise 100
    /// minus the per-match severity penalty, floored at zero.
    #[must_use]
    pub fn confidence(&self, matches: &[PatternMatch], verification: &ClickVerification) -> f64 {
        if !verification.verified {
            return 0.0;
        }
        let penalty: f64 = matches.iter().map(|m| m.severity.penalty()).sum();
        (100.0 - penalty).max(0.0)
    }

    /// Full pure-pattern pass: analyze, verify, score, with a readable log
    /// trail for the audit ledger.
    #[must_use]
    pub fn run_full_analysis(
        &self,
        content: &str,
        before: &Snapshot,
        after: &Snapshot,
    ) -> FullAnalysis {
        let mut log = Vec::new();
        let matches = self.analyze(content);
        if matches.is_empty() {
            log.push("no deception patterns matched".to_string());
        } else {
            for m in &matches {
                log.push(format!("pattern {} matched (severity {})", m.name, m.severity));
            }
        }

        let verification = self.verify_click(before, after);
        log.push(format!(
            "click verification: verified={} confidence={:.1}",
            verification.verified, verification.confidence
        ));

        let confidence = self.confidence(&matches, &verification);
        let verified = verification.verified && confidence > 50.0;
        log.push(format!(
            "pattern confidence {confidence:.1}/100, overall verified={verified}"
        ));

        FullAnalysis {
            matches,
            verification,
            confidence,
            verified,
            log,
        }
    }
}

fn serialize(snapshot: &Snapshot) -> String {
    // BTreeMap keys are ordered, so equal snapshots serialize identically
    serde_json::to_string(snapshot).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, &str)]) -> Snapshot {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn recaptcha_markup_matches_captcha_pattern() {
        let classifier = ContentClassifier::new();
        let matches = classifier.analyze(r#"<div class="recaptcha">Verify</div>"#);
        assert!(matches.iter().any(|m| m.name == "CAPTCHA"));
    }

    #[test]
    fn analyze_is_pure_and_registration_ordered() {
        let mut classifier = ContentClassifier::new();
        classifier
            .add_pattern("LATE_RULE", MatchRule::new("recaptcha", "i"), Severity::Low)
            .unwrap();
        let content = r#"<div class="recaptcha" style="display: none">Verify</div>"#;
        let first = classifier.analyze(content);
        let second = classifier.analyze(content);
        assert_eq!(first, second);
        let names: Vec<&str> = first.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["CAPTCHA", "HONEYPOT", "LATE_RULE"]);
    }

    #[test]
    fn clean_content_matches_nothing() {
        let classifier = ContentClassifier::new();
        assert!(classifier.analyze("<p>Welcome to the catalog</p>").is_empty());
    }

    #[test]
    fn malformed_rule_fails_registration_and_leaves_set_unchanged() {
        let mut classifier = ContentClassifier::new();
        let before = classifier.pattern_names();
        let err = classifier
            .add_pattern("BROKEN", MatchRule::new("(unclosed", ""), Severity::Low)
            .unwrap_err();
        assert!(matches!(err, PatternError::Compile { .. }));
        assert_eq!(classifier.pattern_names(), before);
    }

    #[test]
    fn url_change_verifies_click() {
        let classifier = ContentClassifier::new();
        let result = classifier.verify_click(&snapshot(&[("url", "a")]), &snapshot(&[("url", "b")]));
        assert!(result.verified);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn identical_snapshots_fail_verification() {
        let classifier = ContentClassifier::new();
        let snap = snapshot(&[("url", "a"), ("title", "Home")]);
        let result = classifier.verify_click(&snap, &snap.clone());
        assert!(!result.verified);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn non_url_difference_still_verifies() {
        let classifier = ContentClassifier::new();
        let before = snapshot(&[("url", "a"), ("title", "Home")]);
        let after = snapshot(&[("url", "a"), ("title", "Dashboard")]);
        assert!(classifier.verify_click(&before, &after).verified);
    }

    #[test]
    fn confidence_is_zero_when_unverified() {
        let classifier = ContentClassifier::new();
        let snap = snapshot(&[("url", "a")]);
        let verification = classifier.verify_click(&snap, &snap.clone());
        let matches = vec![];
        assert_eq!(classifier.confidence(&matches, &verification), 0.0);
    }

    #[test]
    fn confidence_subtracts_severity_penalties_with_floor() {
        let classifier = ContentClassifier::new();
        let verification = classifier.verify_click(
            &snapshot(&[("url", "a")]),
            &snapshot(&[("url", "b")]),
        );
        let one_high = vec![PatternMatch {
            name: "CAPTCHA".into(),
            severity: Severity::High,
        }];
        assert_eq!(classifier.confidence(&one_high, &verification), 50.0);

        let pile_up = vec![
            PatternMatch { name: "A".into(), severity: Severity::High },
            PatternMatch { name: "B".into(), severity: Severity::High },
            PatternMatch { name: "C".into(), severity: Severity::Medium },
        ];
        assert_eq!(classifier.confidence(&pile_up, &verification), 0.0);
    }

    #[test]
    fn full_analysis_requires_verification_and_margin() {
        let classifier = ContentClassifier::new();
        let before = snapshot(&[("url", "a")]);
        let after = snapshot(&[("url", "b")]);

        // clean content, verified click: confidence 100, overall verified
        let clean = classifier.run_full_analysis("<p>ok</p>", &before, &after);
        assert!(clean.verified);
        assert_eq!(clean.confidence, 100.0);

        // one high-severity match drops confidence to exactly 50: not > 50
        let trapped =
            classifier.run_full_analysis(r#"<div class="recaptcha"></div>"#, &before, &after);
        assert!(!trapped.verified);
        assert_eq!(trapped.confidence, 50.0);
        assert!(!trapped.log.is_empty());
    }
}
