//! Named, severity-tagged deception rules.
//!
//! Match rules are a structured `{source, flags}` pair compiled and
//! validated once at registration; a malformed rule is a registration
//! error, never a silent scan-time skip.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::PatternError;

/// Severity tier of a deception rule.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Subtractive penalty used by the pure-pattern confidence rule.
    #[must_use]
    pub fn penalty(self) -> f64 {
        match self {
            Severity::Low => 10.0,
            Severity::Medium => 30.0,
            Severity::High => 50.0,
        }
    }

    /// Additive weight used only by the learned-fusion score.
    #[must_use]
    pub fn hybrid_weight(self) -> f64 {
        match self {
            Severity::Low => 10.0,
            Severity::Medium => 20.0,
            Severity::High => 30.0,
        }
    }
}

/// Structured regex source plus flag string (`i`, `m`, `s`, `x`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRule {
    pub source: String,
    pub flags: String,
}

impl MatchRule {
    #[must_use]
    pub fn new(source: &str, flags: &str) -> Self {
        Self {
            source: source.to_string(),
            flags: flags.to_string(),
        }
    }

    /// Compile the rule, mapping each supported flag onto the builder.
    pub fn compile(&self, name: &str) -> Result<Regex, PatternError> {
        let mut builder = RegexBuilder::new(&self.source);
        for flag in self.flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                other => {
                    return Err(PatternError::UnsupportedFlag {
                        name: name.to_string(),
                        flag: other,
                    });
                }
            };
        }
        builder.build().map_err(|source| PatternError::Compile {
            name: name.to_string(),
            source,
        })
    }
}

/// A registered deception rule with its pre-compiled matcher.
#[derive(Debug, Clone)]
pub struct DeceptionPattern {
    pub name: String,
    pub rule: MatchRule,
    pub severity: Severity,
    pub(crate) regex: Regex,
}

impl DeceptionPattern {
    pub fn new(name: &str, rule: MatchRule, severity: Severity) -> Result<Self, PatternError> {
        let regex = rule.compile(name)?;
        Ok(Self {
            name: name.to_string(),
            rule,
            severity,
            regex,
        })
    }
}

/// The rules every classifier starts with.
pub(crate) fn builtin_rules() -> Vec<(&'static str, MatchRule, Severity)> {
    vec![
        (
            "CAPTCHA",
            MatchRule::new(
                r"captcha|recaptcha|hcaptcha|verify\s+you\s+are\s+(a\s+)?human|i'?m\s+not\s+a\s+robot",
                "i",
            ),
            Severity::High,
        ),
        (
            "HONEYPOT",
            MatchRule::new(
                r#"display\s*:\s*none|visibility\s*:\s*hidden|opacity\s*:\s*0(?:[^.\d]|$)|type\s*=\s*["']?hidden"#,
                "i",
            ),
            Severity::High,
        ),
        (
            "PHISHING",
            MatchRule::new(
                r"verify\s+your\s+(account|identity|password)|account\s+(suspended|locked)|confirm\s+your\s+(password|card|details)|urgent\s+action\s+required",
                "i",
            ),
            Severity::High,
        ),
        (
            "FAKE_ELEMENT",
            MatchRule::new(
                r"fake[-_]?(button|link|element)|decoy|pointer-events\s*:\s*none",
                "i",
            ),
            Severity::Medium,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_penalties_and_weights_stay_distinct() {
        assert_eq!(Severity::Low.penalty(), 10.0);
        assert_eq!(Severity::Medium.penalty(), 30.0);
        assert_eq!(Severity::High.penalty(), 50.0);
        assert_eq!(Severity::Low.hybrid_weight(), 10.0);
        assert_eq!(Severity::Medium.hybrid_weight(), 20.0);
        assert_eq!(Severity::High.hybrid_weight(), 30.0);
    }

    #[test]
    fn case_insensitive_flag_is_honored() {
        let rule = MatchRule::new("captcha", "i");
        let regex = rule.compile("CAPTCHA").unwrap();
        assert!(regex.is_match("Please solve this CAPTCHA"));
    }

    #[test]
    fn malformed_source_fails_at_compile() {
        let rule = MatchRule::new("(unclosed", "");
        let err = rule.compile("BROKEN").unwrap_err();
        assert!(matches!(err, PatternError::Compile { .. }));
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let rule = MatchRule::new("x", "ig");
        let err = rule.compile("GLOBAL").unwrap_err();
        assert!(matches!(err, PatternError::UnsupportedFlag { flag: 'g', .. }));
    }

    #[test]
    fn builtin_rules_all_compile() {
        for (name, rule, _) in builtin_rules() {
            assert!(rule.compile(name).is_ok(), "builtin {name} must compile");
        }
    }

    #[test]
    fn honeypot_rule_matches_hidden_styles() {
        let (_, rule, _) = builtin_rules().remove(1);
        let regex = rule.compile("HONEYPOT").unwrap();
        assert!(regex.is_match(r#"<input style="display: none" name="email2">"#));
        assert!(regex.is_match(r#"<input type="hidden" name="trap">"#));
        assert!(!regex.is_match("<p>opacity: 0.9 is fine</p>"));
    }
}
