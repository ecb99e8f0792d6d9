//! End-to-end behavior of the detection pipeline through the public API.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use trapsight::{
    ActionKind, BrowserDriver, DetectorConfig, EnsembleCombiner, InteractionLedger,
    InteractionOrchestrator, InteractionRecord, Snapshot, SpatialZone, StateConfig, Verdict,
    ZoneKind,
};

fn snap(url: &str) -> Snapshot {
    let mut s = Snapshot::new();
    s.insert("url".into(), url.into());
    s
}

/// Minimal driver scripted with fixed page content and a snapshot queue.
struct FakeBrowser {
    content: String,
    snapshots: Mutex<Vec<Snapshot>>,
}

impl FakeBrowser {
    fn new(content: &str, snapshots: Vec<Snapshot>) -> Self {
        Self {
            content: content.to_string(),
            snapshots: Mutex::new(snapshots),
        }
    }
}

#[async_trait]
impl BrowserDriver for FakeBrowser {
    async fn snapshot(&self) -> anyhow::Result<Snapshot> {
        let mut queue = self.snapshots.lock().unwrap();
        anyhow::ensure!(!queue.is_empty(), "snapshot queue exhausted");
        Ok(queue.remove(0))
    }

    async fn page_content(&self) -> anyhow::Result<String> {
        Ok(self.content.clone())
    }

    async fn dispatch_click(&self, _x: f64, _y: f64) -> anyhow::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn honest_page_click_is_verified_and_safe() {
    let driver = FakeBrowser::new(
        "<h1>Order placed</h1><p>Thank you for your purchase.</p>",
        vec![snap("https://shop.example/cart"), snap("https://shop.example/done")],
    );
    let mut orch = InteractionOrchestrator::new(
        driver,
        DetectorConfig {
            enable_learned_scoring: false,
            ..DetectorConfig::default()
        },
    )
    .unwrap();

    let outcome = orch.attempt_click("#place-order", 640.0, 420.0, &[]).await;
    assert!(outcome.success);
    assert_eq!(outcome.verdict, Verdict::Safe);
    assert_eq!(outcome.final_state, "VERIFIED");

    let export = orch.audit_ledger().export().unwrap();
    assert!(export.contains("interaction_complete"));
}

#[tokio::test]
async fn disguised_captcha_is_flagged_and_attempt_fails() {
    let driver = FakeBrowser::new(
        r#"<div class="recaptcha">Verify you are human</div>
           <button style="display: none" class="fake-button">Continue</button>"#,
        vec![snap("a"), snap("b")],
    );
    let mut orch = InteractionOrchestrator::new(
        driver,
        DetectorConfig {
            enable_learned_scoring: false,
            ..DetectorConfig::default()
        },
    )
    .unwrap();

    let outcome = orch.attempt_click("#continue", 10.0, 10.0, &[]).await;
    // CAPTCHA + HONEYPOT + FAKE_ELEMENT: additive 80 ⇒ HIGH_THREAT bucket
    assert_eq!(outcome.verdict, Verdict::HighThreat);
    assert!(!outcome.success);
    assert_eq!(outcome.final_state, "FAILED");
}

#[tokio::test]
async fn full_ml_pipeline_produces_a_bounded_verdict() {
    let driver = FakeBrowser::new(
        r#"<p>Please confirm your password to verify your account</p>"#,
        vec![snap("a"), snap("b")],
    );
    let mut orch = InteractionOrchestrator::new(driver, DetectorConfig::default()).unwrap();
    orch.detector_mut().initialize_models();

    let history = vec![
        InteractionRecord::new(ActionKind::Scroll),
        InteractionRecord::new(ActionKind::Hover).at(300.0, 400.0),
        InteractionRecord::new(ActionKind::Click)
            .at(305.0, 405.0)
            .with_confidence(0.9),
    ];
    let outcome = orch.attempt_click("#verify", 305.0, 405.0, &history).await;

    assert!((0.0..=1.0).contains(&outcome.confidence));
    assert!(matches!(outcome.final_state.as_str(), "VERIFIED" | "FAILED"));
    let complete = outcome
        .audit
        .iter()
        .find(|e| e.action == "interaction_complete")
        .unwrap();
    let log = complete.metadata["log"].as_array().unwrap();
    assert!(log.iter().any(|l| l.as_str().unwrap().contains("fusion")));
}

// ─── Spec scenarios ──────────────────────────────────────────────────────────

#[test]
fn scenario_recaptcha_div_matches_captcha() {
    let detector =
        trapsight::HybridDetector::new(DetectorConfig::default()).unwrap();
    let matches = detector.analyze(r#"<div class="recaptcha">Verify</div>"#);
    assert!(matches.iter().any(|m| m.name == "CAPTCHA"));
}

#[test]
fn scenario_url_change_verifies_click() {
    let classifier = trapsight::ContentClassifier::new();
    let result = classifier.verify_click(&snap("a"), &snap("b"));
    assert!(result.verified);
    assert_eq!(result.confidence, 1.0);
}

#[test]
fn scenario_identical_snapshots_do_not_verify() {
    let classifier = trapsight::ContentClassifier::new();
    let before = snap("a");
    let result = classifier.verify_click(&before, &before.clone());
    assert!(!result.verified);
    assert_eq!(result.confidence, 0.0);
}

#[test]
fn scenario_danger_zone_blocks_inside_not_outside() {
    let mut guard = trapsight::SpatialGuard::new();
    guard.add_zone(SpatialZone {
        id: "z1".into(),
        x: 10.0,
        y: 10.0,
        width: 50.0,
        height: 50.0,
        kind: ZoneKind::Danger,
    });
    assert!(guard.blocks_click(20.0, 20.0));
    assert!(!guard.blocks_click(1000.0, 1000.0));
}

#[test]
fn scenario_hybrid_score_75_regex_085_ml() {
    let combiner = EnsembleCombiner::default();
    let score = combiner.hybrid_score(75.0, 0.85);
    assert!((score - 81.0).abs() < 1e-9);
}

// ─── Lifecycle properties through the public API ────────────────────────────

#[test]
fn ledger_history_grows_by_one_per_change_and_reset_restores() {
    let mut ledger = InteractionLedger::new(StateConfig::interaction_default()).unwrap();
    for _ in 0..3 {
        ledger.transition("PENDING", BTreeMap::new()).unwrap();
        ledger.transition("FAILED", BTreeMap::new()).unwrap();
        ledger.transition("IDLE", BTreeMap::new()).unwrap();
    }
    assert_eq!(ledger.history().len(), 10);

    ledger.reset();
    assert_eq!(ledger.history().len(), 1);
    assert_eq!(ledger.state().name, "IDLE");
}

#[test]
fn transition_validity_matches_the_configured_graph() {
    let cfg = StateConfig::interaction_default();
    let mut ledger = InteractionLedger::new(cfg.clone()).unwrap();

    for to in &cfg.states {
        let allowed = cfg
            .transitions
            .get("IDLE")
            .is_some_and(|targets| targets.contains(to));
        let mut probe = ledger.clone();
        assert_eq!(probe.transition(to, BTreeMap::new()).is_ok(), allowed, "to={to}");
    }

    // set_state accepts exactly the configured state set
    assert!(ledger.set_state("VERIFIED", BTreeMap::new()).is_ok());
    assert!(ledger.set_state("NOT_A_STATE", BTreeMap::new()).is_err());
}
