//! End-to-end governance scenarios through the intake facade.

use std::sync::Arc;

use warden_audit::AuditRecorder;
use warden_baseline::{BaselineConfig, BaselineTracker};
use warden_events::NullNotifier;
use warden_gate::PermissionGate;
use warden_oracle::{FailingOracle, HeuristicOracle, Oracle, ScriptedOracle};
use warden_pipeline::{AuditStatus, GovernorConfig, IntakeOutcome, RequestGovernor};
use warden_rules::RuleSet;
use warden_storage::{AuditStore, InMemoryStorage, QueryWindow};
use warden_types::{AgentId, Verdict};

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

fn governor_with(oracle: Arc<dyn Oracle>, storage: Arc<InMemoryStorage>) -> RequestGovernor {
    init_tracing();
    let notifier = Arc::new(NullNotifier);
    RequestGovernor::new(
        GovernorConfig::default(),
        oracle,
        Arc::new(RuleSet::builtin()),
        Arc::new(PermissionGate::new(storage.clone(), notifier.clone())),
        Arc::new(BaselineTracker::new(
            BaselineConfig::default(),
            storage.clone(),
        )),
        Arc::new(AuditRecorder::new(storage.clone(), storage.clone())),
        storage,
        notifier,
    )
}

fn decided(outcome: IntakeOutcome) -> (warden_pipeline::PipelineState, AuditStatus) {
    match outcome {
        IntakeOutcome::Decided { state, audit } => (*state, audit),
        IntakeOutcome::Denied { .. } => panic!("expected a decided outcome"),
    }
}

#[tokio::test]
async fn sensitive_system_file_is_killed_and_agent_blocked() {
    let storage = Arc::new(InMemoryStorage::new());
    let governor = governor_with(Arc::new(HeuristicOracle::new()), storage.clone());

    let outcome = governor
        .submit("a1", "read_file", "/etc/passwd")
        .await
        .unwrap();
    let (state, audit) = decided(outcome);

    assert_eq!(state.decision(), Some(Verdict::Kill));
    assert!(state
        .severity
        .as_ref()
        .unwrap()
        .triggered_rules
        .iter()
        .any(|r| r.as_str() == "sys-001"));
    assert!(state
        .processing_path()
        .contains(&"remediate".to_string()));
    assert!(matches!(audit, AuditStatus::Recorded(_)));

    // block_on_kill default: the agent is now blocked and the next request
    // is rejected before the pipeline.
    assert!(governor
        .gate()
        .is_blocked(&AgentId::new("a1"))
        .await
        .unwrap());

    let outcome = governor
        .submit("a1", "read_file", "./README.md")
        .await
        .unwrap();
    match outcome {
        IntakeOutcome::Denied { reason, .. } => {
            assert!(reason.contains("KILL verdict"));
        }
        IntakeOutcome::Decided { .. } => panic!("blocked agent must be denied"),
    }

    // Two audit entries: the pipeline decision and the kill-switch event.
    let audits = storage.list_audit(QueryWindow::default()).await.unwrap();
    assert_eq!(audits.len(), 2);
}

#[tokio::test]
async fn benign_request_is_approved_without_remediation() {
    let oracle = Arc::new(ScriptedOracle::sequence(vec![
        r#"{"intent_summary": "reads project documentation"}"#,
        r#"{"violations": [], "policy_breaches": []}"#,
        r#"{"severity": "LOW", "risk_score": 10, "reasoning": "routine documentation read"}"#,
    ]));
    let storage = Arc::new(InMemoryStorage::new());
    let governor = governor_with(oracle, storage);

    let outcome = governor
        .submit("a1", "read_file", "./README.md")
        .await
        .unwrap();
    let (state, _) = decided(outcome);

    assert_eq!(state.decision(), Some(Verdict::Approve));
    assert_eq!(
        state.processing_path(),
        &["orchestrate", "monitor", "analyze", "classify", "decide"]
    );
    assert!(state.remediation.is_none());
    assert!(!governor
        .gate()
        .is_blocked(&AgentId::new("a1"))
        .await
        .unwrap());
}

#[tokio::test]
async fn oracle_outage_degrades_to_flag_and_terminates() {
    let storage = Arc::new(InMemoryStorage::new());
    let governor = governor_with(Arc::new(FailingOracle), storage);

    let outcome = governor
        .submit("a1", "read_file", "./README.md")
        .await
        .unwrap();
    let (state, audit) = decided(outcome);

    assert_eq!(state.decision(), Some(Verdict::Flag));
    assert!(!state.processing_path().is_empty());
    assert!(matches!(audit, AuditStatus::Recorded(_)));
}

#[tokio::test]
async fn novel_action_raises_anomaly_score_after_history() {
    let storage = Arc::new(InMemoryStorage::new());
    let governor = governor_with(Arc::new(HeuristicOracle::new()), storage);

    // Three prior requests establish a read_file baseline.
    for _ in 0..3 {
        let outcome = governor
            .submit("a1", "read_file", "./docs/guide.md")
            .await
            .unwrap();
        let (state, _) = decided(outcome);
        assert_eq!(state.decision(), Some(Verdict::Approve));
    }

    // A brand-new action verb now carries the unknown-action contribution.
    let outcome = governor
        .submit("a1", "execute_command", "./docs/guide.md")
        .await
        .unwrap();
    let (state, _) = decided(outcome);
    assert!(state.anomaly_score >= 15);
}

#[tokio::test]
async fn anomaly_score_is_zero_below_three_requests() {
    let storage = Arc::new(InMemoryStorage::new());
    let governor = governor_with(Arc::new(HeuristicOracle::new()), storage);

    let outcome = governor
        .submit("a1", "read_file", "./docs/guide.md")
        .await
        .unwrap();
    decided(outcome);

    let outcome = governor
        .submit("a1", "execute_command", "/somewhere/else")
        .await
        .unwrap();
    let (state, _) = decided(outcome);
    assert_eq!(state.anomaly_score, 0);
}

#[tokio::test]
async fn kill_then_restore_allows_the_agent_back() {
    let storage = Arc::new(InMemoryStorage::new());
    let governor = governor_with(Arc::new(HeuristicOracle::new()), storage);
    let agent = AgentId::new("a1");

    governor
        .submit("a1", "read_file", "/etc/passwd")
        .await
        .unwrap();
    assert!(governor.gate().is_blocked(&agent).await.unwrap());

    governor
        .gate()
        .restore(&agent, "incident reviewed")
        .await
        .unwrap();
    assert!(!governor.gate().is_blocked(&agent).await.unwrap());

    let outcome = governor
        .submit("a1", "read_file", "./README.md")
        .await
        .unwrap();
    assert!(matches!(outcome, IntakeOutcome::Decided { .. }));
}

#[tokio::test]
async fn emergency_kill_all_blocks_every_known_agent() {
    let storage = Arc::new(InMemoryStorage::new());
    let governor = governor_with(Arc::new(HeuristicOracle::new()), storage);

    for agent in ["a1", "a2", "a3"] {
        governor
            .submit(agent, "read_file", "./README.md")
            .await
            .unwrap();
    }

    let outcomes = governor
        .gate()
        .emergency_kill_all("containment")
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 3);

    for agent in ["a1", "a2", "a3"] {
        let outcome = governor
            .submit(agent, "read_file", "./README.md")
            .await
            .unwrap();
        assert!(matches!(outcome, IntakeOutcome::Denied { .. }));
    }
}

#[tokio::test]
async fn invalid_request_is_rejected_before_the_pipeline() {
    let governor = RequestGovernor::in_memory(GovernorConfig::default());

    let err = governor.submit("a1", "", "/tmp/x").await;
    assert!(err.is_err());
}

#[tokio::test]
async fn concurrent_agents_govern_independently() {
    let governor = Arc::new(RequestGovernor::in_memory(GovernorConfig::default()));

    let mut handles = Vec::new();
    for i in 0..8 {
        let governor = governor.clone();
        handles.push(tokio::spawn(async move {
            governor
                .submit(format!("agent-{i}"), "read_file", "./README.md")
                .await
        }));
    }

    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        let (state, _) = decided(outcome);
        assert!(state.decision().is_some());
    }
}
