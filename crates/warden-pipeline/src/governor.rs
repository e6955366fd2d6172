//! The request-intake facade.
//!
//! Wires the full control flow around a pipeline run: permission gate check,
//! behavioral anomaly scoring, staged assessment, audit recording, baseline
//! update, the optional kill-switch trigger, and event notifications.
//!
//! Concurrent calls proceed independently; the only per-agent serialization
//! happens inside the baseline tracker and the permission gate.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use warden_audit::{AuditRecorder, DecisionSnapshot};
use warden_baseline::BaselineTracker;
use warden_events::{EventNotifier, GovernanceEvent, NullNotifier};
use warden_gate::PermissionGate;
use warden_oracle::{HeuristicOracle, Oracle};
use warden_rules::RuleSet;
use warden_storage::{AuditTrigger, InMemoryStorage, RequestStore};
use warden_types::{ActionRequest, AgentId, AuditId, Verdict};

use crate::config::GovernorConfig;
use crate::error::GovernorError;
use crate::orchestrator::Pipeline;
use crate::state::PipelineState;

/// Whether the decision made it into the audit trail.
///
/// The decision is authoritative even when its audit write fails; the
/// failure is surfaced here for operators instead of being swallowed.
#[derive(Clone, Debug)]
pub enum AuditStatus {
    Recorded(AuditId),
    Failed(String),
}

/// Result of submitting a request for governance.
pub enum IntakeOutcome {
    /// The pipeline ran to completion and rendered a verdict.
    Decided {
        state: Box<PipelineState>,
        audit: AuditStatus,
    },
    /// The agent is blocked; the request never entered the pipeline.
    Denied {
        agent_id: AgentId,
        reason: String,
        blocked_at: Option<DateTime<Utc>>,
    },
}

/// The single entry point callers use to govern agent requests.
pub struct RequestGovernor {
    config: GovernorConfig,
    pipeline: Pipeline,
    gate: Arc<PermissionGate>,
    baseline: Arc<BaselineTracker>,
    audit: Arc<AuditRecorder>,
    requests: Arc<dyn RequestStore>,
    notifier: Arc<dyn EventNotifier>,
}

impl RequestGovernor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: GovernorConfig,
        oracle: Arc<dyn Oracle>,
        rules: Arc<RuleSet>,
        gate: Arc<PermissionGate>,
        baseline: Arc<BaselineTracker>,
        audit: Arc<AuditRecorder>,
        requests: Arc<dyn RequestStore>,
        notifier: Arc<dyn EventNotifier>,
    ) -> Self {
        let pipeline = Pipeline::new(config.pipeline.clone(), oracle, rules);
        Self {
            config,
            pipeline,
            gate,
            baseline,
            audit,
            requests,
            notifier,
        }
    }

    /// Fully in-memory wiring: heuristic oracle, built-in rules, in-memory
    /// storage, no notifications. Useful for tests and local evaluation.
    pub fn in_memory(config: GovernorConfig) -> Self {
        let storage = Arc::new(InMemoryStorage::new());
        let notifier: Arc<dyn EventNotifier> = Arc::new(NullNotifier);
        Self::new(
            config,
            Arc::new(HeuristicOracle::new()),
            Arc::new(RuleSet::builtin()),
            Arc::new(PermissionGate::new(storage.clone(), notifier.clone())),
            Arc::new(BaselineTracker::new(
                warden_baseline::BaselineConfig::default(),
                storage.clone(),
            )),
            Arc::new(AuditRecorder::new(storage.clone(), storage.clone())),
            storage,
            notifier,
        )
    }

    pub fn gate(&self) -> &PermissionGate {
        &self.gate
    }

    pub fn baseline(&self) -> &BaselineTracker {
        &self.baseline
    }

    /// Validate, build and govern a request in one call.
    pub async fn submit(
        &self,
        agent_id: impl Into<AgentId>,
        action: impl Into<String>,
        target: impl Into<String>,
    ) -> Result<IntakeOutcome, GovernorError> {
        let request = ActionRequest::builder(agent_id, action, target).build()?;
        self.govern(request).await
    }

    /// Govern an accepted request.
    ///
    /// Synchronous from the caller's perspective (awaits completion), fully
    /// concurrent with respect to other calls.
    pub async fn govern(&self, request: ActionRequest) -> Result<IntakeOutcome, GovernorError> {
        let agent_id = request.agent_id.clone();

        self.gate
            .ensure_known(&agent_id)
            .await
            .map_err(internal)?;

        // Fail fast: blocked agents never enter the pipeline.
        if self.gate.is_blocked(&agent_id).await.map_err(internal)? {
            let record = self.gate.status(&agent_id).await.map_err(internal)?;
            let (reason, blocked_at) = record
                .map(|r| (r.blocked_reason.unwrap_or_default(), r.blocked_at))
                .unwrap_or_default();

            info!(agent = %agent_id, "request rejected: agent is blocked");
            return Ok(IntakeOutcome::Denied {
                agent_id,
                reason,
                blocked_at,
            });
        }

        if let Err(err) = self.requests.create_request(request.clone()).await {
            // The request record is bookkeeping; the run proceeds.
            warn!(request = %request.id, error = %err, "request persistence failed");
        }

        self.notifier.notify(GovernanceEvent::RequestReceived {
            request_id: request.id.clone(),
            agent_id: agent_id.clone(),
            action: request.action.clone(),
        });

        let anomaly_score = self
            .baseline
            .score(&agent_id, &request.action, &request.target)
            .await
            .map_err(internal)?;

        let state = self
            .pipeline
            .run(request, anomaly_score)
            .await
            .map_err(internal)?;

        if let Some(analysis) = &state.analysis {
            for violation in &analysis.violations {
                self.notifier.notify(GovernanceEvent::ViolationDetected {
                    request_id: state.request.id.clone(),
                    agent_id: agent_id.clone(),
                    kind: violation.kind.clone(),
                });
            }
        }

        let verdict = state.decision().ok_or_else(|| {
            GovernorError::Internal("pipeline returned without a verdict".into())
        })?;

        let audit = self.record_audit(&state, verdict).await;
        self.update_baseline(&state).await;

        if verdict == Verdict::Kill && self.config.block_on_kill {
            self.trigger_kill(&state).await;
        }

        self.notifier.notify(GovernanceEvent::RequestProcessed {
            request_id: state.request.id.clone(),
            agent_id,
            decision: verdict,
        });

        Ok(IntakeOutcome::Decided {
            state: Box::new(state),
            audit,
        })
    }

    async fn record_audit(&self, state: &PipelineState, verdict: Verdict) -> AuditStatus {
        let snapshot = DecisionSnapshot {
            request: state.request.clone(),
            decision: verdict,
            reasoning: state.decision_reasoning().unwrap_or_default().to_string(),
            severity: state.classified_severity(),
            risk_score: state.risk_score(),
            anomaly_score: state.anomaly_score,
            processing_path: state.processing_path().to_vec(),
            violations: state
                .analysis
                .as_ref()
                .map(|a| a.violations.clone())
                .unwrap_or_default(),
        };

        match self.audit.record_decision(snapshot).await {
            Ok(entry) => AuditStatus::Recorded(entry.id),
            Err(err) => {
                // Decision delivery and audit durability are decoupled: the
                // verdict stands even when its record does not.
                error!(request = %state.request.id, error = %err, "audit write failed");
                AuditStatus::Failed(err.to_string())
            }
        }
    }

    async fn update_baseline(&self, state: &PipelineState) {
        if let Err(err) = self
            .baseline
            .update(
                &state.request.agent_id,
                &state.request.action,
                &state.request.target,
                f64::from(state.risk_score()),
            )
            .await
        {
            error!(agent = %state.request.agent_id, error = %err, "baseline update failed");
        }
    }

    async fn trigger_kill(&self, state: &PipelineState) {
        let agent_id = &state.request.agent_id;
        let reason = format!("KILL verdict for request {}", state.request.id);

        match self.gate.trigger(agent_id, reason.clone()).await {
            Ok(_) => {
                if let Err(err) = self
                    .audit
                    .record_gate_event(agent_id, AuditTrigger::KillSwitch, &reason)
                    .await
                {
                    error!(agent = %agent_id, error = %err, "kill-switch audit write failed");
                }
            }
            Err(err) => {
                error!(agent = %agent_id, error = %err, "kill-switch trigger failed");
            }
        }
    }
}

fn internal(err: impl std::fmt::Display) -> GovernorError {
    GovernorError::Internal(err.to_string())
}
