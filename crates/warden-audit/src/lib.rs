//! Append-only audit recording.
//!
//! Every completed pipeline run, and every kill-switch or restore action,
//! becomes one immutable [`AuditEntry`]. Entries carry a blake3 integrity
//! hash over the serialized snapshot so tampering in the backing store is
//! detectable. Violations found during a run are additionally persisted as
//! per-violation records tagged with the run's overall severity.

#![deny(unsafe_code)]

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use warden_storage::{
    AuditEntry, AuditStore, AuditTrigger, StorageError, ViolationRecord, ViolationStore,
};
use warden_types::{ActionRequest, AgentId, AuditId, Severity, Verdict, Violation};

/// Errors from the audit recorder.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("audit snapshot serialization failed: {0}")]
    Serialization(String),
}

/// Decision-relevant snapshot of a finished pipeline run.
///
/// The orchestrator owns the full pipeline state; this is the subset the
/// audit trail preserves.
#[derive(Clone, Debug, Serialize)]
pub struct DecisionSnapshot {
    pub request: ActionRequest,
    pub decision: Verdict,
    pub reasoning: String,
    pub severity: Severity,
    pub risk_score: u8,
    pub anomaly_score: u8,
    pub processing_path: Vec<String>,
    pub violations: Vec<Violation>,
}

/// Records governance outcomes durably. Write-once: nothing here updates or
/// deletes.
pub struct AuditRecorder {
    audits: Arc<dyn AuditStore>,
    violations: Arc<dyn ViolationStore>,
}

impl AuditRecorder {
    pub fn new(audits: Arc<dyn AuditStore>, violations: Arc<dyn ViolationStore>) -> Self {
        Self { audits, violations }
    }

    /// Persist the audit entry for a completed pipeline run, plus one
    /// violation record per detected violation.
    ///
    /// The entry is authoritative; a failure persisting an individual
    /// violation record is logged and does not fail the call.
    pub async fn record_decision(
        &self,
        snapshot: DecisionSnapshot,
    ) -> Result<AuditEntry, AuditError> {
        let entry = AuditEntry {
            id: AuditId::new(),
            trigger: AuditTrigger::PipelineDecision,
            request_id: Some(snapshot.request.id.clone()),
            agent_id: snapshot.request.agent_id.clone(),
            action: snapshot.request.action.clone(),
            target: snapshot.request.target.clone(),
            decision: Some(snapshot.decision),
            reasoning: snapshot.reasoning.clone(),
            severity: Some(snapshot.severity),
            risk_score: Some(snapshot.risk_score),
            anomaly_score: Some(snapshot.anomaly_score),
            processing_path: snapshot.processing_path.clone(),
            violation_count: snapshot.violations.len(),
            recorded_at: Utc::now(),
            integrity_hash: integrity_hash(&snapshot)?,
        };

        let stored = self.audits.append_audit(entry).await?;

        for violation in &snapshot.violations {
            let record = ViolationRecord {
                id: AuditId::new(),
                request_id: snapshot.request.id.clone(),
                agent_id: snapshot.request.agent_id.clone(),
                kind: violation.kind.clone(),
                description: violation.description.clone(),
                evidence: violation.evidence.clone(),
                severity: snapshot.severity,
                recorded_at: stored.recorded_at,
            };
            if let Err(err) = self.violations.append_violation(record).await {
                warn!(
                    request = %snapshot.request.id,
                    error = %err,
                    "violation record persistence failed"
                );
            }
        }

        Ok(stored)
    }

    /// Persist an audit entry for a kill-switch, restore, or emergency
    /// action, with a minimal synthesized snapshot (no stage results).
    pub async fn record_gate_event(
        &self,
        agent_id: &AgentId,
        trigger: AuditTrigger,
        reason: &str,
    ) -> Result<AuditEntry, AuditError> {
        #[derive(Serialize)]
        struct GateSnapshot<'a> {
            agent_id: &'a AgentId,
            trigger: AuditTrigger,
            reason: &'a str,
        }

        let entry = AuditEntry {
            id: AuditId::new(),
            trigger,
            request_id: None,
            agent_id: agent_id.clone(),
            action: String::new(),
            target: String::new(),
            decision: None,
            reasoning: reason.to_string(),
            severity: None,
            risk_score: None,
            anomaly_score: None,
            processing_path: Vec::new(),
            violation_count: 0,
            recorded_at: Utc::now(),
            integrity_hash: integrity_hash(&GateSnapshot {
                agent_id,
                trigger,
                reason,
            })?,
        };

        Ok(self.audits.append_audit(entry).await?)
    }
}

/// blake3 hex digest of the canonical JSON serialization.
fn integrity_hash<T: Serialize>(value: &T) -> Result<String, AuditError> {
    let bytes =
        serde_json::to_vec(value).map_err(|e| AuditError::Serialization(e.to_string()))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}
