//! Persisted record shapes.
//!
//! The logical records the collaborating persistence engine stores; the
//! physical schema behind them is a backend concern.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_types::{AgentId, AuditId, RequestId, Severity, Verdict};

// ── Behavioral baseline ─────────────────────────────────────────────────

/// One agent's learned normal-behavior profile.
///
/// Created on first request from an agent, updated after every completed
/// pipeline run, never deleted. Mutated only through the baseline tracker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentBaseline {
    pub agent_id: AgentId,
    /// Bounded FIFO of known action verbs (lowercased), max 20.
    pub typical_actions: VecDeque<String>,
    /// Bounded FIFO of known targets (lowercased), max 20.
    pub typical_targets: VecDeque<String>,
    /// Exponentially smoothed requests-per-hour.
    pub avg_requests_per_hour: f64,
    /// Exponentially smoothed risk score (0–100 scale).
    pub avg_risk_score: f64,
    pub total_requests: u64,
    /// Timestamps inside the trailing-hour window, pruned on touch.
    pub recent_requests: VecDeque<DateTime<Utc>>,
    pub first_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl AgentBaseline {
    /// Seed a fresh baseline from the first observed request.
    pub fn seed(
        agent_id: AgentId,
        action: &str,
        target: &str,
        risk_score: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            agent_id,
            typical_actions: VecDeque::from([action.trim().to_lowercase()]),
            typical_targets: VecDeque::from([target.trim().to_lowercase()]),
            avg_requests_per_hour: 1.0,
            avg_risk_score: risk_score,
            total_requests: 1,
            recent_requests: VecDeque::from([now]),
            first_seen: now,
            last_updated: now,
        }
    }
}

// ── Permissions ─────────────────────────────────────────────────────────

/// Enforced permission states for an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PermissionState {
    Active,
    Blocked,
}

/// One agent's permission record, owned by the permission gate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentPermission {
    pub agent_id: AgentId,
    pub state: PermissionState,
    pub capabilities: Vec<String>,
    pub blocked_at: Option<DateTime<Utc>>,
    pub blocked_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentPermission {
    /// Broad default capabilities granted on first sighting.
    pub fn default_capabilities() -> Vec<String> {
        ["read", "write", "execute", "network"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// A new active record with the broad defaults.
    pub fn new_active(agent_id: AgentId, now: DateTime<Utc>) -> Self {
        Self {
            agent_id,
            state: PermissionState::Active,
            capabilities: Self::default_capabilities(),
            blocked_at: None,
            blocked_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.state == PermissionState::Blocked
    }
}

// ── Audit ───────────────────────────────────────────────────────────────

/// What produced an audit entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditTrigger {
    /// A completed pipeline run.
    PipelineDecision,
    /// A kill-switch trigger outside the pipeline.
    KillSwitch,
    /// A kill-switch restore.
    Restore,
    /// A bulk emergency trigger.
    EmergencyKill,
}

/// Append-only record of a governance outcome.
///
/// A full snapshot of the decision-relevant pipeline-state fields; kill-switch
/// and restore entries carry a minimal synthesized snapshot instead. Never
/// mutated after creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditId,
    pub trigger: AuditTrigger,
    pub request_id: Option<RequestId>,
    pub agent_id: AgentId,
    pub action: String,
    pub target: String,
    pub decision: Option<Verdict>,
    pub reasoning: String,
    pub severity: Option<Severity>,
    pub risk_score: Option<u8>,
    pub anomaly_score: Option<u8>,
    /// Ordered list of executed stage names.
    pub processing_path: Vec<String>,
    pub violation_count: usize,
    pub recorded_at: DateTime<Utc>,
    /// blake3 hex digest of the serialized snapshot fields.
    pub integrity_hash: String,
}

/// Per-violation persistence record, tagged with the run's overall severity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub id: AuditId,
    pub request_id: RequestId,
    pub agent_id: AgentId,
    pub kind: String,
    pub description: String,
    pub evidence: Vec<String>,
    /// Overall severity of the run that produced this violation.
    pub severity: Severity,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_baseline_counts_one_request() {
        let b = AgentBaseline::seed(
            AgentId::new("a1"),
            "Read_File",
            "/tmp/x",
            12.0,
            Utc::now(),
        );
        assert_eq!(b.total_requests, 1);
        assert_eq!(b.typical_actions.front().unwrap(), "read_file");
        assert!((b.avg_risk_score - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn new_permission_is_active_with_defaults() {
        let p = AgentPermission::new_active(AgentId::new("a1"), Utc::now());
        assert_eq!(p.state, PermissionState::Active);
        assert!(!p.is_blocked());
        assert!(p.capabilities.contains(&"read".to_string()));
        assert_eq!(p.capabilities.len(), 4);
    }

    #[test]
    fn permission_state_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&PermissionState::Blocked).unwrap(),
            "\"BLOCKED\""
        );
    }
}
