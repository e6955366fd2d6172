//! Kill-switch / permission gate.
//!
//! Enforces per-agent ACTIVE/BLOCKED state. The gate is consulted before the
//! pipeline runs (a blocked agent's requests are rejected without entering
//! the pipeline) and acted upon after a KILL verdict. The *policy* of when
//! to trigger belongs to the caller; the gate only enforces and records
//! state.
//!
//! Records live in a sharded map with one async mutex per agent, so state
//! transitions for one agent are serialized while different agents never
//! block each other. Every mutation is written through to the permission
//! store.

#![deny(unsafe_code)]

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use warden_events::{EventNotifier, GovernanceEvent};
use warden_storage::{AgentPermission, PermissionState, PermissionStore};
use warden_types::AgentId;

/// Errors from the permission gate.
#[derive(Error, Debug)]
pub enum GateError {
    /// In-memory state was transitioned but write-through persistence failed.
    #[error("permission persistence failed for {agent}: {source}")]
    Persistence {
        agent: AgentId,
        #[source]
        source: warden_storage::StorageError,
    },

    #[error("permission map lock poisoned")]
    LockPoisoned,
}

/// Receipt for a kill-switch state transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionReceipt {
    pub agent_id: AgentId,
    pub previous_state: PermissionState,
    pub new_state: PermissionState,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// Per-agent result of an emergency bulk trigger.
pub struct EmergencyOutcome {
    pub agent_id: AgentId,
    pub result: Result<TransitionReceipt, GateError>,
}

/// The permission gate.
pub struct PermissionGate {
    store: Arc<dyn PermissionStore>,
    notifier: Arc<dyn EventNotifier>,
    records: RwLock<HashMap<AgentId, Arc<Mutex<AgentPermission>>>>,
}

impl PermissionGate {
    pub fn new(store: Arc<dyn PermissionStore>, notifier: Arc<dyn EventNotifier>) -> Self {
        Self {
            store,
            notifier,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Make sure a permission record exists for an agent, creating the
    /// default active record on first sighting.
    pub async fn ensure_known(&self, agent_id: &AgentId) -> Result<(), GateError> {
        if self.record_entry(agent_id).await?.is_some() {
            return Ok(());
        }

        let record = AgentPermission::new_active(agent_id.clone(), Utc::now());
        self.insert_record(record.clone())?;
        self.persist(agent_id, record).await
    }

    /// Read-only predicate consulted by the intake path. Unknown agents are
    /// not blocked.
    pub async fn is_blocked(&self, agent_id: &AgentId) -> Result<bool, GateError> {
        match self.record_entry(agent_id).await? {
            Some(entry) => Ok(entry.lock().await.is_blocked()),
            None => Ok(false),
        }
    }

    /// Current permission record for an agent, if any.
    pub async fn status(&self, agent_id: &AgentId) -> Result<Option<AgentPermission>, GateError> {
        match self.record_entry(agent_id).await? {
            Some(entry) => Ok(Some(entry.lock().await.clone())),
            None => Ok(None),
        }
    }

    /// All currently blocked agents.
    pub async fn blocked_agents(&self) -> Result<Vec<AgentPermission>, GateError> {
        let entries: Vec<_> = {
            let map = self.records.read().map_err(|_| GateError::LockPoisoned)?;
            map.values().cloned().collect()
        };

        let mut blocked = Vec::new();
        for entry in entries {
            let record = entry.lock().await;
            if record.is_blocked() {
                blocked.push(record.clone());
            }
        }
        blocked.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(blocked)
    }

    /// Flip an agent to BLOCKED.
    ///
    /// Idempotent: triggering an already-blocked agent records the new reason
    /// and timestamp (last write wins) without error.
    pub async fn trigger(
        &self,
        agent_id: &AgentId,
        reason: impl Into<String>,
    ) -> Result<TransitionReceipt, GateError> {
        let reason = reason.into();
        self.ensure_known(agent_id).await?;
        let entry = self
            .record_entry(agent_id)
            .await?
            .ok_or(GateError::LockPoisoned)?;

        let (receipt, snapshot) = {
            let mut record = entry.lock().await;
            let now = Utc::now();
            let previous_state = record.state;

            record.state = PermissionState::Blocked;
            record.blocked_at = Some(now);
            record.blocked_reason = Some(reason.clone());
            record.updated_at = now;

            (
                TransitionReceipt {
                    agent_id: agent_id.clone(),
                    previous_state,
                    new_state: PermissionState::Blocked,
                    reason: reason.clone(),
                    at: now,
                },
                record.clone(),
            )
        };

        info!(agent = %agent_id, reason = %reason, "kill-switch triggered");
        self.notifier.notify(GovernanceEvent::KillSwitchTriggered {
            agent_id: agent_id.clone(),
            reason,
        });

        self.persist(agent_id, snapshot).await?;
        Ok(receipt)
    }

    /// Flip an agent back to ACTIVE.
    pub async fn restore(
        &self,
        agent_id: &AgentId,
        reason: impl Into<String>,
    ) -> Result<TransitionReceipt, GateError> {
        let reason = reason.into();
        self.ensure_known(agent_id).await?;
        let entry = self
            .record_entry(agent_id)
            .await?
            .ok_or(GateError::LockPoisoned)?;

        let (receipt, snapshot) = {
            let mut record = entry.lock().await;
            let now = Utc::now();
            let previous_state = record.state;

            record.state = PermissionState::Active;
            record.blocked_at = None;
            record.blocked_reason = None;
            record.updated_at = now;

            (
                TransitionReceipt {
                    agent_id: agent_id.clone(),
                    previous_state,
                    new_state: PermissionState::Active,
                    reason: reason.clone(),
                    at: now,
                },
                record.clone(),
            )
        };

        info!(agent = %agent_id, reason = %reason, "agent restored");
        self.notifier.notify(GovernanceEvent::AgentRestored {
            agent_id: agent_id.clone(),
            reason,
        });

        self.persist(agent_id, snapshot).await?;
        Ok(receipt)
    }

    /// Apply `trigger` to every known agent.
    ///
    /// A persistence failure for one agent never prevents attempting the
    /// rest; the per-agent results are returned for the caller to inspect.
    pub async fn emergency_kill_all(
        &self,
        reason: impl Into<String>,
    ) -> Result<Vec<EmergencyOutcome>, GateError> {
        let reason = reason.into();
        let mut agents: Vec<AgentId> = {
            let map = self.records.read().map_err(|_| GateError::LockPoisoned)?;
            map.keys().cloned().collect()
        };
        agents.sort();

        warn!(agents = agents.len(), reason = %reason, "emergency kill-all");

        let mut outcomes = Vec::with_capacity(agents.len());
        for agent_id in agents {
            let result = self.trigger(&agent_id, reason.clone()).await;
            if let Err(err) = &result {
                warn!(agent = %agent_id, error = %err, "emergency trigger failed");
            }
            outcomes.push(EmergencyOutcome { agent_id, result });
        }
        Ok(outcomes)
    }

    async fn record_entry(
        &self,
        agent_id: &AgentId,
    ) -> Result<Option<Arc<Mutex<AgentPermission>>>, GateError> {
        {
            let map = self.records.read().map_err(|_| GateError::LockPoisoned)?;
            if let Some(entry) = map.get(agent_id) {
                return Ok(Some(entry.clone()));
            }
        }

        match self.store.get_permission(agent_id).await {
            Ok(Some(stored)) => {
                let mut map = self.records.write().map_err(|_| GateError::LockPoisoned)?;
                let entry = map
                    .entry(agent_id.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(stored)))
                    .clone();
                Ok(Some(entry))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                warn!(agent = %agent_id, error = %err, "permission hydration failed");
                Ok(None)
            }
        }
    }

    fn insert_record(&self, record: AgentPermission) -> Result<(), GateError> {
        let mut map = self.records.write().map_err(|_| GateError::LockPoisoned)?;
        map.entry(record.agent_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(record)));
        Ok(())
    }

    async fn persist(
        &self,
        agent_id: &AgentId,
        snapshot: AgentPermission,
    ) -> Result<(), GateError> {
        self.store
            .upsert_permission(snapshot)
            .await
            .map_err(|source| GateError::Persistence {
                agent: agent_id.clone(),
                source,
            })
    }
}
