//! In-memory reference implementation for the Warden storage traits.
//!
//! Deterministic and test-friendly. Production deployments should use a
//! transactional backend for source-of-truth data.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use warden_types::{ActionRequest, AgentId, RequestId};

use crate::model::{AgentBaseline, AgentPermission, AuditEntry, ViolationRecord};
use crate::traits::{
    AuditStore, BaselineStore, PermissionStore, QueryWindow, RequestStore, ViolationStore,
};
use crate::{StorageError, StorageResult};

/// In-memory Warden storage adapter.
#[derive(Default)]
pub struct InMemoryStorage {
    requests: RwLock<Vec<ActionRequest>>,
    baselines: RwLock<HashMap<AgentId, AgentBaseline>>,
    permissions: RwLock<HashMap<AgentId, AgentPermission>>,
    audits: RwLock<Vec<AuditEntry>>,
    violations: RwLock<Vec<ViolationRecord>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(which: &str) -> StorageError {
    StorageError::Backend(format!("{which} lock poisoned"))
}

fn page<T: Clone>(items: &[T], window: QueryWindow) -> Vec<T> {
    items
        .iter()
        .rev()
        .skip(window.offset)
        .take(window.limit)
        .cloned()
        .collect()
}

#[async_trait]
impl RequestStore for InMemoryStorage {
    async fn create_request(&self, request: ActionRequest) -> StorageResult<()> {
        let mut guard = self.requests.write().map_err(|_| poisoned("requests"))?;
        if guard.iter().any(|r| r.id == request.id) {
            return Err(StorageError::Conflict(format!(
                "request {} already exists",
                request.id
            )));
        }
        guard.push(request);
        Ok(())
    }

    async fn get_request(&self, id: &RequestId) -> StorageResult<Option<ActionRequest>> {
        let guard = self.requests.read().map_err(|_| poisoned("requests"))?;
        Ok(guard.iter().find(|r| &r.id == id).cloned())
    }

    async fn list_requests(&self, window: QueryWindow) -> StorageResult<Vec<ActionRequest>> {
        let guard = self.requests.read().map_err(|_| poisoned("requests"))?;
        Ok(page(&guard, window))
    }
}

#[async_trait]
impl BaselineStore for InMemoryStorage {
    async fn upsert_baseline(&self, baseline: AgentBaseline) -> StorageResult<()> {
        let mut guard = self.baselines.write().map_err(|_| poisoned("baselines"))?;
        guard.insert(baseline.agent_id.clone(), baseline);
        Ok(())
    }

    async fn get_baseline(&self, agent_id: &AgentId) -> StorageResult<Option<AgentBaseline>> {
        let guard = self.baselines.read().map_err(|_| poisoned("baselines"))?;
        Ok(guard.get(agent_id).cloned())
    }
}

#[async_trait]
impl PermissionStore for InMemoryStorage {
    async fn upsert_permission(&self, permission: AgentPermission) -> StorageResult<()> {
        let mut guard = self
            .permissions
            .write()
            .map_err(|_| poisoned("permissions"))?;
        guard.insert(permission.agent_id.clone(), permission);
        Ok(())
    }

    async fn get_permission(
        &self,
        agent_id: &AgentId,
    ) -> StorageResult<Option<AgentPermission>> {
        let guard = self
            .permissions
            .read()
            .map_err(|_| poisoned("permissions"))?;
        Ok(guard.get(agent_id).cloned())
    }

    async fn list_permissions(&self) -> StorageResult<Vec<AgentPermission>> {
        let guard = self
            .permissions
            .read()
            .map_err(|_| poisoned("permissions"))?;
        let mut all: Vec<_> = guard.values().cloned().collect();
        all.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(all)
    }
}

#[async_trait]
impl AuditStore for InMemoryStorage {
    async fn append_audit(&self, entry: AuditEntry) -> StorageResult<AuditEntry> {
        let mut guard = self.audits.write().map_err(|_| poisoned("audits"))?;
        if guard.iter().any(|e| e.id == entry.id) {
            return Err(StorageError::Conflict(format!(
                "audit entry {} already exists",
                entry.id
            )));
        }
        guard.push(entry.clone());
        Ok(entry)
    }

    async fn list_audit(&self, window: QueryWindow) -> StorageResult<Vec<AuditEntry>> {
        let guard = self.audits.read().map_err(|_| poisoned("audits"))?;
        Ok(page(&guard, window))
    }
}

#[async_trait]
impl ViolationStore for InMemoryStorage {
    async fn append_violation(&self, record: ViolationRecord) -> StorageResult<()> {
        let mut guard = self.violations.write().map_err(|_| poisoned("violations"))?;
        guard.push(record);
        Ok(())
    }

    async fn list_violations_for_request(
        &self,
        request_id: &RequestId,
    ) -> StorageResult<Vec<ViolationRecord>> {
        let guard = self.violations.read().map_err(|_| poisoned("violations"))?;
        Ok(guard
            .iter()
            .filter(|v| &v.request_id == request_id)
            .cloned()
            .collect())
    }
}
