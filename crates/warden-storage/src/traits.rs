use async_trait::async_trait;

use warden_types::{ActionRequest, AgentId, RequestId};

use crate::model::{AgentBaseline, AgentPermission, AuditEntry, ViolationRecord};
use crate::StorageResult;

/// Generic query window for paged reads.
#[derive(Debug, Clone, Copy)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

impl Default for QueryWindow {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
        }
    }
}

/// Storage interface for accepted requests.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Insert an accepted request. Request ids are unique; a duplicate id is
    /// a conflict.
    async fn create_request(&self, request: ActionRequest) -> StorageResult<()>;

    async fn get_request(&self, id: &RequestId) -> StorageResult<Option<ActionRequest>>;

    /// List requests newest-first.
    async fn list_requests(&self, window: QueryWindow) -> StorageResult<Vec<ActionRequest>>;
}

/// Storage interface for per-agent behavioral baselines.
///
/// Callers are responsible for serializing read-modify-write cycles per
/// agent; the store only guarantees read-your-writes per key.
#[async_trait]
pub trait BaselineStore: Send + Sync {
    async fn upsert_baseline(&self, baseline: AgentBaseline) -> StorageResult<()>;

    async fn get_baseline(&self, agent_id: &AgentId) -> StorageResult<Option<AgentBaseline>>;
}

/// Storage interface for agent permission records.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn upsert_permission(&self, permission: AgentPermission) -> StorageResult<()>;

    async fn get_permission(&self, agent_id: &AgentId)
        -> StorageResult<Option<AgentPermission>>;

    async fn list_permissions(&self) -> StorageResult<Vec<AgentPermission>>;
}

/// Storage interface for append-only audit entries.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append an entry. Entries are write-once; the stored record is returned
    /// unchanged.
    async fn append_audit(&self, entry: AuditEntry) -> StorageResult<AuditEntry>;

    /// Read entries newest-first.
    async fn list_audit(&self, window: QueryWindow) -> StorageResult<Vec<AuditEntry>>;
}

/// Storage interface for derived per-violation records.
#[async_trait]
pub trait ViolationStore: Send + Sync {
    async fn append_violation(&self, record: ViolationRecord) -> StorageResult<()>;

    async fn list_violations_for_request(
        &self,
        request_id: &RequestId,
    ) -> StorageResult<Vec<ViolationRecord>>;
}

/// Unified storage bundle used by the Warden wiring.
pub trait WardenStorage:
    RequestStore + BaselineStore + PermissionStore + AuditStore + ViolationStore + Send + Sync
{
}

impl<T> WardenStorage for T where
    T: RequestStore + BaselineStore + PermissionStore + AuditStore + ViolationStore + Send + Sync
{
}
