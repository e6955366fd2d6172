//! Persistence seams for the Warden core.
//!
//! The core does not assume any particular storage technology; it only
//! requires read-your-writes per key and per-agent update serialization.
//! Traits here are the contract, [`memory::InMemoryStorage`] is the
//! deterministic reference implementation used by tests and default wiring.
//! Production deployments should use a transactional backend.

#![deny(unsafe_code)]

pub mod error;
pub mod memory;
pub mod model;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStorage;
pub use model::{
    AgentBaseline, AgentPermission, AuditEntry, AuditTrigger, PermissionState, ViolationRecord,
};
pub use traits::{
    AuditStore, BaselineStore, PermissionStore, QueryWindow, RequestStore, ViolationStore,
    WardenStorage,
};
