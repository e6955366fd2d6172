use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{AgentId, RequestId};

/// Validation failures for an incoming request.
///
/// A request failing validation never enters the pipeline and never appears
/// in the audit trail as a processed request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestValidationError {
    #[error("action must not be empty")]
    EmptyAction,

    #[error("target must not be empty")]
    EmptyTarget,

    #[error("agent id must not be empty")]
    EmptyAgent,
}

/// An action requested by an autonomous agent: "agent X wants to do Y to Z".
///
/// Immutable once accepted. Construct through [`ActionRequest::builder`],
/// whose `build()` enforces the non-empty invariants.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionRequest {
    pub id: RequestId,
    /// Who is asking.
    pub agent_id: AgentId,
    /// Action verb, e.g. `read_file`, `execute_command`.
    pub action: String,
    /// Target resource string, e.g. a path or URL.
    pub target: String,
    /// Optional free-text context supplied by the agent.
    pub context: Option<String>,
    /// Optional key/value metadata.
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl ActionRequest {
    /// Create a builder for ergonomic construction.
    pub fn builder(
        agent_id: impl Into<AgentId>,
        action: impl Into<String>,
        target: impl Into<String>,
    ) -> ActionRequestBuilder {
        ActionRequestBuilder {
            agent_id: agent_id.into(),
            action: action.into(),
            target: target.into(),
            context: None,
            metadata: HashMap::new(),
        }
    }

    /// The content the rule engine and oracle stages inspect: action, target
    /// and any free-text context, joined into one searchable string.
    pub fn content(&self) -> String {
        match &self.context {
            Some(ctx) => format!("{} {} {}", self.action, self.target, ctx),
            None => format!("{} {}", self.action, self.target),
        }
    }
}

/// Builder for [`ActionRequest`].
pub struct ActionRequestBuilder {
    agent_id: AgentId,
    action: String,
    target: String,
    context: Option<String>,
    metadata: HashMap<String, String>,
}

impl ActionRequestBuilder {
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Validate and construct the immutable request.
    pub fn build(self) -> Result<ActionRequest, RequestValidationError> {
        if self.agent_id.as_str().trim().is_empty() {
            return Err(RequestValidationError::EmptyAgent);
        }
        if self.action.trim().is_empty() {
            return Err(RequestValidationError::EmptyAction);
        }
        if self.target.trim().is_empty() {
            return Err(RequestValidationError::EmptyTarget);
        }

        Ok(ActionRequest {
            id: RequestId::new(),
            agent_id: self.agent_id,
            action: self.action,
            target: self.target,
            context: self.context,
            metadata: self.metadata,
            created_at: Utc::now(),
        })
    }
}
