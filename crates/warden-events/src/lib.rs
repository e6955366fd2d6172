//! Governance event notifications.
//!
//! The pipeline emits these as informational side effects: dashboards and
//! operational tooling subscribe, but delivery is strictly fire-and-forget.
//! A lagging, closed, or absent receiver never fails the pipeline.

#![deny(unsafe_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use warden_types::{AgentId, RequestId, Verdict};

/// Something the governance core wants the outside world to know.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GovernanceEvent {
    RequestReceived {
        request_id: RequestId,
        agent_id: AgentId,
        action: String,
    },
    RequestProcessed {
        request_id: RequestId,
        agent_id: AgentId,
        decision: Verdict,
    },
    ViolationDetected {
        request_id: RequestId,
        agent_id: AgentId,
        #[serde(rename = "violation_kind")]
        kind: String,
    },
    KillSwitchTriggered {
        agent_id: AgentId,
        reason: String,
    },
    AgentRestored {
        agent_id: AgentId,
        reason: String,
    },
}

/// A timestamped event as delivered to subscribers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event: GovernanceEvent,
    pub emitted_at: DateTime<Utc>,
}

/// Sink for governance events.
pub trait EventNotifier: Send + Sync {
    /// Emit an event. Must never block meaningfully and never fail the caller.
    fn notify(&self, event: GovernanceEvent);
}

/// Notifier that drops everything. Default for tests and minimal wiring.
pub struct NullNotifier;

impl EventNotifier for NullNotifier {
    fn notify(&self, _event: GovernanceEvent) {}
}

/// Broadcast-backed notifier.
///
/// Wraps a `tokio::sync::broadcast` channel; subscribers that fall behind
/// lose old events (the channel's lagging semantics), which is acceptable
/// for informational traffic.
pub struct BroadcastNotifier {
    sender: broadcast::Sender<EventEnvelope>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventNotifier for BroadcastNotifier {
    fn notify(&self, event: GovernanceEvent) {
        let envelope = EventEnvelope {
            event,
            emitted_at: Utc::now(),
        };
        // A send error only means there are no subscribers right now.
        if self.sender.send(envelope).is_err() {
            debug!("governance event dropped: no subscribers");
        }
    }
}
