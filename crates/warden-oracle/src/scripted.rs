//! Deterministic oracle stub for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{Oracle, OracleError, OraclePayload, OracleReply};

/// An oracle that replays canned raw replies.
///
/// `sequence` pops replies in order and errors when exhausted; `always`
/// repeats one reply forever. Both are deterministic, which is the point:
/// orchestrator and threshold tests run against known judgments.
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<String>>,
    repeated: Option<String>,
}

impl ScriptedOracle {
    /// Replay `replies` in order; a call past the end is `Exhausted`.
    pub fn sequence(replies: Vec<impl Into<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            repeated: None,
        }
    }

    /// Repeat the same raw reply for every call.
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            repeated: Some(reply.into()),
        }
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn judge(&self, _payload: &OraclePayload) -> Result<OracleReply, OracleError> {
        if let Some(raw) = &self.repeated {
            return Ok(OracleReply {
                raw_text: raw.clone(),
            });
        }

        let mut replies = self
            .replies
            .lock()
            .map_err(|_| OracleError::Transport("scripted replies lock poisoned".into()))?;

        match replies.pop_front() {
            Some(raw) => Ok(OracleReply { raw_text: raw }),
            None => Err(OracleError::Exhausted),
        }
    }
}

/// An oracle that always fails at the transport layer, for fallback tests.
pub struct FailingOracle;

#[async_trait]
impl Oracle for FailingOracle {
    async fn judge(&self, _payload: &OraclePayload) -> Result<OracleReply, OracleError> {
        Err(OracleError::Transport("unreachable reasoning service".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequence_pops_in_order_then_exhausts() {
        let oracle = ScriptedOracle::sequence(vec!["one", "two"]);
        let payload = OraclePayload::new("probe");

        assert_eq!(oracle.judge(&payload).await.unwrap().raw_text, "one");
        assert_eq!(oracle.judge(&payload).await.unwrap().raw_text, "two");
        assert!(matches!(
            oracle.judge(&payload).await,
            Err(OracleError::Exhausted)
        ));
    }

    #[tokio::test]
    async fn always_repeats() {
        let oracle = ScriptedOracle::always("{\"ok\": true}");
        let payload = OraclePayload::new("probe");
        for _ in 0..3 {
            assert_eq!(
                oracle.judge(&payload).await.unwrap().raw_text,
                "{\"ok\": true}"
            );
        }
    }
}
