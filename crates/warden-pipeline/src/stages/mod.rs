//! Stage implementations.
//!
//! Each stage builds a prompt-shaped payload, consults the oracle under a
//! deadline, parses the reply through the repair ladder, and merges the
//! result into the pipeline state, substituting its conservative fallback
//! whenever the oracle fails, times out, or returns something unparseable.

pub mod analyze;
pub mod classify;
pub mod decide;
pub mod monitor;
pub mod remediate;

pub use analyze::AnalyzeStage;
pub use classify::ClassifyStage;
pub use decide::DecideStage;
pub use monitor::MonitorStage;
pub use remediate::RemediateStage;

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::warn;

use warden_oracle::{parse_reply, Oracle, OraclePayload, ParseMode};
use warden_types::JudgmentOrigin;

/// Consult the oracle and extract a typed envelope.
///
/// Any failure (transport, timeout, or an unparseable reply) yields `None`
/// so the calling stage applies its fallback judgment; the pipeline run
/// itself never aborts here.
pub(crate) async fn oracle_envelope<T: DeserializeOwned>(
    oracle: &dyn Oracle,
    timeout: Duration,
    payload: OraclePayload,
) -> Option<(T, JudgmentOrigin)> {
    let stage = payload.system.clone().unwrap_or_default();

    let reply = match tokio::time::timeout(timeout, oracle.judge(&payload)).await {
        Ok(Ok(reply)) => reply,
        Ok(Err(err)) => {
            warn!(stage = %stage, error = %err, "oracle call failed; using fallback");
            return None;
        }
        Err(_) => {
            warn!(stage = %stage, "oracle call timed out; using fallback");
            return None;
        }
    };

    match parse_reply::<T>(&reply.raw_text) {
        Some(parsed) => {
            let origin = match parsed.mode {
                ParseMode::Strict => JudgmentOrigin::Validated,
                ParseMode::Repaired => JudgmentOrigin::Repaired,
            };
            Some((parsed.value, origin))
        }
        None => {
            warn!(stage = %stage, "oracle reply unparseable; using fallback");
            None
        }
    }
}
