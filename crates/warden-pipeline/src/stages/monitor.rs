use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use warden_oracle::{MonitorEnvelope, Oracle, OraclePayload};
use warden_types::{JudgmentOrigin, MonitorJudgment};

use crate::error::PipelineError;
use crate::stage::{PipelineStage, Stage};
use crate::state::PipelineState;
use crate::stages::oracle_envelope;

/// Monitoring stage: what does this request appear to be doing?
pub struct MonitorStage {
    oracle: Arc<dyn Oracle>,
    timeout: Duration,
}

impl MonitorStage {
    pub fn new(oracle: Arc<dyn Oracle>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    fn payload(state: &PipelineState) -> OraclePayload {
        OraclePayload::new(format!(
            "Agent {} requests: {}. Summarize the apparent intent, list data the \
             request would access, and list any risk indicators.",
            state.request.agent_id,
            state.request.content(),
        ))
        .with_system("monitor")
    }

    fn fallback() -> MonitorJudgment {
        MonitorJudgment {
            intent_summary: "intent could not be assessed; treating as requiring review".into(),
            data_access: Vec::new(),
            risk_indicators: vec!["oracle judgment unavailable".into()],
            origin: JudgmentOrigin::Fallback,
        }
    }
}

#[async_trait]
impl PipelineStage for MonitorStage {
    fn stage(&self) -> Stage {
        Stage::Monitor
    }

    async fn execute(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let payload = Self::payload(state);
        let judgment = match oracle_envelope::<MonitorEnvelope>(
            self.oracle.as_ref(),
            self.timeout,
            payload,
        )
        .await
        {
            Some((envelope, origin)) => MonitorJudgment {
                intent_summary: envelope.intent_summary,
                data_access: envelope.data_access,
                risk_indicators: envelope.risk_indicators,
                origin,
            },
            None => Self::fallback(),
        };

        state.monitor = Some(judgment);
        Ok(())
    }
}
