use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use warden_oracle::{Oracle, OraclePayload, RemediationEnvelope};
use warden_types::{
    JudgmentOrigin, RemediationJudgment, RemediationSuggestion, SanitizedRequest,
};

use crate::error::PipelineError;
use crate::stage::{PipelineStage, Stage};
use crate::state::PipelineState;
use crate::stages::oracle_envelope;

/// Remediation stage: ranked fixes and an optional sanitized request.
///
/// Only reached when analysis found violations or classification rose above
/// LOW severity.
pub struct RemediateStage {
    oracle: Arc<dyn Oracle>,
    timeout: Duration,
}

impl RemediateStage {
    pub fn new(oracle: Arc<dyn Oracle>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    fn payload(state: &PipelineState) -> OraclePayload {
        OraclePayload::new(format!(
            "Agent {} requests: {}. Severity: {}. Violations: {}. Propose ranked \
             remediations and, if possible, a sanitized version of the request.",
            state.request.agent_id,
            state.request.content(),
            state.classified_severity(),
            state.violation_count(),
        ))
        .with_system("remediate")
    }

    fn fallback() -> RemediationJudgment {
        RemediationJudgment {
            suggestions: vec![RemediationSuggestion {
                rank: 1,
                description: "route the request to human review; automated remediation \
                              unavailable"
                    .into(),
            }],
            sanitized: None,
            origin: JudgmentOrigin::Fallback,
        }
    }
}

#[async_trait]
impl PipelineStage for RemediateStage {
    fn stage(&self) -> Stage {
        Stage::Remediate
    }

    async fn execute(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let payload = Self::payload(state);
        let judgment = match oracle_envelope::<RemediationEnvelope>(
            self.oracle.as_ref(),
            self.timeout,
            payload,
        )
        .await
        {
            Some((envelope, origin)) => {
                let suggestions = envelope
                    .suggestions
                    .into_iter()
                    .enumerate()
                    .map(|(idx, s)| RemediationSuggestion {
                        // Positional rank when the oracle omitted one.
                        rank: s.rank.unwrap_or(idx as u8 + 1),
                        description: s.description,
                    })
                    .collect();

                let sanitized = match (envelope.sanitized_action, envelope.sanitized_target) {
                    (Some(action), Some(target)) => Some(SanitizedRequest {
                        action,
                        target,
                        rationale: envelope.sanitized_rationale.unwrap_or_default(),
                    }),
                    _ => None,
                };

                RemediationJudgment {
                    suggestions,
                    sanitized,
                    origin,
                }
            }
            None => Self::fallback(),
        };

        state.remediation = Some(judgment);
        Ok(())
    }
}
