use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use warden_oracle::{AnalysisEnvelope, Oracle, OraclePayload};
use warden_rules::RuleSet;
use warden_types::{AnalysisJudgment, JudgmentOrigin, Violation};

use crate::error::PipelineError;
use crate::stage::{PipelineStage, Stage};
use crate::state::PipelineState;
use crate::stages::oracle_envelope;

/// Analysis stage: concrete violations and policy breaches.
///
/// Merges two sources: the oracle's judgment and the deterministic rule
/// engine. Rule matches are always applied, even when the oracle falls
/// back, so deterministic findings cannot be lost to oracle failure.
pub struct AnalyzeStage {
    oracle: Arc<dyn Oracle>,
    rules: Arc<RuleSet>,
    timeout: Duration,
}

impl AnalyzeStage {
    pub fn new(oracle: Arc<dyn Oracle>, rules: Arc<RuleSet>, timeout: Duration) -> Self {
        Self {
            oracle,
            rules,
            timeout,
        }
    }

    fn payload(state: &PipelineState) -> OraclePayload {
        let monitor_summary = state
            .monitor
            .as_ref()
            .map(|m| m.intent_summary.clone())
            .unwrap_or_default();

        OraclePayload::new(format!(
            "Agent {} requests: {}. Monitoring summary: {}. Report any policy \
             violations with evidence, and name breached policies.",
            state.request.agent_id,
            state.request.content(),
            monitor_summary,
        ))
        .with_system("analyze")
    }

    /// Deterministic findings: one violation per matched rule.
    fn rule_violations(&self, state: &PipelineState) -> Vec<Violation> {
        self.rules
            .matches(&state.request.content())
            .into_iter()
            .map(|m| Violation {
                kind: format!("rule:{}", m.rule_id),
                description: m.rule_name,
                evidence: m.matched_patterns,
            })
            .collect()
    }
}

#[async_trait]
impl PipelineStage for AnalyzeStage {
    fn stage(&self) -> Stage {
        Stage::Analyze
    }

    async fn execute(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let payload = Self::payload(state);
        let oracle_result = oracle_envelope::<AnalysisEnvelope>(
            self.oracle.as_ref(),
            self.timeout,
            payload,
        )
        .await;

        let mut violations = self.rule_violations(state);

        let (policy_breaches, origin) = match oracle_result {
            Some((envelope, origin)) => {
                violations.extend(envelope.violations.into_iter().map(|v| Violation {
                    kind: v.kind,
                    description: v.description,
                    evidence: v.evidence,
                }));
                (envelope.policy_breaches, origin)
            }
            None => (Vec::new(), JudgmentOrigin::Fallback),
        };

        state.analysis = Some(AnalysisJudgment {
            violations,
            policy_breaches,
            origin,
        });
        Ok(())
    }
}
