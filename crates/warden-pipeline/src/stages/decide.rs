use async_trait::async_trait;
use tracing::info;

use crate::decision::{DecisionEngine, DecisionThresholds};
use crate::error::PipelineError;
use crate::stage::{PipelineStage, Stage};
use crate::state::PipelineState;

/// Decision stage: the only writer of the terminal verdict.
pub struct DecideStage {
    thresholds: DecisionThresholds,
}

impl DecideStage {
    pub fn new(thresholds: DecisionThresholds) -> Self {
        Self { thresholds }
    }
}

#[async_trait]
impl PipelineStage for DecideStage {
    fn stage(&self) -> Stage {
        Stage::Decide
    }

    async fn execute(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let upstream = state
            .severity
            .as_ref()
            .map(|s| s.reasoning.clone())
            .unwrap_or_else(|| "no classification available".to_string());

        let (verdict, reasoning) = DecisionEngine::decide(
            &self.thresholds,
            state.risk_score(),
            state.classified_severity(),
            state.violation_count(),
            &upstream,
        );

        info!(
            request = %state.request.id,
            verdict = %verdict,
            risk_score = state.risk_score(),
            "verdict rendered"
        );

        state.set_decision(verdict, reasoning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_types::{
        ActionRequest, JudgmentOrigin, Severity, SeverityJudgment, Verdict,
    };

    fn state_with_severity(severity: Severity, risk: u8) -> PipelineState {
        let request = ActionRequest::builder("a1", "read_file", "/tmp/x")
            .build()
            .unwrap();
        let mut s = PipelineState::new(request, 0);
        s.severity = Some(SeverityJudgment {
            severity,
            risk_score: risk,
            reasoning: "test classification".into(),
            risk_factors: vec![],
            triggered_rules: vec![],
            recommended: Verdict::Flag,
            origin: JudgmentOrigin::Validated,
        });
        s
    }

    #[tokio::test]
    async fn sets_decision_from_classification() {
        let stage = DecideStage::new(DecisionThresholds::default());
        let mut s = state_with_severity(Severity::Low, 10);

        stage.execute(&mut s).await.unwrap();

        assert_eq!(s.decision(), Some(Verdict::Approve));
        assert!(s
            .decision_reasoning()
            .unwrap()
            .contains("test classification"));
    }

    #[tokio::test]
    async fn second_decide_fails() {
        let stage = DecideStage::new(DecisionThresholds::default());
        let mut s = state_with_severity(Severity::Low, 10);

        stage.execute(&mut s).await.unwrap();
        let err = stage.execute(&mut s).await;
        assert!(matches!(err, Err(PipelineError::DecisionAlreadySet(_))));
    }
}
