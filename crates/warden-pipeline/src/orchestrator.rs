use std::sync::Arc;

use tracing::{debug, info};

use warden_oracle::Oracle;
use warden_rules::RuleSet;
use warden_types::ActionRequest;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::stage::{PipelineStage, Stage};
use crate::stages::{AnalyzeStage, ClassifyStage, DecideStage, MonitorStage, RemediateStage};
use crate::state::PipelineState;

/// The staged assessment pipeline.
///
/// Holds the stage implementations and drives the explicit state machine in
/// [`Stage::next`]. Each call to [`Pipeline::run`] owns its state exclusively;
/// concurrent runs share nothing through the pipeline itself.
pub struct Pipeline {
    config: PipelineConfig,
    stages: Vec<Box<dyn PipelineStage>>,
}

impl Pipeline {
    /// Assemble the standard stage set over an oracle and a rule set.
    pub fn new(config: PipelineConfig, oracle: Arc<dyn Oracle>, rules: Arc<RuleSet>) -> Self {
        let timeout = config.oracle_timeout;
        let stages: Vec<Box<dyn PipelineStage>> = vec![
            Box::new(MonitorStage::new(oracle.clone(), timeout)),
            Box::new(AnalyzeStage::new(oracle.clone(), rules.clone(), timeout)),
            Box::new(ClassifyStage::new(oracle.clone(), rules, timeout)),
            Box::new(RemediateStage::new(oracle, timeout)),
            Box::new(DecideStage::new(config.thresholds)),
        ];
        Self { config, stages }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run a request through the state machine to `Terminal`.
    ///
    /// The anomaly score is computed by the caller before stage execution.
    /// Always reaches a verdict: stage-level oracle failures degrade to
    /// fallback judgments rather than aborting the run.
    pub async fn run(
        &self,
        request: ActionRequest,
        anomaly_score: u8,
    ) -> Result<PipelineState, PipelineError> {
        info!(request = %request.id, agent = %request.agent_id, "pipeline run starting");

        let mut state = PipelineState::new(request, anomaly_score);
        let mut current = Stage::Orchestrate;

        while current != Stage::Terminal {
            state.record_stage(current.name());

            if let Some(stage) = self.stage_for(current) {
                debug!(stage = current.name(), "executing stage");
                stage.execute(&mut state).await?;
            }

            current = current.next(&state, &self.config);
        }

        if state.decision().is_none() {
            return Err(PipelineError::MissingDecision);
        }

        info!(
            request = %state.request.id,
            path = ?state.processing_path(),
            "pipeline run complete"
        );
        Ok(state)
    }

    fn stage_for(&self, stage: Stage) -> Option<&dyn PipelineStage> {
        self.stages
            .iter()
            .find(|s| s.stage() == stage)
            .map(|s| s.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_oracle::{FailingOracle, HeuristicOracle, ScriptedOracle};
    use warden_types::{JudgmentOrigin, Verdict};

    fn request(target: &str) -> ActionRequest {
        ActionRequest::builder("a1", "read_file", target)
            .build()
            .unwrap()
    }

    fn pipeline(oracle: Arc<dyn Oracle>) -> Pipeline {
        Pipeline::new(
            PipelineConfig::default(),
            oracle,
            Arc::new(RuleSet::builtin()),
        )
    }

    #[tokio::test]
    async fn benign_run_skips_remediation_and_approves() {
        let oracle = Arc::new(ScriptedOracle::sequence(vec![
            r#"{"intent_summary": "reads project docs"}"#,
            r#"{"violations": [], "policy_breaches": []}"#,
            r#"{"severity": "LOW", "risk_score": 10, "reasoning": "benign read"}"#,
        ]));
        let state = pipeline(oracle)
            .run(request("./README.md"), 0)
            .await
            .unwrap();

        assert_eq!(state.decision(), Some(Verdict::Approve));
        assert_eq!(
            state.processing_path(),
            &["orchestrate", "monitor", "analyze", "classify", "decide"]
        );
        assert!(state.remediation.is_none());
    }

    #[tokio::test]
    async fn sensitive_file_run_remediates_and_kills() {
        let state = pipeline(Arc::new(HeuristicOracle::new()))
            .run(request("/etc/passwd"), 0)
            .await
            .unwrap();

        assert_eq!(state.decision(), Some(Verdict::Kill));
        assert_eq!(
            state.processing_path(),
            &[
                "orchestrate",
                "monitor",
                "analyze",
                "classify",
                "remediate",
                "decide"
            ]
        );
        let severity = state.severity.as_ref().unwrap();
        assert!(severity
            .triggered_rules
            .iter()
            .any(|r| r.as_str() == "sys-001"));
        assert!(state.remediation.is_some());
    }

    #[tokio::test]
    async fn oracle_outage_still_terminates_with_flag() {
        // Every stage falls back; conservative classification (HIGH/75)
        // lands in the flag band and the run still reaches a verdict.
        let state = pipeline(Arc::new(FailingOracle))
            .run(request("./README.md"), 0)
            .await
            .unwrap();

        assert_eq!(state.decision(), Some(Verdict::Flag));
        assert!(!state.processing_path().is_empty());
        assert_eq!(
            state.severity.as_ref().unwrap().origin,
            JudgmentOrigin::Fallback
        );
        // High fallback severity forces the remediation branch.
        assert!(state.remediation.is_some());
    }

    #[tokio::test]
    async fn fast_path_when_enabled_goes_straight_to_decide() {
        let mut config = PipelineConfig::default();
        config.enable_fast_path = true;

        let pipeline = Pipeline::new(
            config,
            Arc::new(FailingOracle),
            Arc::new(RuleSet::builtin()),
        );
        let state = pipeline.run(request("./README.md"), 45).await.unwrap();

        // Routing only: monitoring, analysis and classification are bypassed.
        assert_eq!(state.processing_path(), &["orchestrate", "decide"]);
        assert!(state.monitor.is_none());
        assert!(state.decision().is_some());
    }

    #[tokio::test]
    async fn decision_is_set_exactly_once() {
        let state = pipeline(Arc::new(HeuristicOracle::new()))
            .run(request("./README.md"), 0)
            .await
            .unwrap();
        assert!(state.decision().is_some());
        assert!(state.decision_reasoning().is_some());
    }
}
