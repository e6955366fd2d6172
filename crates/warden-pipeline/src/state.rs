use serde::{Deserialize, Serialize};

use warden_types::{
    ActionRequest, AnalysisJudgment, MonitorJudgment, RemediationJudgment, Severity,
    SeverityJudgment, Verdict,
};

use crate::error::PipelineError;

/// Mutable accumulator threaded through the orchestrator.
///
/// One instance per in-flight request, owned exclusively by the pipeline run
/// processing that request and never shared across concurrent requests.
/// Fields populate progressively as stages execute.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineState {
    pub request: ActionRequest,
    /// Behavioral anomaly score (0–50), computed before stage execution.
    pub anomaly_score: u8,
    pub monitor: Option<MonitorJudgment>,
    pub analysis: Option<AnalysisJudgment>,
    pub severity: Option<SeverityJudgment>,
    pub remediation: Option<RemediationJudgment>,
    decision: Option<Verdict>,
    decision_reasoning: Option<String>,
    /// Ordered names of executed stages. Append-only.
    processing_path: Vec<String>,
}

impl PipelineState {
    pub fn new(request: ActionRequest, anomaly_score: u8) -> Self {
        Self {
            request,
            anomaly_score,
            monitor: None,
            analysis: None,
            severity: None,
            remediation: None,
            decision: None,
            decision_reasoning: None,
            processing_path: Vec::new(),
        }
    }

    /// Append an executed stage to the audit path.
    pub(crate) fn record_stage(&mut self, name: &str) {
        self.processing_path.push(name.to_string());
    }

    /// Set the terminal decision. Callable exactly once, by the decision
    /// engine only.
    pub(crate) fn set_decision(
        &mut self,
        decision: Verdict,
        reasoning: String,
    ) -> Result<(), PipelineError> {
        if self.decision.is_some() {
            return Err(PipelineError::DecisionAlreadySet(
                self.request.id.to_string(),
            ));
        }
        self.decision = Some(decision);
        self.decision_reasoning = Some(reasoning);
        Ok(())
    }

    pub fn decision(&self) -> Option<Verdict> {
        self.decision
    }

    pub fn decision_reasoning(&self) -> Option<&str> {
        self.decision_reasoning.as_deref()
    }

    pub fn processing_path(&self) -> &[String] {
        &self.processing_path
    }

    /// Number of violations found so far (zero before analysis).
    pub fn violation_count(&self) -> usize {
        self.analysis.as_ref().map_or(0, |a| a.violations.len())
    }

    /// Classified severity, `Low` until classification runs.
    pub fn classified_severity(&self) -> Severity {
        self.severity.as_ref().map_or(Severity::Low, |s| s.severity)
    }

    /// Blended risk score, 0 until classification runs.
    pub fn risk_score(&self) -> u8 {
        self.severity.as_ref().map_or(0, |s| s.risk_score)
    }
}
