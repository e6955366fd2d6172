use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use warden_types::Severity;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::state::PipelineState;

/// States of the governance pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Orchestrate,
    Monitor,
    Analyze,
    Classify,
    Remediate,
    Decide,
    Terminal,
}

impl Stage {
    /// Stable stage name used in the processing path.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Orchestrate => "orchestrate",
            Stage::Monitor => "monitor",
            Stage::Analyze => "analyze",
            Stage::Classify => "classify",
            Stage::Remediate => "remediate",
            Stage::Decide => "decide",
            Stage::Terminal => "terminal",
        }
    }

    /// The explicit transition table.
    ///
    /// Deterministic given the current state: the only branch points are the
    /// reserved orchestration fast-path (disabled by default) and the
    /// remediation skip for clean, low-severity requests.
    pub fn next(self, state: &PipelineState, config: &PipelineConfig) -> Stage {
        match self {
            Stage::Orchestrate => {
                // Reserved routing option: an extreme behavioral anomaly can
                // bypass monitoring straight to decision. Disabled in the
                // current policy.
                if config.enable_fast_path && state.anomaly_score >= 40 {
                    Stage::Decide
                } else {
                    Stage::Monitor
                }
            }
            Stage::Monitor => Stage::Analyze,
            Stage::Analyze => Stage::Classify,
            Stage::Classify => {
                if state.violation_count() > 0 || state.classified_severity() != Severity::Low {
                    Stage::Remediate
                } else {
                    Stage::Decide
                }
            }
            Stage::Remediate => Stage::Decide,
            Stage::Decide => Stage::Terminal,
            Stage::Terminal => Stage::Terminal,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One executable stage of the pipeline.
///
/// `execute` merges results into the state and must not abort the run on
/// oracle failure; degraded judgments take the fallback path instead.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    fn stage(&self) -> Stage;

    async fn execute(&self, state: &mut PipelineState) -> Result<(), PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_types::{
        ActionRequest, AnalysisJudgment, JudgmentOrigin, SeverityJudgment, Verdict, Violation,
    };

    fn state(anomaly: u8) -> PipelineState {
        let request = ActionRequest::builder("a1", "read_file", "/tmp/x")
            .build()
            .unwrap();
        PipelineState::new(request, anomaly)
    }

    fn severity_judgment(severity: Severity) -> SeverityJudgment {
        SeverityJudgment {
            severity,
            risk_score: 10,
            reasoning: String::new(),
            risk_factors: vec![],
            triggered_rules: vec![],
            recommended: Verdict::Approve,
            origin: JudgmentOrigin::Validated,
        }
    }

    #[test]
    fn default_route_is_the_full_chain() {
        let config = PipelineConfig::default();
        let s = state(0);

        assert_eq!(Stage::Orchestrate.next(&s, &config), Stage::Monitor);
        assert_eq!(Stage::Monitor.next(&s, &config), Stage::Analyze);
        assert_eq!(Stage::Analyze.next(&s, &config), Stage::Classify);
        assert_eq!(Stage::Remediate.next(&s, &config), Stage::Decide);
        assert_eq!(Stage::Decide.next(&s, &config), Stage::Terminal);
    }

    #[test]
    fn fast_path_stays_disabled_by_default() {
        let config = PipelineConfig::default();
        let s = state(50);
        assert_eq!(Stage::Orchestrate.next(&s, &config), Stage::Monitor);
    }

    #[test]
    fn fast_path_routes_to_decide_when_enabled() {
        let mut config = PipelineConfig::default();
        config.enable_fast_path = true;

        let hot = state(45);
        assert_eq!(Stage::Orchestrate.next(&hot, &config), Stage::Decide);

        let calm = state(10);
        assert_eq!(Stage::Orchestrate.next(&calm, &config), Stage::Monitor);
    }

    #[test]
    fn classify_skips_remediation_only_when_clean_and_low() {
        let config = PipelineConfig::default();

        let mut clean = state(0);
        clean.severity = Some(severity_judgment(Severity::Low));
        assert_eq!(Stage::Classify.next(&clean, &config), Stage::Decide);

        let mut elevated = state(0);
        elevated.severity = Some(severity_judgment(Severity::Medium));
        assert_eq!(Stage::Classify.next(&elevated, &config), Stage::Remediate);

        let mut violating = state(0);
        violating.severity = Some(severity_judgment(Severity::Low));
        violating.analysis = Some(AnalysisJudgment {
            violations: vec![Violation {
                kind: "x".into(),
                description: "y".into(),
                evidence: vec![],
            }],
            policy_breaches: vec![],
            origin: JudgmentOrigin::Validated,
        });
        assert_eq!(Stage::Classify.next(&violating, &config), Stage::Remediate);
    }

    #[test]
    fn terminal_is_absorbing() {
        let config = PipelineConfig::default();
        let s = state(0);
        assert_eq!(Stage::Terminal.next(&s, &config), Stage::Terminal);
    }
}
