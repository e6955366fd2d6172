use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use warden_oracle::{Oracle, OraclePayload, SeverityEnvelope};
use warden_rules::RuleSet;
use warden_types::{JudgmentOrigin, RiskFactor, Severity, SeverityJudgment, Verdict};

use crate::error::PipelineError;
use crate::stage::{PipelineStage, Stage};
use crate::state::PipelineState;
use crate::stages::oracle_envelope;

/// Weight of the oracle's own risk estimate in the blended score.
const WEIGHT_ORACLE: f64 = 0.45;
/// Weight of the strongest matched rule.
const WEIGHT_RULES: f64 = 0.25;
/// Weight of the behavioral anomaly score.
const WEIGHT_ANOMALY: f64 = 0.20;
/// Weight of the violation count.
const WEIGHT_VIOLATIONS: f64 = 0.10;

/// Conservative stand-ins when the oracle judgment is unusable.
const FALLBACK_SEVERITY: Severity = Severity::High;
const FALLBACK_RISK: f64 = 75.0;

/// Classification stage: severity, blended risk score, and rationale.
pub struct ClassifyStage {
    oracle: Arc<dyn Oracle>,
    rules: Arc<RuleSet>,
    timeout: Duration,
}

impl ClassifyStage {
    pub fn new(oracle: Arc<dyn Oracle>, rules: Arc<RuleSet>, timeout: Duration) -> Self {
        Self {
            oracle,
            rules,
            timeout,
        }
    }

    fn payload(state: &PipelineState) -> OraclePayload {
        OraclePayload::new(format!(
            "Agent {} requests: {}. Violations found so far: {}. Assess the \
             severity (LOW/MEDIUM/HIGH/CRITICAL), a 0-100 risk score, and your \
             reasoning.",
            state.request.agent_id,
            state.request.content(),
            state.violation_count(),
        ))
        .with_system("classify")
    }
}

#[async_trait]
impl PipelineStage for ClassifyStage {
    fn stage(&self) -> Stage {
        Stage::Classify
    }

    async fn execute(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let payload = Self::payload(state);
        let oracle_result = oracle_envelope::<SeverityEnvelope>(
            self.oracle.as_ref(),
            self.timeout,
            payload,
        )
        .await;

        let (oracle_severity, oracle_risk, reasoning, recommended, origin) = match oracle_result {
            Some((envelope, origin)) => (
                envelope.severity,
                envelope.risk_score.clamp(0.0, 100.0),
                if envelope.reasoning.is_empty() {
                    "no reasoning provided".to_string()
                } else {
                    envelope.reasoning
                },
                envelope.recommended,
                origin,
            ),
            None => (
                FALLBACK_SEVERITY,
                FALLBACK_RISK,
                "oracle assessment unavailable; conservative classification applied".to_string(),
                None,
                JudgmentOrigin::Fallback,
            ),
        };

        let matches = self.rules.matches(&state.request.content());
        let rule_severity = RuleSet::max_matched_severity(&matches);
        let triggered_rules: Vec<_> = matches.iter().map(|m| m.rule_id.clone()).collect();

        let risk_factors = vec![
            RiskFactor {
                name: "oracle_assessment".into(),
                weight: WEIGHT_ORACLE,
                score: oracle_risk,
            },
            RiskFactor {
                name: "rule_matches".into(),
                weight: WEIGHT_RULES,
                score: rule_severity.map_or(0.0, |s| f64::from(s.risk_weight())),
            },
            RiskFactor {
                name: "behavioral_anomaly".into(),
                weight: WEIGHT_ANOMALY,
                // Anomaly scores run 0-50; rescale to the 0-100 axis.
                score: f64::from(state.anomaly_score) * 2.0,
            },
            RiskFactor {
                name: "violations".into(),
                weight: WEIGHT_VIOLATIONS,
                score: (state.violation_count() as f64 * 25.0).min(100.0),
            },
        ];

        let blended: f64 = risk_factors.iter().map(RiskFactor::contribution).sum();
        let risk_score = blended.round().clamp(0.0, 100.0) as u8;

        // A triggered rule floors the severity: a CRITICAL rule match is
        // CRITICAL no matter how calm the oracle was.
        let severity = match rule_severity {
            Some(rs) => oracle_severity.max(rs),
            None => oracle_severity,
        };

        let recommended = recommended.unwrap_or(match severity {
            Severity::Critical => Verdict::Kill,
            Severity::High | Severity::Medium => Verdict::Flag,
            Severity::Low => Verdict::Approve,
        });

        state.severity = Some(SeverityJudgment {
            severity,
            risk_score,
            reasoning,
            risk_factors,
            triggered_rules,
            recommended,
            origin,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_oracle::{FailingOracle, ScriptedOracle};
    use warden_types::{ActionRequest, AnalysisJudgment};

    fn state(target: &str, anomaly: u8) -> PipelineState {
        let request = ActionRequest::builder("a1", "read_file", target)
            .build()
            .unwrap();
        PipelineState::new(request, anomaly)
    }

    fn stage_with(oracle: Arc<dyn Oracle>) -> ClassifyStage {
        ClassifyStage::new(oracle, Arc::new(RuleSet::builtin()), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn benign_request_scores_low() {
        let oracle = Arc::new(ScriptedOracle::always(
            r#"{"severity": "LOW", "risk_score": 10, "reasoning": "routine read"}"#,
        ));
        let mut s = state("./README.md", 0);

        stage_with(oracle).execute(&mut s).await.unwrap();

        let judgment = s.severity.unwrap();
        assert_eq!(judgment.severity, Severity::Low);
        // 0.45 * 10 and nothing else.
        assert_eq!(judgment.risk_score, 5);
        assert!(judgment.triggered_rules.is_empty());
    }

    #[tokio::test]
    async fn critical_rule_floors_severity() {
        // Oracle is suspiciously calm about a sensitive system file.
        let oracle = Arc::new(ScriptedOracle::always(
            r#"{"severity": "LOW", "risk_score": 10, "reasoning": "looks fine"}"#,
        ));
        let mut s = state("/etc/passwd", 0);

        stage_with(oracle).execute(&mut s).await.unwrap();

        let judgment = s.severity.unwrap();
        assert_eq!(judgment.severity, Severity::Critical);
        assert!(judgment
            .triggered_rules
            .iter()
            .any(|r| r.as_str() == "sys-001"));
    }

    #[tokio::test]
    async fn anomaly_score_contributes_to_blend() {
        let oracle = Arc::new(ScriptedOracle::always(
            r#"{"severity": "LOW", "risk_score": 0, "reasoning": "r"}"#,
        ));
        let mut s = state("./README.md", 50);

        stage_with(oracle).execute(&mut s).await.unwrap();

        // 0.20 * (50 * 2) = 20.
        assert_eq!(s.severity.unwrap().risk_score, 20);
    }

    #[tokio::test]
    async fn violations_contribute_to_blend() {
        let oracle = Arc::new(ScriptedOracle::always(
            r#"{"severity": "LOW", "risk_score": 0, "reasoning": "r"}"#,
        ));
        let mut s = state("./README.md", 0);
        s.analysis = Some(AnalysisJudgment {
            violations: vec![
                warden_types::Violation {
                    kind: "a".into(),
                    description: "a".into(),
                    evidence: vec![],
                },
                warden_types::Violation {
                    kind: "b".into(),
                    description: "b".into(),
                    evidence: vec![],
                },
            ],
            policy_breaches: vec![],
            origin: JudgmentOrigin::Validated,
        });

        stage_with(oracle).execute(&mut s).await.unwrap();

        // 0.10 * min(2 * 25, 100) = 5.
        assert_eq!(s.severity.unwrap().risk_score, 5);
    }

    #[tokio::test]
    async fn oracle_failure_classifies_conservatively() {
        let mut s = state("./README.md", 0);
        stage_with(Arc::new(FailingOracle)).execute(&mut s).await.unwrap();

        let judgment = s.severity.unwrap();
        assert_eq!(judgment.origin, JudgmentOrigin::Fallback);
        assert_eq!(judgment.severity, Severity::High);
        // 0.45 * 75 ≈ 34.
        assert_eq!(judgment.risk_score, 34);
    }

    #[tokio::test]
    async fn out_of_range_oracle_score_is_clamped() {
        let oracle = Arc::new(ScriptedOracle::always(
            r#"{"severity": "LOW", "risk_score": 900, "reasoning": "r"}"#,
        ));
        let mut s = state("./README.md", 0);

        stage_with(oracle).execute(&mut s).await.unwrap();

        // Clamped to 100 before weighting: 0.45 * 100 = 45.
        assert_eq!(s.severity.unwrap().risk_score, 45);
    }
}
