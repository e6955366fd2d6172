use serde::{Deserialize, Serialize};

use crate::ids::RuleId;
use crate::verdict::{Severity, Verdict};

/// How a stage judgment was obtained.
///
/// Only `Validated` and `Repaired` judgments came from the reasoning oracle;
/// `Fallback` marks the conservative substitute a stage synthesizes when the
/// oracle reply could not be parsed or timed out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JudgmentOrigin {
    /// Strict schema parse succeeded.
    Validated,
    /// Parse succeeded after deterministic repair.
    Repaired,
    /// Oracle reply unusable; the stage substituted its conservative default.
    Fallback,
}

impl JudgmentOrigin {
    /// Whether the judgment reflects the oracle's actual output.
    pub fn from_oracle(self) -> bool {
        !matches!(self, JudgmentOrigin::Fallback)
    }
}

/// Output of the monitoring stage: what does this request appear to be doing?
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonitorJudgment {
    /// One-line summary of the apparent intent.
    pub intent_summary: String,
    /// Data the request would touch, as reported by the oracle.
    pub data_access: Vec<String>,
    /// Free-form risk indicators worth downstream attention.
    pub risk_indicators: Vec<String>,
    pub origin: JudgmentOrigin,
}

/// A concrete, evidenced policy breach detected for a request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Violation {
    /// Short machine-readable kind, e.g. `sensitive_file_access`.
    pub kind: String,
    pub description: String,
    /// The exact content that triggered the finding.
    pub evidence: Vec<String>,
}

/// Output of the analysis stage: violations and policy breaches.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisJudgment {
    pub violations: Vec<Violation>,
    /// Named policies the request breaches, without per-item evidence.
    pub policy_breaches: Vec<String>,
    pub origin: JudgmentOrigin,
}

/// One weighted contribution to the overall risk score.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RiskFactor {
    pub name: String,
    /// Blend weight in [0, 1]; weights across factors sum to 1.
    pub weight: f64,
    /// Raw factor score on the 0–100 scale, before weighting.
    pub score: f64,
}

impl RiskFactor {
    /// The factor's weighted contribution to the final score.
    pub fn contribution(&self) -> f64 {
        self.weight * self.score
    }
}

/// Output of the classification stage: severity, score and rationale.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeverityJudgment {
    pub severity: Severity,
    /// Blended risk estimate, 0–100.
    pub risk_score: u8,
    /// Free-text reasoning carried into the decision and audit trail.
    pub reasoning: String,
    /// Weighted breakdown behind `risk_score`.
    pub risk_factors: Vec<RiskFactor>,
    /// Rules the deterministic engine matched for this request.
    pub triggered_rules: Vec<RuleId>,
    /// The classifier's recommended final action. Advisory only; the
    /// decision engine owns the verdict.
    pub recommended: Verdict,
    pub origin: JudgmentOrigin,
}

/// A ranked remediation proposal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemediationSuggestion {
    /// 1 is the strongest recommendation.
    pub rank: u8,
    pub description: String,
}

/// A proposed sanitized replacement for the offending request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SanitizedRequest {
    pub action: String,
    pub target: String,
    pub rationale: String,
}

/// Output of the remediation stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemediationJudgment {
    pub suggestions: Vec<RemediationSuggestion>,
    pub sanitized: Option<SanitizedRequest>,
    pub origin: JudgmentOrigin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_not_from_oracle() {
        assert!(JudgmentOrigin::Validated.from_oracle());
        assert!(JudgmentOrigin::Repaired.from_oracle());
        assert!(!JudgmentOrigin::Fallback.from_oracle());
    }

    #[test]
    fn risk_factor_contribution() {
        let f = RiskFactor {
            name: "oracle_assessment".into(),
            weight: 0.45,
            score: 80.0,
        };
        assert!((f.contribution() - 36.0).abs() < f64::EPSILON);
    }

    #[test]
    fn severity_judgment_round_trips() {
        let j = SeverityJudgment {
            severity: Severity::High,
            risk_score: 78,
            reasoning: "matched destructive command pattern".into(),
            risk_factors: vec![],
            triggered_rules: vec![RuleId::new("exec-001")],
            recommended: Verdict::Flag,
            origin: JudgmentOrigin::Validated,
        };
        let json = serde_json::to_string(&j).unwrap();
        let restored: SeverityJudgment = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.severity, Severity::High);
        assert_eq!(restored.triggered_rules.len(), 1);
    }
}
