//! Wire envelopes for stage judgments.
//!
//! These are the JSON shapes the reasoning service is asked to produce, one
//! per pipeline stage. Fields the service may omit default to empty so a
//! partially complete reply still parses instead of forcing the fallback.

use serde::{Deserialize, Serialize};

use warden_types::{Severity, Verdict};

/// Reply schema for the monitoring stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonitorEnvelope {
    pub intent_summary: String,
    #[serde(default)]
    pub data_access: Vec<String>,
    #[serde(default)]
    pub risk_indicators: Vec<String>,
}

/// One violation as reported by the reasoning service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViolationEnvelope {
    #[serde(default = "default_violation_kind")]
    pub kind: String,
    pub description: String,
    #[serde(default)]
    pub evidence: Vec<String>,
}

fn default_violation_kind() -> String {
    "policy_violation".to_string()
}

/// Reply schema for the analysis stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisEnvelope {
    #[serde(default)]
    pub violations: Vec<ViolationEnvelope>,
    #[serde(default)]
    pub policy_breaches: Vec<String>,
}

/// Reply schema for the classification stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeverityEnvelope {
    pub severity: Severity,
    /// 0–100; values outside the range are clamped by the stage.
    pub risk_score: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub recommended: Option<Verdict>,
}

/// One remediation proposal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuggestionEnvelope {
    #[serde(default)]
    pub rank: Option<u8>,
    pub description: String,
}

/// Reply schema for the remediation stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemediationEnvelope {
    #[serde(default)]
    pub suggestions: Vec<SuggestionEnvelope>,
    #[serde(default)]
    pub sanitized_action: Option<String>,
    #[serde(default)]
    pub sanitized_target: Option<String>,
    #[serde(default)]
    pub sanitized_rationale: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_reply, ParseMode};

    #[test]
    fn monitor_envelope_defaults_optional_lists() {
        let parsed =
            parse_reply::<MonitorEnvelope>(r#"{"intent_summary": "reads a doc"}"#).unwrap();
        assert_eq!(parsed.mode, ParseMode::Strict);
        assert!(parsed.value.data_access.is_empty());
        assert!(parsed.value.risk_indicators.is_empty());
    }

    #[test]
    fn severity_envelope_parses_uppercase_severity() {
        let raw = r#"{"severity": "CRITICAL", "risk_score": 95, "reasoning": "system file"}"#;
        let parsed = parse_reply::<SeverityEnvelope>(raw).unwrap();
        assert_eq!(parsed.value.severity, Severity::Critical);
    }

    #[test]
    fn analysis_envelope_defaults_violation_kind() {
        let raw = r#"{"violations": [{"description": "reads credential store"}]}"#;
        let parsed = parse_reply::<AnalysisEnvelope>(raw).unwrap();
        assert_eq!(parsed.value.violations[0].kind, "policy_violation");
    }

    #[test]
    fn remediation_envelope_all_optional() {
        let parsed = parse_reply::<RemediationEnvelope>("{}").unwrap();
        assert!(parsed.value.suggestions.is_empty());
        assert!(parsed.value.sanitized_action.is_none());
    }
}
