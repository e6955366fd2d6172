use serde::{Deserialize, Serialize};

/// Ordinal danger classification of a request.
///
/// Ordering matters: `Low < Medium < High < Critical`. Stage logic floors
/// computed severity by the strongest triggered rule, so the derive order
/// below is load-bearing.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Numeric weight used by the classification blend (0–100 scale).
    pub fn risk_weight(self) -> u8 {
        match self {
            Severity::Low => 10,
            Severity::Medium => 45,
            Severity::High => 75,
            Severity::Critical => 95,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        };
        write!(f, "{}", name)
    }
}

/// Terminal outcome of a governance run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    /// Request may proceed.
    Approve,
    /// Request is held for human review.
    Flag,
    /// Request is refused and the agent is a candidate for blocking.
    Kill,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Verdict::Approve => "APPROVE",
            Verdict::Flag => "FLAG",
            Verdict::Kill => "KILL",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&Severity::Critical).unwrap(),
            "\"CRITICAL\""
        );
        let parsed: Severity = serde_json::from_str("\"HIGH\"").unwrap();
        assert_eq!(parsed, Severity::High);
    }

    #[test]
    fn verdict_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Verdict::Kill).unwrap(), "\"KILL\"");
        let parsed: Verdict = serde_json::from_str("\"APPROVE\"").unwrap();
        assert_eq!(parsed, Verdict::Approve);
    }

    #[test]
    fn severity_risk_weights_monotonic() {
        assert!(Severity::Low.risk_weight() < Severity::Medium.risk_weight());
        assert!(Severity::Medium.risk_weight() < Severity::High.risk_weight());
        assert!(Severity::High.risk_weight() < Severity::Critical.risk_weight());
    }
}
