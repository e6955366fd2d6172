//! The decision engine.
//!
//! A pure function from accumulated risk signals to a final verdict,
//! evaluated as an ordered priority list where the first matching rule wins.
//! Thresholds are injected configuration, never ambient constants.

use serde::{Deserialize, Serialize};

use warden_types::{Severity, Verdict};

/// The three tunable decision thresholds on the 0–100 risk scale.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DecisionThresholds {
    /// At or below this score (with LOW severity), approve automatically.
    pub auto_approve: u8,
    /// At or above this score, flag for human review.
    pub flag: u8,
    /// At or above this score, kill.
    pub kill: u8,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            auto_approve: 30,
            flag: 70,
            kill: 90,
        }
    }
}

/// Stateless verdict renderer.
pub struct DecisionEngine;

impl DecisionEngine {
    /// Map `(risk_score, severity, violation_count)` to a verdict and a
    /// reproducible reasoning string.
    ///
    /// Priority order:
    /// 1. score ≥ kill threshold, or CRITICAL severity → KILL
    /// 2. score ≥ flag threshold, HIGH severity, or any violation → FLAG
    /// 3. score ≤ auto-approve threshold with LOW severity → APPROVE
    /// 4. anything left (the ambiguous middle band) → FLAG
    pub fn decide(
        thresholds: &DecisionThresholds,
        risk_score: u8,
        severity: Severity,
        violation_count: usize,
        upstream_reasoning: &str,
    ) -> (Verdict, String) {
        let verdict = if risk_score >= thresholds.kill || severity == Severity::Critical {
            Verdict::Kill
        } else if risk_score >= thresholds.flag
            || severity == Severity::High
            || violation_count >= 1
        {
            Verdict::Flag
        } else if risk_score <= thresholds.auto_approve && severity == Severity::Low {
            Verdict::Approve
        } else {
            // Unclassified middle band: default safe.
            Verdict::Flag
        };

        let reasoning = format!(
            "decision={verdict} risk_score={risk_score} severity={severity} \
             violations={violation_count} :: {upstream_reasoning}"
        );

        (verdict, reasoning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decide(risk: u8, severity: Severity, violations: usize) -> Verdict {
        DecisionEngine::decide(&DecisionThresholds::default(), risk, severity, violations, "t").0
    }

    #[test]
    fn kill_threshold_dominates() {
        assert_eq!(decide(95, Severity::Critical, 0), Verdict::Kill);
        assert_eq!(decide(95, Severity::Critical, 10), Verdict::Kill);
        assert_eq!(decide(90, Severity::Low, 0), Verdict::Kill);
        assert_eq!(decide(10, Severity::Critical, 0), Verdict::Kill);
    }

    #[test]
    fn flag_on_score_severity_or_violations() {
        assert_eq!(decide(70, Severity::Low, 0), Verdict::Flag);
        assert_eq!(decide(20, Severity::High, 0), Verdict::Flag);
        assert_eq!(decide(20, Severity::Low, 1), Verdict::Flag);
    }

    #[test]
    fn clean_low_risk_approves() {
        assert_eq!(decide(20, Severity::Low, 0), Verdict::Approve);
        assert_eq!(decide(30, Severity::Low, 0), Verdict::Approve);
    }

    #[test]
    fn ambiguous_middle_band_flags() {
        assert_eq!(decide(50, Severity::Medium, 0), Verdict::Flag);
        assert_eq!(decide(31, Severity::Low, 0), Verdict::Flag);
        assert_eq!(decide(20, Severity::Medium, 0), Verdict::Flag);
    }

    #[test]
    fn thresholds_are_tunable() {
        let strict = DecisionThresholds {
            auto_approve: 5,
            flag: 40,
            kill: 60,
        };
        let (verdict, _) = DecisionEngine::decide(&strict, 65, Severity::Low, 0, "t");
        assert_eq!(verdict, Verdict::Kill);
    }

    #[test]
    fn reasoning_is_reproducible() {
        let (_, a) =
            DecisionEngine::decide(&DecisionThresholds::default(), 50, Severity::Medium, 2, "up");
        let (_, b) =
            DecisionEngine::decide(&DecisionThresholds::default(), 50, Severity::Medium, 2, "up");
        assert_eq!(a, b);
        assert!(a.contains("decision=FLAG"));
        assert!(a.contains("risk_score=50"));
        assert!(a.contains("severity=MEDIUM"));
        assert!(a.contains("violations=2"));
        assert!(a.ends_with(":: up"));
    }
}
