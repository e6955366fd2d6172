//! Property tests over the decision bands.

use proptest::prelude::*;

use warden_pipeline::{DecisionEngine, DecisionThresholds};
use warden_types::{Severity, Verdict};

fn severity_strategy() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Low),
        Just(Severity::Medium),
        Just(Severity::High),
        Just(Severity::Critical),
    ]
}

fn decide(risk: u8, severity: Severity, violations: usize) -> Verdict {
    DecisionEngine::decide(&DecisionThresholds::default(), risk, severity, violations, "p").0
}

proptest! {
    #[test]
    fn kill_band_dominates_everything(
        risk in 90u8..=100,
        severity in severity_strategy(),
        violations in 0usize..10,
    ) {
        prop_assert_eq!(decide(risk, severity, violations), Verdict::Kill);
    }

    #[test]
    fn critical_severity_kills_at_any_score(
        risk in 0u8..=100,
        violations in 0usize..10,
    ) {
        prop_assert_eq!(decide(risk, Severity::Critical, violations), Verdict::Kill);
    }

    #[test]
    fn any_violation_below_the_kill_band_flags(
        risk in 0u8..90,
        severity in prop_oneof![
            Just(Severity::Low),
            Just(Severity::Medium),
            Just(Severity::High),
        ],
        violations in 1usize..10,
    ) {
        prop_assert_eq!(decide(risk, severity, violations), Verdict::Flag);
    }

    #[test]
    fn approve_only_in_the_clean_low_band(
        risk in 0u8..=100,
        severity in severity_strategy(),
        violations in 0usize..10,
    ) {
        let verdict = decide(risk, severity, violations);
        if verdict == Verdict::Approve {
            prop_assert!(risk <= 30);
            prop_assert_eq!(severity, Severity::Low);
            prop_assert_eq!(violations, 0);
        }
    }

    #[test]
    fn ambiguous_middle_band_defaults_to_flag(
        risk in 31u8..70,
        severity in prop_oneof![Just(Severity::Low), Just(Severity::Medium)],
    ) {
        prop_assert_eq!(decide(risk, severity, 0), Verdict::Flag);
    }

    #[test]
    fn decision_is_deterministic(
        risk in 0u8..=100,
        severity in severity_strategy(),
        violations in 0usize..10,
    ) {
        prop_assert_eq!(
            decide(risk, severity, violations),
            decide(risk, severity, violations)
        );
    }
}
