//! Deterministic content rule engine.
//!
//! Rules are loaded once at startup and immutable for the process lifetime.
//! Matching is a case-insensitive substring search: a rule matches when at
//! least one of its patterns occurs in the content. Every rule is evaluated
//! on every call with no short-circuiting, so results are exhaustive,
//! order-independent, and safe to share across concurrent requests.

#![deny(unsafe_code)]

pub mod catalog;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use warden_types::{RuleId, Severity};

/// Broad classification of what a rule protects against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    SystemIntegrity,
    DataExfiltration,
    PrivilegeEscalation,
    DestructiveCommand,
    NetworkAbuse,
    CredentialAccess,
}

/// A static content-matching policy rule.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyRule {
    pub id: RuleId,
    pub name: String,
    pub description: String,
    pub category: RuleCategory,
    /// Substring patterns; matching is case-insensitive.
    pub patterns: Vec<String>,
    pub severity: Severity,
}

/// A rule that matched, with the exact patterns that hit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuleMatch {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub category: RuleCategory,
    pub severity: Severity,
    /// Every pattern of the rule found in the content.
    pub matched_patterns: Vec<String>,
}

/// Errors from rule-set construction.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("duplicate rule id: {0}")]
    DuplicateRuleId(RuleId),

    #[error("rule {0} has no patterns")]
    EmptyPatterns(RuleId),
}

/// An immutable set of policy rules.
pub struct RuleSet {
    rules: Vec<PolicyRule>,
}

impl RuleSet {
    /// Build a rule set from explicit rules, validating ids and patterns.
    pub fn new(rules: Vec<PolicyRule>) -> Result<Self, RuleError> {
        let mut seen = std::collections::HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.id.clone()) {
                return Err(RuleError::DuplicateRuleId(rule.id.clone()));
            }
            if rule.patterns.is_empty() {
                return Err(RuleError::EmptyPatterns(rule.id.clone()));
            }
        }
        Ok(Self { rules })
    }

    /// The default catalog shipped with Warden.
    pub fn builtin() -> Self {
        Self {
            rules: catalog::builtin_rules(),
        }
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Match content against every rule in the set.
    ///
    /// Pure and deterministic: the same content always yields the same
    /// matches, and adding a rule can only add matches, never remove them.
    pub fn matches(&self, content: &str) -> Vec<RuleMatch> {
        let haystack = content.to_lowercase();

        self.rules
            .iter()
            .filter_map(|rule| {
                let matched_patterns: Vec<String> = rule
                    .patterns
                    .iter()
                    .filter(|p| haystack.contains(&p.to_lowercase()))
                    .cloned()
                    .collect();

                if matched_patterns.is_empty() {
                    None
                } else {
                    Some(RuleMatch {
                        rule_id: rule.id.clone(),
                        rule_name: rule.name.clone(),
                        category: rule.category,
                        severity: rule.severity,
                        matched_patterns,
                    })
                }
            })
            .collect()
    }

    /// The strongest severity among matches, if any rule matched.
    pub fn max_matched_severity(matches: &[RuleMatch]) -> Option<Severity> {
        matches.iter().map(|m| m.severity).max()
    }
}
