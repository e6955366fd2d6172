//! Offline keyword-driven oracle.
//!
//! Synthesizes deterministic, schema-compliant replies from the payload text
//! alone. Used as the default when no external reasoning service is wired,
//! and in tests that want plausible-but-reproducible judgments. The payload's
//! `system` field names the asking stage (`monitor`, `analyze`, `classify`,
//! `remediate`).

use async_trait::async_trait;

use crate::{Oracle, OracleError, OraclePayload, OracleReply};

const DANGER_TERMS: &[&str] = &[
    "/etc/passwd",
    "/etc/shadow",
    "rm -rf",
    "sudo",
    "id_rsa",
    ".ssh",
    "password",
    "secret",
    "api_key",
    "credentials",
    "exfiltrat",
    "reverse shell",
];

pub struct HeuristicOracle;

impl HeuristicOracle {
    pub fn new() -> Self {
        Self
    }

    fn danger_hits(prompt: &str) -> Vec<&'static str> {
        let lowered = prompt.to_lowercase();
        DANGER_TERMS
            .iter()
            .copied()
            .filter(|t| lowered.contains(t))
            .collect()
    }
}

impl Default for HeuristicOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Oracle for HeuristicOracle {
    async fn judge(&self, payload: &OraclePayload) -> Result<OracleReply, OracleError> {
        let stage = payload.system.as_deref().unwrap_or("monitor");
        let hits = Self::danger_hits(&payload.prompt);
        let risky = !hits.is_empty();

        let value = match stage {
            "analyze" => {
                let violations: Vec<_> = hits
                    .iter()
                    .map(|h| {
                        serde_json::json!({
                            "kind": "sensitive_content",
                            "description": format!("request content references {h}"),
                            "evidence": [h],
                        })
                    })
                    .collect();
                serde_json::json!({
                    "violations": violations,
                    "policy_breaches": if risky { vec!["sensitive-resource-access"] } else { vec![] },
                })
            }
            "classify" => serde_json::json!({
                "severity": if risky { "HIGH" } else { "LOW" },
                "risk_score": if risky { 80 } else { 10 },
                "reasoning": if risky {
                    "content references sensitive resources"
                } else {
                    "no sensitive indicators in content"
                },
                "recommended": if risky { "FLAG" } else { "APPROVE" },
            }),
            "remediate" => serde_json::json!({
                "suggestions": [
                    {"rank": 1, "description": "narrow the target to a non-sensitive resource"},
                    {"rank": 2, "description": "route the request through human review"},
                ],
            }),
            // monitor and anything unrecognized
            _ => serde_json::json!({
                "intent_summary": summarize(&payload.prompt),
                "data_access": if risky { hits.clone() } else { Vec::new() },
                "risk_indicators": if risky { vec!["sensitive resource reference"] } else { vec![] },
            }),
        };

        Ok(OracleReply {
            raw_text: value.to_string(),
        })
    }
}

fn summarize(prompt: &str) -> String {
    const MAX: usize = 96;
    let trimmed = prompt.trim();
    if trimmed.len() <= MAX {
        trimmed.to_string()
    } else {
        let cut = trimmed
            .char_indices()
            .take_while(|(i, _)| *i < MAX)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(MAX);
        format!("{}…", &trimmed[..cut])
    }
}
