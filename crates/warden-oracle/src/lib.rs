//! The reasoning-oracle seam.
//!
//! Pipeline stages obtain structured judgments from an external reasoning
//! service through the narrow [`Oracle`] trait, so the orchestrator and
//! decision logic stay testable against deterministic stubs. The service is
//! an opaque collaborator: it returns raw text which callers run through
//! [`parse_reply`]: strict JSON parse first, then a deterministic repair
//! pass, and on total failure the caller substitutes its stage-specific
//! conservative fallback.

#![deny(unsafe_code)]

pub mod heuristic;
pub mod schema;
pub mod scripted;

pub use heuristic::HeuristicOracle;
pub use schema::{
    AnalysisEnvelope, MonitorEnvelope, RemediationEnvelope, SeverityEnvelope,
    SuggestionEnvelope, ViolationEnvelope,
};
pub use scripted::{FailingOracle, ScriptedOracle};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prompt-shaped payload a stage sends to the oracle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OraclePayload {
    /// Optional system framing for the reasoning service.
    pub system: Option<String>,
    /// The stage's question, including serialized request content.
    pub prompt: String,
}

impl OraclePayload {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Raw oracle output before typed extraction.
#[derive(Clone, Debug)]
pub struct OracleReply {
    pub raw_text: String,
}

/// Errors from the oracle seam.
///
/// Parse failures are NOT errors here; they surface as `None` from
/// [`parse_reply`] so the stage can apply its fallback judgment.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("oracle transport failed: {0}")]
    Transport(String),

    #[error("oracle call exceeded its deadline")]
    Timeout,

    #[error("oracle replies exhausted")]
    Exhausted,
}

/// The external reasoning service, seen from inside the pipeline.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn judge(&self, payload: &OraclePayload) -> Result<OracleReply, OracleError>;
}

/// How a successfully extracted value was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseMode {
    /// Strict schema parse of the full reply.
    Strict,
    /// Parse succeeded after deterministic repair.
    Repaired,
}

/// A typed value extracted from a raw reply.
#[derive(Clone, Debug)]
pub struct Parsed<T> {
    pub value: T,
    pub mode: ParseMode,
}

/// Extract a typed judgment from raw oracle text.
///
/// Tries a strict parse of the whole reply, then deterministic repairs:
/// the first balanced JSON object embedded in surrounding prose, and a
/// single-to-double quote normalization of both candidates. Returns `None`
/// when nothing yields the expected schema; the caller substitutes its
/// conservative fallback.
pub fn parse_reply<T: DeserializeOwned>(raw: &str) -> Option<Parsed<T>> {
    if let Ok(value) = serde_json::from_str::<T>(raw) {
        return Some(Parsed {
            value,
            mode: ParseMode::Strict,
        });
    }

    let mut candidates = Vec::new();
    if let Some(extracted) = extract_first_json_object(raw) {
        candidates.push(extracted.clone());
        candidates.push(extracted.replace('\'', "\""));
    }
    candidates.push(raw.replace('\'', "\""));

    for candidate in candidates {
        if let Ok(value) = serde_json::from_str::<T>(&candidate) {
            return Some(Parsed {
                value,
                mode: ParseMode::Repaired,
            });
        }
    }

    None
}

/// The first balanced `{...}` object in the text, if any.
fn extract_first_json_object(raw: &str) -> Option<String> {
    let start = raw.find('{')?;
    let mut depth = 0i32;
    let mut end = None;

    for (idx, ch) in raw[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(start + idx + 1);
                    break;
                }
            }
            _ => {}
        }
    }

    end.map(|end_idx| raw[start..end_idx].to_string())
}
