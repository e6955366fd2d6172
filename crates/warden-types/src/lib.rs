//! Shared vocabulary for the Warden governance pipeline.
//!
//! Every crate in the workspace speaks in these types: strong identifiers,
//! the validated [`ActionRequest`], the [`Severity`]/[`Verdict`] ordinals,
//! and the structured judgments each pipeline stage accumulates.

pub mod ids;
pub mod judgment;
pub mod request;
pub mod verdict;

pub use ids::{AgentId, AuditId, RequestId, RuleId};
pub use judgment::{
    AnalysisJudgment, JudgmentOrigin, MonitorJudgment, RemediationJudgment,
    RemediationSuggestion, RiskFactor, SanitizedRequest, SeverityJudgment, Violation,
};
pub use request::{ActionRequest, ActionRequestBuilder, RequestValidationError};
pub use verdict::{Severity, Verdict};
