use thiserror::Error;

use warden_types::RequestValidationError;

/// Errors from the pipeline core.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A second attempt to set the terminal decision. The decision engine is
    /// the only writer and writes exactly once.
    #[error("decision already set for request {0}")]
    DecisionAlreadySet(String),

    /// The driver reached `Terminal` without a decision. Indicates a broken
    /// transition table, not a property of the request.
    #[error("pipeline reached terminal state without a decision")]
    MissingDecision,
}

/// Errors surfaced by the intake facade.
#[derive(Error, Debug)]
pub enum GovernorError {
    /// Malformed incoming request; never entered the pipeline.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestValidationError),

    /// Unexpected failure processing this single request. Shared per-agent
    /// state is unaffected.
    #[error("internal governance failure: {0}")]
    Internal(String),
}
