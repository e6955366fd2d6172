//! The Warden governance pipeline.
//!
//! Every agent request runs through an explicit finite-state machine:
//!
//! ```text
//! Orchestrate → Monitor → Analyze → Classify → {Remediate | skip} → Decide → Terminal
//! ```
//!
//! Stages consult the reasoning oracle and the deterministic rule engine,
//! merging results into a per-request [`PipelineState`]. A stage never aborts
//! the run: oracle failures degrade to conservative fallback judgments and
//! the pipeline always reaches `Terminal`, where the pure decision engine
//! renders APPROVE / FLAG / KILL exactly once.
//!
//! [`RequestGovernor`] is the intake facade wiring the permission gate,
//! behavioral baselines, audit trail and event notifications around the
//! pipeline.

#![deny(unsafe_code)]

pub mod config;
pub mod decision;
pub mod error;
pub mod governor;
pub mod orchestrator;
pub mod stage;
pub mod stages;
pub mod state;

pub use config::{GovernorConfig, PipelineConfig};
pub use decision::{DecisionEngine, DecisionThresholds};
pub use error::{GovernorError, PipelineError};
pub use governor::{AuditStatus, IntakeOutcome, RequestGovernor};
pub use orchestrator::Pipeline;
pub use stage::{PipelineStage, Stage};
pub use state::PipelineState;
