//! Per-agent behavioral baselines and anomaly scoring.
//!
//! A baseline represents one agent's learned "normal behavior": which actions
//! and targets it usually touches, how fast it usually submits requests, and
//! how risky its history has been. Baselines are updated online via EWMA
//! (Exponentially Weighted Moving Average) and consulted before each pipeline
//! run to produce a 0–50 anomaly score.

#![deny(unsafe_code)]

pub mod tracker;

pub use tracker::{BaselineConfig, BaselineError, BaselineTracker};

/// Default EWMA smoothing factor.
pub const DEFAULT_SMOOTHING: f64 = 0.15;
/// Default bound on tracked actions/targets per agent.
pub const DEFAULT_MAX_TRACKED: usize = 20;
/// Requests an agent must have before anomaly detection engages.
pub const DEFAULT_MIN_HISTORY: u64 = 3;
/// Upper bound of the anomaly score.
pub const MAX_ANOMALY_SCORE: u8 = 50;
