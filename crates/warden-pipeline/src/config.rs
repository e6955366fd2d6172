use std::time::Duration;

use crate::decision::DecisionThresholds;

/// Configuration for a pipeline run.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Decision thresholds injected into the decide stage.
    pub thresholds: DecisionThresholds,
    /// Deadline for each oracle consultation; an elapsed timeout takes the
    /// stage's conservative fallback path.
    pub oracle_timeout: Duration,
    /// Reserved: route straight from orchestration to decision on extreme
    /// anomaly scores. Present in the transition table but disabled in the
    /// current policy.
    pub enable_fast_path: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            thresholds: DecisionThresholds::default(),
            oracle_timeout: Duration::from_secs(10),
            enable_fast_path: false,
        }
    }
}

/// Configuration for the intake facade.
#[derive(Clone, Debug)]
pub struct GovernorConfig {
    pub pipeline: PipelineConfig,
    /// Whether a KILL verdict immediately triggers the permission gate.
    /// The gate itself never decides; this flag is the caller's policy.
    pub block_on_kill: bool,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            block_on_kill: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy() {
        let config = GovernorConfig::default();
        assert!(config.block_on_kill);
        assert!(!config.pipeline.enable_fast_path);
        assert_eq!(config.pipeline.oracle_timeout, Duration::from_secs(10));
        assert_eq!(config.pipeline.thresholds.kill, 90);
    }
}
