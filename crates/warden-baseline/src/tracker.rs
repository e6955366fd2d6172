use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use warden_storage::{AgentBaseline, BaselineStore};
use warden_types::AgentId;

use crate::{DEFAULT_MAX_TRACKED, DEFAULT_MIN_HISTORY, DEFAULT_SMOOTHING, MAX_ANOMALY_SCORE};

/// Configuration for the baseline tracker.
///
/// Injected explicitly so tests can tune weights without ambient state.
#[derive(Clone, Debug)]
pub struct BaselineConfig {
    /// EWMA smoothing factor for risk and request-rate averages.
    pub smoothing: f64,
    /// Bound on the typical-actions FIFO.
    pub max_tracked_actions: usize,
    /// Bound on the typical-targets FIFO.
    pub max_tracked_targets: usize,
    /// Cold-start gate: agents with fewer requests always score 0.
    pub min_history: u64,
    /// Score contribution for an action the agent has never used.
    pub unknown_action_weight: u8,
    /// Score contribution for a target unlike anything the agent has touched.
    pub unknown_target_weight: u8,
    /// Score contribution when the trailing-hour rate exceeds twice the
    /// smoothed average.
    pub rate_spike_weight: u8,
    /// Score contribution for an agent with a risky history.
    pub elevated_risk_weight: u8,
    /// Minimum history before the elevated-risk factor applies.
    pub elevated_risk_min_requests: u64,
    /// Smoothed-average-risk threshold for the elevated-risk factor.
    pub elevated_risk_threshold: f64,
    /// Cap on the summed anomaly score.
    pub max_score: u8,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            smoothing: DEFAULT_SMOOTHING,
            max_tracked_actions: DEFAULT_MAX_TRACKED,
            max_tracked_targets: DEFAULT_MAX_TRACKED,
            min_history: DEFAULT_MIN_HISTORY,
            unknown_action_weight: 15,
            unknown_target_weight: 15,
            rate_spike_weight: 10,
            elevated_risk_weight: 10,
            elevated_risk_min_requests: 5,
            elevated_risk_threshold: 65.0,
            max_score: MAX_ANOMALY_SCORE,
        }
    }
}

/// Errors from the baseline tracker.
#[derive(Error, Debug)]
pub enum BaselineError {
    /// The in-memory profile was updated but write-through persistence
    /// failed; the profile itself is intact.
    #[error("baseline persistence failed for {agent}: {source}")]
    Persistence {
        agent: AgentId,
        #[source]
        source: warden_storage::StorageError,
    },

    #[error("baseline map lock poisoned")]
    LockPoisoned,
}

/// Tracks per-agent behavioral baselines and scores incoming requests.
///
/// Profiles live in a sharded map: each agent's record sits behind its own
/// async mutex, so read-modify-write cycles for one agent are serialized
/// while different agents proceed fully in parallel.
pub struct BaselineTracker {
    config: BaselineConfig,
    store: Arc<dyn BaselineStore>,
    profiles: RwLock<HashMap<AgentId, Arc<Mutex<AgentBaseline>>>>,
}

impl BaselineTracker {
    pub fn new(config: BaselineConfig, store: Arc<dyn BaselineStore>) -> Self {
        Self {
            config,
            store,
            profiles: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &BaselineConfig {
        &self.config
    }

    /// Anomaly score in `[0, max_score]` for a prospective request.
    ///
    /// Returns 0 for agents with fewer than `min_history` observed requests
    /// (cold start). Otherwise sums the triggered factor weights, capped.
    pub async fn score(
        &self,
        agent_id: &AgentId,
        action: &str,
        target: &str,
    ) -> Result<u8, BaselineError> {
        let entry = match self.profile_entry(agent_id).await? {
            Some(entry) => entry,
            None => return Ok(0),
        };

        let mut profile = entry.lock().await;
        if profile.total_requests < self.config.min_history {
            return Ok(0);
        }

        prune_window(&mut profile.recent_requests, Utc::now());

        let mut score: u16 = 0;

        let action_norm = normalize(action);
        if !profile.typical_actions.iter().any(|a| *a == action_norm) {
            score += u16::from(self.config.unknown_action_weight);
        }

        let target_norm = normalize(target);
        let target_known = profile
            .typical_targets
            .iter()
            .any(|t| t.contains(&target_norm) || target_norm.contains(t.as_str()));
        if !target_known {
            score += u16::from(self.config.unknown_target_weight);
        }

        let trailing = profile.recent_requests.len() as f64;
        if profile.avg_requests_per_hour > 0.0 && trailing > 2.0 * profile.avg_requests_per_hour {
            score += u16::from(self.config.rate_spike_weight);
        }

        if profile.total_requests >= self.config.elevated_risk_min_requests
            && profile.avg_risk_score > self.config.elevated_risk_threshold
        {
            score += u16::from(self.config.elevated_risk_weight);
        }

        let capped = score.min(u16::from(self.config.max_score)) as u8;
        debug!(agent = %agent_id, score = capped, "behavioral anomaly scored");
        Ok(capped)
    }

    /// Fold a completed request into the agent's baseline.
    ///
    /// This is the only mutator of baseline records. The in-memory profile is
    /// updated first; a write-through persistence failure is surfaced but
    /// leaves the profile intact.
    pub async fn update(
        &self,
        agent_id: &AgentId,
        action: &str,
        target: &str,
        risk_score: f64,
    ) -> Result<(), BaselineError> {
        let now = Utc::now();

        let entry = match self.profile_entry(agent_id).await? {
            Some(entry) => entry,
            None => {
                // First observation: seed and persist.
                let baseline =
                    AgentBaseline::seed(agent_id.clone(), action, target, risk_score, now);
                self.insert_profile(baseline.clone())?;
                return self.persist(agent_id, baseline).await;
            }
        };

        let snapshot = {
            let mut profile = entry.lock().await;

            profile.recent_requests.push_back(now);
            prune_window(&mut profile.recent_requests, now);

            let max_actions = self.config.max_tracked_actions;
            push_bounded(&mut profile.typical_actions, normalize(action), max_actions);
            let max_targets = self.config.max_tracked_targets;
            push_bounded(&mut profile.typical_targets, normalize(target), max_targets);

            let alpha = self.config.smoothing;
            profile.avg_risk_score = ewma(profile.avg_risk_score, risk_score, alpha);

            let trailing = profile.recent_requests.len() as f64;
            profile.avg_requests_per_hour =
                ewma(profile.avg_requests_per_hour, trailing, alpha);

            profile.total_requests += 1;
            profile.last_updated = now;

            profile.clone()
        };

        self.persist(agent_id, snapshot).await
    }

    /// Current snapshot of an agent's baseline, if one exists.
    pub async fn baseline(&self, agent_id: &AgentId) -> Result<Option<AgentBaseline>, BaselineError> {
        match self.profile_entry(agent_id).await? {
            Some(entry) => Ok(Some(entry.lock().await.clone())),
            None => Ok(None),
        }
    }

    /// Look up the sharded entry for an agent, hydrating from the store on a
    /// cold map (process restart).
    async fn profile_entry(
        &self,
        agent_id: &AgentId,
    ) -> Result<Option<Arc<Mutex<AgentBaseline>>>, BaselineError> {
        {
            let map = self
                .profiles
                .read()
                .map_err(|_| BaselineError::LockPoisoned)?;
            if let Some(entry) = map.get(agent_id) {
                return Ok(Some(entry.clone()));
            }
        }

        match self.store.get_baseline(agent_id).await {
            Ok(Some(stored)) => {
                let mut map = self
                    .profiles
                    .write()
                    .map_err(|_| BaselineError::LockPoisoned)?;
                let entry = map
                    .entry(agent_id.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(stored)))
                    .clone();
                Ok(Some(entry))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                warn!(agent = %agent_id, error = %err, "baseline hydration failed");
                Ok(None)
            }
        }
    }

    fn insert_profile(&self, baseline: AgentBaseline) -> Result<(), BaselineError> {
        let mut map = self
            .profiles
            .write()
            .map_err(|_| BaselineError::LockPoisoned)?;
        map.entry(baseline.agent_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(baseline)));
        Ok(())
    }

    async fn persist(&self, agent_id: &AgentId, snapshot: AgentBaseline) -> Result<(), BaselineError> {
        self.store
            .upsert_baseline(snapshot)
            .await
            .map_err(|source| BaselineError::Persistence {
                agent: agent_id.clone(),
                source,
            })
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn ewma(old: f64, sample: f64, alpha: f64) -> f64 {
    old * (1.0 - alpha) + sample * alpha
}

/// Append a normalized value if unseen, evicting the oldest entry once the
/// list exceeds `max` (bounded FIFO).
fn push_bounded(list: &mut std::collections::VecDeque<String>, value: String, max: usize) {
    if list.iter().any(|v| *v == value) {
        return;
    }
    list.push_back(value);
    while list.len() > max {
        list.pop_front();
    }
}

fn prune_window(
    window: &mut std::collections::VecDeque<DateTime<Utc>>,
    now: DateTime<Utc>,
) {
    let cutoff = now - Duration::hours(1);
    while window.front().is_some_and(|t| *t < cutoff) {
        window.pop_front();
    }
}
