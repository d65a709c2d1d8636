pub mod ports;
pub mod adapters;
pub mod rules;
pub mod state;
pub mod vote_power;     // Regenerated vote power of the pool
pub mod relationships;  // Follow graph cache
pub mod author_throttle;
pub mod weight;
pub mod backoff;
pub mod scheduler;
pub mod analytics;
pub mod safety;


#[cfg(test)]
mod engine_tests;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use drphil_core::{Candidate, Credential};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::analytics::vote_log::VoteJournal;
use crate::author_throttle::AuthorThrottle;
use crate::ports::{ChainPort, TelemetryPort, VoteBroadcastPort};
use crate::relationships::RelationshipCache;
use crate::rules::{AccountLists, VotingRules};
use crate::safety::eligibility::EligibilityFilter;
use crate::scheduler::{SchedulerTiming, TaskOutcome, VoteScheduler};
use crate::state::new_shared_state;
use crate::vote_power::VotePowerTracker;
use crate::weight::WeightResolver;

/// Everything needed to assemble a [`VoteEngine`].
pub struct EngineParts {
    pub chain: Arc<dyn ChainPort>,
    pub broadcaster: Arc<dyn VoteBroadcastPort>,
    pub rules: VotingRules,
    pub lists: AccountLists,
    pub credentials: HashMap<String, Credential>,
    pub telemetry: Option<Arc<dyn TelemetryPort>>,
    pub journal: Option<Arc<VoteJournal>>,
    pub timing: SchedulerTiming,
}

/// Entry point for streamed and replayed comment operations.
pub struct VoteEngine {
    rules: Arc<VotingRules>,
    filter: Arc<EligibilityFilter>,
    scheduler: Arc<VoteScheduler>,
    power: Arc<VotePowerTracker>,
    throttle: Arc<AuthorThrottle>,
    telemetry: Option<Arc<dyn TelemetryPort>>,
    voter_count: usize,
}

impl VoteEngine {
    pub fn new(parts: EngineParts) -> Self {
        let state = new_shared_state();
        let rules = Arc::new(parts.rules.normalized());
        let lists = Arc::new(parts.lists);

        let mut voters: Vec<String> = parts.credentials.keys().cloned().collect();
        voters.sort();

        let relationships = Arc::new(RelationshipCache::new(Arc::clone(&parts.chain), Arc::clone(&state)));
        let weights = Arc::new(WeightResolver::new(Arc::clone(&rules), Arc::clone(&lists), relationships));
        let throttle = Arc::new(AuthorThrottle::new(
            Arc::clone(&parts.chain),
            Arc::clone(&state),
            voters.clone(),
            rules.unique_author_cooldown(),
        ));
        let power = Arc::new(VotePowerTracker::new(
            Arc::clone(&parts.chain),
            Arc::clone(&state),
            voters.clone(),
            rules.min_voting_power,
            parts.telemetry.clone(),
        ));
        let filter = Arc::new(EligibilityFilter::new(
            Arc::clone(&parts.chain),
            Arc::clone(&state),
            Arc::clone(&rules),
            lists,
            Arc::clone(&weights),
            Arc::clone(&throttle),
            voters.clone(),
        ));

        let mut scheduler = VoteScheduler::new(
            parts.chain,
            parts.broadcaster,
            Arc::clone(&state),
            Arc::clone(&rules),
            Arc::clone(&filter),
            weights,
            Arc::clone(&power),
            Arc::clone(&throttle),
            Arc::new(parts.credentials),
        )
        .with_timing(parts.timing);
        if let Some(journal) = parts.journal {
            scheduler = scheduler.with_journal(journal);
        }
        if let Some(tel) = &parts.telemetry {
            scheduler = scheduler.with_telemetry(Arc::clone(tel));
        }

        Self {
            rules,
            filter,
            scheduler: Arc::new(scheduler),
            power,
            throttle,
            telemetry: parts.telemetry,
            voter_count: voters.len(),
        }
    }

    pub fn rules(&self) -> &VotingRules {
        &self.rules
    }

    pub fn power(&self) -> Arc<VotePowerTracker> {
        Arc::clone(&self.power)
    }

    pub fn pending_count(&self) -> usize {
        self.scheduler.pending_count()
    }

    /// First vote power poll and, when the cooldown is on, the first deep
    /// history scan.
    pub async fn startup(&self) -> anyhow::Result<()> {
        info!("Current mode: {}.  Accounts voting: {}", self.rules.mode, self.voter_count);
        self.power.poll().await?;
        if self.throttle.is_enabled() {
            self.throttle.refresh().await;
        }
        info!("📊 {}", self.power.describe());
        Ok(())
    }

    /// Pre-checks one comment operation and schedules a vote task for it.
    pub async fn process_event(
        &self,
        candidate: Candidate,
        wait_offset: Option<Duration>,
    ) -> Option<JoinHandle<TaskOutcome>> {
        if let Some(ref tel) = self.telemetry {
            tel.log_event_seen();
        }

        if !self.filter.may_consider(&candidate).await {
            debug!("Not considered: {}", candidate.slug());
            return None;
        }

        if let Err(e) = self.power.poll().await {
            warn!("Unable to refresh vote power: {}", e);
        }

        if let Some(summary) = self.power.summary() {
            if summary.max < self.rules.min_voting_power {
                info!(
                    "Recharging vote power (currently too low: {:.3} %)",
                    summary.max as f64 / 100.0
                );
            }
        }

        let handle = self.scheduler.schedule(candidate, wait_offset);
        if handle.is_some() {
            if let Some(ref tel) = self.telemetry {
                tel.log_event_considered();
            }
        }

        info!("📊 {}; pending votes: {}", self.power.describe(), self.pending_count());
        handle
    }
}
