use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use drphil_core::constants::{CATCH_UP_GRACE, INITIAL_BACKOFF_SECS, MAX_BACKOFF_SECS, ROTATION_PACING};
use drphil_core::math::as_percent;
use drphil_core::{Candidate, Credential, VoteOperation};
use rand::Rng;
use smallvec::SmallVec;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::analytics::vote_log::VoteJournal;
use crate::author_throttle::AuthorThrottle;
use crate::backoff::Backoff;
use crate::ports::{ChainPort, TelemetryPort, VoteBroadcastPort};
use crate::rules::VotingRules;
use crate::safety::eligibility::{EligibilityFilter, SkipReason};
use crate::state::SharedStateHandle;
use crate::vote_power::VotePowerTracker;
use crate::weight::WeightResolver;

/// Pauses used by vote tasks. Tests shrink them.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerTiming {
    pub catch_up_grace: Duration,
    pub rotation_pacing: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for SchedulerTiming {
    fn default() -> Self {
        Self {
            catch_up_grace: CATCH_UP_GRACE,
            rotation_pacing: ROTATION_PACING,
            initial_backoff: Duration::from_secs_f64(INITIAL_BACKOFF_SECS),
            max_backoff: Duration::from_secs_f64(MAX_BACKOFF_SECS),
        }
    }
}

/// How a vote task ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Voted { votes: u32 },
    Skipped(SkipReason),
    /// Every eligible voter was tried and none succeeded.
    Exhausted,
    Aborted(String),
}

// Releases the task key however the task ends.
struct PendingGuard {
    state: SharedStateHandle,
    key: String,
    telemetry: Option<Arc<dyn TelemetryPort>>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let remaining = {
            let mut state = self.state.lock();
            state.pending.remove(&self.key);
            state.pending.len()
        };
        if let Some(tel) = &self.telemetry {
            tel.log_pending_tasks(remaining);
        }
    }
}

/// Spawns and runs one vote task per post.
pub struct VoteScheduler {
    chain: Arc<dyn ChainPort>,
    broadcaster: Arc<dyn VoteBroadcastPort>,
    state: SharedStateHandle,
    rules: Arc<VotingRules>,
    filter: Arc<EligibilityFilter>,
    weights: Arc<WeightResolver>,
    power: Arc<VotePowerTracker>,
    throttle: Arc<AuthorThrottle>,
    credentials: Arc<HashMap<String, Credential>>,
    voters: Vec<String>,
    journal: Option<Arc<VoteJournal>>,
    telemetry: Option<Arc<dyn TelemetryPort>>,
    timing: SchedulerTiming,
}

impl VoteScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chain: Arc<dyn ChainPort>,
        broadcaster: Arc<dyn VoteBroadcastPort>,
        state: SharedStateHandle,
        rules: Arc<VotingRules>,
        filter: Arc<EligibilityFilter>,
        weights: Arc<WeightResolver>,
        power: Arc<VotePowerTracker>,
        throttle: Arc<AuthorThrottle>,
        credentials: Arc<HashMap<String, Credential>>,
    ) -> Self {
        let mut voters: Vec<String> = credentials.keys().cloned().collect();
        voters.sort();

        Self {
            chain,
            broadcaster,
            state,
            rules,
            filter,
            weights,
            power,
            throttle,
            credentials,
            voters,
            journal: None,
            telemetry: None,
            timing: SchedulerTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: SchedulerTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_journal(mut self, journal: Arc<VoteJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetryPort>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Registers a task for the post unless one is already pending.
    ///
    /// `wait_offset` is how long ago the post was made, when the caller knows
    /// better than the post's own timestamp (replay).
    pub fn schedule(
        self: &Arc<Self>,
        candidate: Candidate,
        wait_offset: Option<Duration>,
    ) -> Option<JoinHandle<TaskOutcome>> {
        let key = candidate.slug();

        let pending = {
            let mut state = self.state.lock();
            if !state.pending.insert(key.clone()) {
                None
            } else {
                Some(state.pending.len())
            }
        };

        let pending = match pending {
            Some(pending) => pending,
            None => {
                info!("Skipped, vote already pending:\n\t{}", key);
                if let Some(tel) = &self.telemetry {
                    tel.log_duplicate_task();
                }
                return None;
            }
        };

        debug!("Pending votes: {}", pending);
        if let Some(tel) = &self.telemetry {
            tel.log_pending_tasks(pending);
        }

        let guard = PendingGuard {
            state: Arc::clone(&self.state),
            key,
            telemetry: self.telemetry.clone(),
        };
        let this = Arc::clone(self);

        Some(tokio::spawn(async move {
            let _guard = guard;
            this.run(candidate, wait_offset).await
        }))
    }

    async fn run(&self, candidate: Candidate, wait_offset: Option<Duration>) -> TaskOutcome {
        let slug = candidate.slug();

        let content = match self.chain.get_content(&candidate.author, &candidate.permlink).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Unable to fetch {}: {}", slug, e);
                return TaskOutcome::Aborted(e.to_string());
            }
        };

        let eligible = self.eligible_voters(&content);
        if let Some(reason) = self.filter.should_skip(&content, &eligible).await {
            return self.skipped(&slug, reason);
        }

        // Post age is only taken off here, never after re-validation.
        let offset = wait_offset.unwrap_or_else(|| {
            content
                .created
                .and_then(|created| (Utc::now() - created).to_std().ok())
                .unwrap_or_default()
        });
        let minutes = rand::thread_rng().gen_range(self.rules.wait_range());
        let wait = Duration::from_secs(minutes * 60);

        match wait.checked_sub(offset).filter(|d| !d.is_zero()) {
            Some(delay) => {
                info!("Waiting {} seconds to vote for:\n\t{}", delay.as_secs(), slug);
                tokio::time::sleep(delay).await;
            }
            None => {
                info!("Catching up to vote for:\n\t{}", slug);
                tokio::time::sleep(self.timing.catch_up_grace).await;
            }
        }

        let content = match self.chain.get_content(&content.author, &content.permlink).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Unable to re-fetch {}: {}", slug, e);
                return TaskOutcome::Aborted(e.to_string());
            }
        };

        let eligible = self.eligible_voters(&content);
        if let Some(reason) = self.filter.should_skip(&content, &eligible).await {
            return self.skipped(&slug, reason);
        }

        self.cast_votes(&content, eligible).await
    }

    async fn cast_votes(&self, content: &Candidate, eligible: Vec<String>) -> TaskOutcome {
        let slug = content.slug();
        let mut pool: SmallVec<[String; 8]> = eligible.into_iter().collect();
        let mut backoff = Backoff::new(self.timing.initial_backoff, self.timing.max_backoff);
        let mut votes_cast: u32 = 0;

        while !pool.is_empty() {
            let pick = rand::thread_rng().gen_range(0..pool.len());
            let voter = pool.swap_remove(pick);

            let weight = self.weights.weight(&content.author, &voter).await;
            if weight == 0 {
                info!("Zero vote weight for @{}, giving up on {}", content.author, slug);
                return if votes_cast > 0 {
                    TaskOutcome::Voted { votes: votes_cast }
                } else {
                    TaskOutcome::Aborted("zero vote weight".to_string())
                };
            }

            if self.power.is_recharging(&voter) {
                let power = self.power.power(&voter).unwrap_or_default();
                if self.voters.len() > 1 {
                    info!(
                        "Recharging {} vote power (currently too low: {:.3} %)",
                        voter,
                        as_percent(power as i64)
                    );
                } else {
                    info!("Recharging vote power (currently too low: {:.3} %)", as_percent(power as i64));
                }
            }

            let credential = match self.credentials.get(&voter) {
                Some(credential) => credential,
                None => {
                    error!("No credential for {}", voter);
                    continue;
                }
            };

            let vote = VoteOperation {
                voter: voter.clone(),
                author: content.author.clone(),
                permlink: content.permlink.clone(),
                weight,
            };
            info!("{} voting for {}", voter, slug);

            match self.broadcaster.broadcast_vote(credential, &vote).await {
                Ok(transaction) => {
                    info!("\t✅ Success: {}", transaction);
                    votes_cast += 1;
                    backoff.reset();
                    self.after_success(&vote, &transaction).await;

                    if !self.rules.is_rotating() {
                        return TaskOutcome::Voted { votes: votes_cast };
                    }
                    if let Some(max) = self.rules.max_votes_per_post {
                        if votes_cast >= max {
                            info!("Max votes per post reached.");
                            return TaskOutcome::Voted { votes: votes_cast };
                        }
                    }
                    if !pool.is_empty() {
                        tokio::time::sleep(self.timing.rotation_pacing).await;
                    }
                }
                Err(e) if e.is_duplicate() => {
                    info!("\tFailed: {}.", e);
                    if let Some(tel) = &self.telemetry {
                        tel.log_vote_failed(e.class());
                    }
                }
                Err(e) => {
                    let pause = backoff.next_delay();
                    warn!("Pausing {:.1}s :: Unable to vote with {}. {}", pause.as_secs_f64(), voter, e);
                    if let Some(tel) = &self.telemetry {
                        tel.log_vote_failed(e.class());
                    }
                    tokio::time::sleep(pause).await;
                }
            }
        }

        if votes_cast > 0 {
            TaskOutcome::Voted { votes: votes_cast }
        } else {
            info!("No voter left for {}", slug);
            TaskOutcome::Exhausted
        }
    }

    async fn after_success(&self, vote: &VoteOperation, transaction: &str) {
        if let Some(tel) = &self.telemetry {
            tel.log_vote_cast();
        }
        self.throttle.record_vote(&vote.author, Utc::now());
        if let Some(journal) = &self.journal {
            journal.log_vote(vote, transaction, &self.rules.mode.to_string());
        }
        if let Err(e) = self.power.poll().await {
            warn!("Unable to refresh vote power: {}", e);
        }
    }

    /// Voters with enough power; in rotation mode also without a vote on
    /// the post already.
    fn eligible_voters(&self, content: &Candidate) -> Vec<String> {
        let recharging = self.power.recharging();

        self.voters
            .iter()
            .filter(|voter| !recharging.contains(*voter))
            .filter(|voter| !self.rules.is_rotating() || !content.voters().any(|v| v == voter.as_str()))
            .cloned()
            .collect()
    }

    fn skipped(&self, slug: &str, reason: SkipReason) -> TaskOutcome {
        info!("Skipped, {}:\n\t{}", reason, slug);
        if let Some(tel) = &self.telemetry {
            tel.log_skip(reason.label());
        }
        TaskOutcome::Skipped(reason)
    }
}
