use std::sync::Arc;

use chrono::{DateTime, Utc};
use drphil_core::reputation::to_rep;
use drphil_core::Candidate;
use tracing::{debug, info, warn};

use crate::author_throttle::AuthorThrottle;
use crate::ports::ChainPort;
use crate::rules::{AccountLists, ReputationFloor, VotingMode, VotingRules};
use crate::state::SharedStateHandle;
use crate::weight::WeightResolver;

pub mod checks;

pub use checks::SkipReason;

/// Decides whether a post is worth a vote task, and whether a scheduled post
/// should still be voted.
pub struct EligibilityFilter {
    chain: Arc<dyn ChainPort>,
    state: SharedStateHandle,
    rules: Arc<VotingRules>,
    lists: Arc<AccountLists>,
    weights: Arc<WeightResolver>,
    throttle: Arc<AuthorThrottle>,
    voters: Vec<String>,
}

impl EligibilityFilter {
    pub fn new(
        chain: Arc<dyn ChainPort>,
        state: SharedStateHandle,
        rules: Arc<VotingRules>,
        lists: Arc<AccountLists>,
        weights: Arc<WeightResolver>,
        throttle: Arc<AuthorThrottle>,
        voters: Vec<String>,
    ) -> Self {
        Self { chain, state, rules, lists, weights, throttle, voters }
    }

    /// Cheap pre-check on a streamed operation, before any task is spawned.
    pub async fn may_consider(&self, candidate: &Candidate) -> bool {
        if self.rules.mode == VotingMode::Disabled {
            return false;
        }
        if !self.rules.enable_comments && candidate.is_comment() {
            return false;
        }
        if self.lists.skip_tags.contains(&candidate.parent_permlink) {
            return false;
        }

        let metadata = candidate.metadata();
        if !checks::tags_allowed(&metadata, &self.lists.skip_tags, &self.lists.only_tags) {
            return false;
        }
        if self.lists.skip_accounts.contains(&candidate.author) {
            return false;
        }
        if !checks::app_allowed(&metadata, &self.lists.skip_apps, &self.lists.only_apps) {
            return false;
        }

        for voter in &self.voters {
            if self.weights.weight(&candidate.author, voter).await > 0 {
                return true;
            }
        }
        debug!("No voter has a positive weight for {}", candidate.slug());
        false
    }

    pub async fn should_skip(&self, candidate: &Candidate, eligible: &[String]) -> Option<SkipReason> {
        self.should_skip_at(candidate, eligible, Utc::now()).await
    }

    /// Ordered checks against fully fetched content. The first hit wins.
    pub async fn should_skip_at(
        &self,
        candidate: &Candidate,
        eligible: &[String],
        now: DateTime<Utc>,
    ) -> Option<SkipReason> {
        if let Some(cashout) = candidate.cashout_time {
            if cashout < now {
                return Some(SkipReason::CashoutPassed(cashout));
            }
        }

        if self.rules.only_first_posts {
            if let Some(reason) = self.first_post_check(&candidate.author).await {
                return Some(reason);
            }
        }

        if self.rules.only_fully_powered_up && !candidate.is_fully_powered_up() {
            return Some(SkipReason::NotFullyPoweredUp);
        }

        if candidate.payout_declined() {
            return Some(SkipReason::PayoutDeclined);
        }

        if eligible.is_empty() {
            return Some(SkipReason::NoEligibleVoters);
        }

        let raw_rep = candidate.author_reputation;
        let rep = to_rep(raw_rep);

        if !self.lists.is_favorite(&candidate.author) {
            match self.rules.min_rep {
                ReputationFloor::Fixed(min) if rep < min => {
                    return Some(SkipReason::LowReputation(rep));
                }
                ReputationFloor::Dynamic { sample } => {
                    if raw_rep < self.trending_floor(sample).await {
                        return Some(SkipReason::LowDynamicReputation(rep));
                    }
                }
                _ => {}
            }
        }

        if rep > self.rules.max_rep {
            return Some(SkipReason::HighReputation(rep));
        }

        let flags = checks::intersecting(candidate.downvoters(), &self.lists.flag_signals);
        if !flags.is_empty() {
            return Some(SkipReason::FlagSignal(flags));
        }

        let signals = checks::intersecting(candidate.upvoters(), &self.lists.vote_signals);
        if !signals.is_empty() {
            return Some(SkipReason::VoteSignal(signals));
        }

        // Only voters still in the pool count; a recharging account's old vote is not seen here.
        if candidate.voters().any(|voter| eligible.iter().any(|e| e == voter)) {
            return Some(SkipReason::AlreadyVoted);
        }

        if self.throttle.recently_voted(&candidate.author).await {
            return Some(SkipReason::AuthorCooldown {
                author: candidate.author.clone(),
                minutes: self.rules.unique_author.unwrap_or_default(),
            });
        }

        None
    }

    async fn first_post_check(&self, author: &str) -> Option<SkipReason> {
        match self.chain.get_accounts(&[author.to_string()]).await {
            Ok(accounts) => match accounts.first() {
                Some(account) if account.post_count > 1 => Some(SkipReason::NotFirstPost),
                Some(_) => None,
                None => Some(SkipReason::AuthorLookupFailed(format!("unknown account {}", author))),
            },
            Err(e) => {
                warn!("Warning: {}", e);
                Some(SkipReason::AuthorLookupFailed(e.to_string()))
            }
        }
    }

    // Sampled lazily and then resampled at random; a failed sample keeps
    // the previous floor.
    async fn trending_floor(&self, sample: u32) -> i64 {
        let current = self.state.lock().min_trending_rep;

        if current.is_none() || checks::should_resample(sample) {
            info!("Looking up trending up to {} posts.", sample);
            match checks::refresh_trending_floor(self.chain.as_ref(), sample).await {
                Ok(Some(floor)) => {
                    self.state.lock().min_trending_rep = Some(floor);
                    info!("Current minimum dynamic rep: {:.3}", to_rep(floor));
                    return floor;
                }
                Ok(None) => debug!("Trending is empty, keeping the previous floor"),
                Err(e) => warn!("Warning: {}", e),
            }
        }

        current.unwrap_or(0)
    }
}
