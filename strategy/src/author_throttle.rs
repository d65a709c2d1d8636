use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use drphil_core::constants::{FIRST_HISTORY_SCAN, INCREMENTAL_HISTORY_SCAN, LEDGER_REFRESH_INTERVAL};
use drphil_core::Operation;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::ports::ChainPort;
use crate::state::SharedStateHandle;

/// Remembers when the pool last voted for each author, so one author is
/// not voted for again inside the configured cooldown.
pub struct AuthorThrottle {
    chain: Arc<dyn ChainPort>,
    state: SharedStateHandle,
    voters: Vec<String>,
    cooldown: Option<chrono::Duration>,
    min_refresh_interval: Duration,
}

impl AuthorThrottle {
    pub fn new(
        chain: Arc<dyn ChainPort>,
        state: SharedStateHandle,
        voters: Vec<String>,
        cooldown: Option<chrono::Duration>,
    ) -> Self {
        Self {
            chain,
            state,
            voters,
            cooldown,
            min_refresh_interval: LEDGER_REFRESH_INTERVAL,
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.cooldown.is_some()
    }

    /// Rescans recent account history unless it was rescanned a moment ago.
    ///
    /// The first scan reads deep; later ones only read the newest entries.
    /// Accounts whose history cannot be read are skipped.
    pub async fn refresh(&self) {
        let (first_scan, fresh) = {
            let state = self.state.lock();
            let fresh = state
                .ledger_refreshed_at
                .map(|at| at.elapsed() < self.min_refresh_interval)
                .unwrap_or(false);
            (state.ledger_refreshed_at.is_none(), fresh)
        };
        if fresh {
            return;
        }

        let limit = if first_scan { FIRST_HISTORY_SCAN } else { INCREMENTAL_HISTORY_SCAN };
        let mut latest: HashMap<String, DateTime<Utc>> = HashMap::new();

        for voter in &self.voters {
            let history = match self.chain.get_account_history(voter, -1, limit).await {
                Ok(history) => history,
                Err(e) => {
                    warn!("Could not read history for {}: {}", voter, e);
                    continue;
                }
            };

            for (_, item) in history {
                if let Operation::Vote(vote) = item.op {
                    if &vote.voter != voter {
                        continue;
                    }
                    let slot = latest.entry(vote.author).or_insert(item.timestamp);
                    if *slot < item.timestamp {
                        *slot = item.timestamp;
                    }
                }
            }
        }

        let mut state = self.state.lock();
        for (author, at) in latest {
            let slot = state.voted_for_authors.entry(author).or_insert(at);
            if *slot < at {
                *slot = at;
            }
        }
        state.ledger_refreshed_at = Some(Instant::now());
        debug!("Author ledger holds {} authors", state.voted_for_authors.len());
    }

    /// Records a vote cast by this process without waiting for the next scan.
    pub fn record_vote(&self, author: &str, at: DateTime<Utc>) {
        let mut state = self.state.lock();
        let slot = state.voted_for_authors.entry(author.to_string()).or_insert(at);
        if *slot < at {
            *slot = at;
        }
    }

    pub async fn recently_voted(&self, author: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }
        self.refresh().await;
        self.recently_voted_at(author, Utc::now())
    }

    /// Ledger-only check against a given clock reading.
    pub fn recently_voted_at(&self, author: &str, now: DateTime<Utc>) -> bool {
        let cooldown = match self.cooldown {
            Some(cooldown) => cooldown,
            None => return false,
        };
        self.state
            .lock()
            .voted_for_authors
            .get(author)
            .map(|last| now - *last < cooldown)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockChain;
    use crate::state::new_shared_state;
    use chrono::TimeZone;
    use drphil_core::{HistoryItem, VoteOperation};
    use std::sync::atomic::Ordering;

    fn vote(voter: &str, author: &str, at: DateTime<Utc>) -> HistoryItem {
        HistoryItem {
            timestamp: at,
            op: Operation::Vote(VoteOperation {
                voter: voter.into(),
                author: author.into(),
                permlink: "p".into(),
                weight: 10_000,
            }),
        }
    }

    #[tokio::test]
    async fn test_cooldown_boundary() {
        let voted_at = Utc.with_ymd_and_hms(2018, 3, 1, 12, 0, 0).unwrap();
        let chain = Arc::new(MockChain::new());
        chain.put_history("bot", vec![(1, vote("bot", "alice", voted_at))]);

        let throttle = AuthorThrottle::new(
            chain,
            new_shared_state(),
            vec!["bot".into()],
            Some(chrono::Duration::minutes(60)),
        );
        throttle.refresh().await;

        assert!(throttle.recently_voted_at("alice", voted_at + chrono::Duration::minutes(30)));
        assert!(!throttle.recently_voted_at("alice", voted_at + chrono::Duration::minutes(61)));
        assert!(!throttle.recently_voted_at("bob", voted_at));
    }

    #[tokio::test]
    async fn test_keeps_latest_vote_and_ignores_incoming_votes() {
        let t0 = Utc.with_ymd_and_hms(2018, 3, 1, 12, 0, 0).unwrap();
        let chain = Arc::new(MockChain::new());
        chain.put_history(
            "bot",
            vec![
                (1, vote("bot", "alice", t0)),
                (2, vote("bot", "alice", t0 + chrono::Duration::hours(2))),
                (3, vote("carol", "bot", t0 + chrono::Duration::hours(3))),
            ],
        );

        let state = new_shared_state();
        let throttle = AuthorThrottle::new(chain, state.clone(), vec!["bot".into()], Some(chrono::Duration::minutes(60)));
        throttle.refresh().await;

        let ledger = state.lock().voted_for_authors.clone();
        assert_eq!(ledger.get("alice"), Some(&(t0 + chrono::Duration::hours(2))));
        assert!(!ledger.contains_key("bot"));
    }

    #[tokio::test]
    async fn test_disabled_cooldown_never_throttles() {
        let chain = Arc::new(MockChain::new());
        let throttle = AuthorThrottle::new(chain.clone(), new_shared_state(), vec!["bot".into()], None);
        throttle.record_vote("alice", Utc::now());
        assert!(!throttle.recently_voted("alice").await);
        assert_eq!(chain.history_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_rate_limited() {
        let chain = Arc::new(MockChain::new());
        let throttle = AuthorThrottle::new(
            chain.clone(),
            new_shared_state(),
            vec!["bot".into()],
            Some(chrono::Duration::minutes(60)),
        );

        throttle.refresh().await;
        throttle.refresh().await;
        assert_eq!(chain.history_calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        throttle.refresh().await;
        assert_eq!(chain.history_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_history_failure_keeps_ledger() {
        let chain = Arc::new(MockChain::new());
        chain.fail_history(true);
        let throttle = AuthorThrottle::new(chain, new_shared_state(), vec!["bot".into()], Some(chrono::Duration::minutes(60)));

        let now = Utc::now();
        throttle.record_vote("alice", now);
        throttle.refresh().await;
        assert!(throttle.recently_voted_at("alice", now + chrono::Duration::minutes(5)));
    }
}
