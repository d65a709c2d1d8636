use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use drphil_core::{Credential, VoteOperation};
use parking_lot::Mutex;
use strategy::ports::{BroadcastError, VoteBroadcastPort};
use tracing::info;

/// Broadcaster for simulation mode. Logs the vote instead of sending it and
/// answers repeats the way the node would.
#[derive(Default)]
pub struct DryRunBroadcaster {
    seen: Mutex<HashSet<(String, String, String)>>,
    counter: AtomicU64,
}

impl DryRunBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl VoteBroadcastPort for DryRunBroadcaster {
    async fn broadcast_vote(
        &self,
        _credential: &Credential,
        vote: &VoteOperation,
    ) -> Result<String, BroadcastError> {
        let key = (vote.voter.clone(), vote.author.clone(), vote.permlink.clone());
        if !self.seen.lock().insert(key) {
            return Err(BroadcastError::DuplicateVote);
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "🧪 SIMULATION: {} would vote {:.2} % on @{}/{}",
            vote.voter,
            vote.weight as f64 / 100.0,
            vote.author,
            vote.permlink
        );
        Ok(format!("dry-run-{}", n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(voter: &str) -> VoteOperation {
        VoteOperation { voter: voter.into(), author: "alice".into(), permlink: "p".into(), weight: 10_000 }
    }

    #[tokio::test]
    async fn test_repeat_vote_is_duplicate() {
        let dry = DryRunBroadcaster::new();
        let key = Credential::new("5K");

        assert_eq!(dry.broadcast_vote(&key, &vote("bot")).await.unwrap(), "dry-run-1");
        assert_eq!(dry.broadcast_vote(&key, &vote("bot")).await, Err(BroadcastError::DuplicateVote));
        assert_eq!(dry.broadcast_vote(&key, &vote("bot2")).await.unwrap(), "dry-run-2");
    }
}
