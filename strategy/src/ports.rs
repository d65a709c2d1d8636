// Port Definitions for Hexagonal Architecture
// These traits define the boundaries between the voting logic and the chain,
// the signer and the metrics sink.

use anyhow::Result;
use drphil_core::{
    AccountSnapshot, Candidate, Credential, FollowEntry, GlobalProperties, HistoryItem,
    SignedBlock, VoteOperation,
};

/// Port for read access to the chain node
/// Allows swapping the JSON-RPC client for an in-memory chain in tests
#[async_trait::async_trait]
pub trait ChainPort: Send + Sync {
    async fn get_content(&self, author: &str, permlink: &str) -> Result<Candidate>;

    async fn get_accounts(&self, names: &[String]) -> Result<Vec<AccountSnapshot>>;

    /// `start = -1` reads backwards from the newest entry.
    async fn get_account_history(
        &self,
        account: &str,
        start: i64,
        limit: u32,
    ) -> Result<Vec<(u64, HistoryItem)>>;

    async fn get_following(
        &self,
        account: &str,
        start_after: Option<&str>,
        kind: &str,
        limit: u32,
    ) -> Result<Vec<FollowEntry>>;

    async fn get_followers(
        &self,
        account: &str,
        start_after: Option<&str>,
        kind: &str,
        limit: u32,
    ) -> Result<Vec<FollowEntry>>;

    async fn get_discussions_by_trending(&self, tag: &str, limit: u32) -> Result<Vec<Candidate>>;

    async fn get_dynamic_global_properties(&self) -> Result<GlobalProperties>;

    /// `None` when the block does not exist yet.
    async fn get_block(&self, number: u64) -> Result<Option<SignedBlock>>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BroadcastError {
    #[error("duplicate vote")]
    DuplicateVote,
    #[error("duplicate transaction")]
    DuplicateTransaction,
    #[error("rejected by node: {0}")]
    Rejected(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl BroadcastError {
    /// Duplicates mean the vote already exists. Nothing to retry, no penalty.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateVote | Self::DuplicateTransaction)
    }

    pub fn class(&self) -> &'static str {
        match self {
            Self::DuplicateVote => "duplicate_vote",
            Self::DuplicateTransaction => "duplicate_transaction",
            Self::Rejected(_) => "rejected",
            Self::Transport(_) => "transport",
        }
    }
}

/// Port for signing and broadcasting a vote
/// Abstracts the details of transaction submission (remote signer, dry run, etc.)
#[async_trait::async_trait]
pub trait VoteBroadcastPort: Send + Sync {
    /// Returns the transaction id on success.
    async fn broadcast_vote(
        &self,
        credential: &Credential,
        vote: &VoteOperation,
    ) -> std::result::Result<String, BroadcastError>;
}

/// Port for operational counters
pub trait TelemetryPort: Send + Sync {
    fn log_event_seen(&self);
    fn log_event_considered(&self);
    fn log_skip(&self, reason: &'static str);
    fn log_duplicate_task(&self);
    fn log_vote_cast(&self);
    fn log_vote_failed(&self, class: &'static str);
    fn log_pending_tasks(&self, pending: usize);
    fn log_wasted_power(&self, hundredths: u32);
}
