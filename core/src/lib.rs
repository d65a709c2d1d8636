pub mod chain_time;
pub mod credential;
pub mod math;
pub mod metadata;
pub mod reputation;
pub mod telemetry;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

pub use credential::Credential;
pub use metadata::PostMetadata;

/// Fixed-point vote weight in hundredths of a percent (10000 = 100.00 %).
pub type Weight = i16;

/// A single vote already present on a post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActiveVote {
    pub voter: String,
    #[serde(default, deserialize_with = "chain_time::int_or_string")]
    pub percent: i64,
}

/// A streamed post or comment, or the full content fetched for one.
///
/// Stream operations only carry the authoring fields; everything else is
/// filled in when the content is fetched from the node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Candidate {
    pub author: String,
    pub permlink: String,
    #[serde(default)]
    pub parent_author: String,
    #[serde(default)]
    pub parent_permlink: String,
    #[serde(default, with = "chain_time::option")]
    pub created: Option<DateTime<Utc>>,
    // Absent on pre-HF18 nodes.
    #[serde(default, with = "chain_time::option")]
    pub cashout_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub json_metadata: String,
    #[serde(default)]
    pub active_votes: Vec<ActiveVote>,
    #[serde(default)]
    pub max_accepted_payout: Option<String>,
    #[serde(
        default,
        alias = "percent_steem_dollars",
        alias = "percent_hbd",
        alias = "percent_bears_dollars"
    )]
    pub percent_backed_dollars: Option<u16>,
    #[serde(default, deserialize_with = "chain_time::int_or_string")]
    pub author_reputation: i64,
}

impl Candidate {
    /// `@author/permlink`, the key used for task deduplication and logging.
    pub fn slug(&self) -> String {
        format!("@{}/{}", self.author, self.permlink)
    }

    pub fn is_comment(&self) -> bool {
        !self.parent_author.is_empty()
    }

    pub fn metadata(&self) -> PostMetadata {
        PostMetadata::parse(&self.json_metadata)
    }

    /// True when the author set the maximum accepted payout to zero.
    pub fn payout_declined(&self) -> bool {
        self.max_accepted_payout
            .as_deref()
            .and_then(|asset| asset.split_whitespace().next())
            .and_then(|amount| amount.parse::<f64>().ok())
            .map(|amount| amount == 0.0)
            .unwrap_or(false)
    }

    /// True when the whole reward is paid out as vested power.
    pub fn is_fully_powered_up(&self) -> bool {
        self.percent_backed_dollars == Some(0)
    }

    pub fn voters(&self) -> impl Iterator<Item = &str> {
        self.active_votes.iter().map(|v| v.voter.as_str())
    }

    pub fn upvoters(&self) -> impl Iterator<Item = &str> {
        self.active_votes.iter().filter(|v| v.percent > 0).map(|v| v.voter.as_str())
    }

    pub fn downvoters(&self) -> impl Iterator<Item = &str> {
        self.active_votes.iter().filter(|v| v.percent < 0).map(|v| v.voter.as_str())
    }
}

/// Account fields the bot reads from `get_accounts`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountSnapshot {
    pub name: String,
    pub voting_power: u16,
    #[serde(with = "chain_time")]
    pub last_vote_time: DateTime<Utc>,
    #[serde(default)]
    pub post_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoteOperation {
    pub voter: String,
    pub author: String,
    pub permlink: String,
    pub weight: Weight,
}

/// An operation as it appears in blocks and account history: `[kind, body]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Vote(VoteOperation),
    Comment(Candidate),
    Other(String),
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (kind, body): (String, serde_json::Value) = Deserialize::deserialize(deserializer)?;
        match kind.as_str() {
            "vote" | "vote_operation" => serde_json::from_value(body)
                .map(Operation::Vote)
                .map_err(de::Error::custom),
            "comment" | "comment_operation" => serde_json::from_value(body)
                .map(Operation::Comment)
                .map_err(de::Error::custom),
            _ => Ok(Operation::Other(kind)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HistoryItem {
    #[serde(with = "chain_time")]
    pub timestamp: DateTime<Utc>,
    pub op: Operation,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BlockTransaction {
    #[serde(default)]
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SignedBlock {
    #[serde(with = "chain_time")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub transactions: Vec<BlockTransaction>,
}

impl SignedBlock {
    pub fn comment_operations(&self) -> impl Iterator<Item = &Candidate> {
        self.transactions
            .iter()
            .flat_map(|tx| tx.operations.iter())
            .filter_map(|op| match op {
                Operation::Comment(comment) => Some(comment),
                _ => None,
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FollowEntry {
    pub follower: String,
    pub following: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalProperties {
    pub head_block_number: u64,
    pub last_irreversible_block_num: u64,
}

pub mod constants {
    use std::time::Duration;

    /// Longest pause between failed vote attempts, in seconds.
    pub const MAX_BACKOFF_SECS: f64 = 12.8;
    pub const INITIAL_BACKOFF_SECS: f64 = 0.2;

    /// Percent of full vote power regenerated per day.
    pub const VOTE_RECHARGE_PER_DAY: i64 = 20;

    pub const CATCH_UP_GRACE: Duration = Duration::from_secs(3);
    pub const ROTATION_PACING: Duration = Duration::from_secs(3);
    pub const STREAM_RETRY_DELAY: Duration = Duration::from_secs(5);
    pub const BLOCK_INTERVAL: Duration = Duration::from_secs(3);
    pub const POWER_POLL_INTERVAL: Duration = Duration::from_secs(60);
    pub const LEDGER_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

    pub const FOLLOW_PAGE_SIZE: u32 = 100;
    pub const FOLLOW_KIND: &str = "blog";
    pub const RELATIONSHIP_INVALIDATION_PROBABILITY: f64 = 0.001;

    pub const FIRST_HISTORY_SCAN: u32 = 10_000;
    pub const INCREMENTAL_HISTORY_SCAN: u32 = 300;

    pub const DEFAULT_RELAY_CHANNEL: &str = "bears:op:comment";
}
