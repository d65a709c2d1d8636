use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Everything the voting tasks share, behind one lock.
///
/// Pollers fetch from the chain first and then commit their whole update in
/// a single critical section, so a task never reads half a poll. Never hold
/// the guard across an `.await`.
#[derive(Debug, Default)]
pub struct SharedState {
    /// Hundredths of a percent, per managed account.
    pub voting_power: HashMap<String, u16>,
    pub following: HashMap<String, HashSet<String>>,
    pub followers: HashMap<String, HashSet<String>>,
    /// Most recent vote by any managed account, per author.
    pub voted_for_authors: HashMap<String, DateTime<Utc>>,
    pub ledger_refreshed_at: Option<Instant>,
    /// Raw reputation floor sampled from trending posts.
    pub min_trending_rep: Option<i64>,
    /// `@author/permlink` keys of tasks in flight.
    pub pending: HashSet<String>,
}

pub type SharedStateHandle = Arc<Mutex<SharedState>>;

pub fn new_shared_state() -> SharedStateHandle {
    Arc::new(Mutex::new(SharedState::default()))
}
