// In-memory adapters for the ports. Used by the test suites and by dry runs
// that need a chain without a node.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, Result};
use drphil_core::{
    AccountSnapshot, Candidate, Credential, FollowEntry, GlobalProperties, HistoryItem,
    SignedBlock, VoteOperation,
};
use parking_lot::Mutex;

use crate::ports::{BroadcastError, ChainPort, VoteBroadcastPort};

/// Chain state held in maps.
#[derive(Default)]
pub struct MockChain {
    contents: Mutex<HashMap<(String, String), Candidate>>,
    accounts: Mutex<HashMap<String, AccountSnapshot>>,
    history: Mutex<HashMap<String, Vec<(u64, HistoryItem)>>>,
    following: Mutex<HashMap<String, Vec<String>>>,
    followers: Mutex<HashMap<String, Vec<String>>>,
    trending: Mutex<Vec<Candidate>>,
    blocks: Mutex<HashMap<u64, SignedBlock>>,
    properties: Mutex<Option<GlobalProperties>>,
    fail_relationships: Mutex<bool>,
    fail_history: Mutex<bool>,
    pub content_calls: AtomicUsize,
    pub account_calls: AtomicUsize,
    pub follow_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
    pub trending_calls: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_content(&self, candidate: Candidate) {
        self.contents
            .lock()
            .insert((candidate.author.clone(), candidate.permlink.clone()), candidate);
    }

    pub fn put_account(&self, account: AccountSnapshot) {
        self.accounts.lock().insert(account.name.clone(), account);
    }

    pub fn put_history(&self, account: &str, entries: Vec<(u64, HistoryItem)>) {
        self.history.lock().insert(account.to_string(), entries);
    }

    pub fn put_following(&self, account: &str, mut names: Vec<String>) {
        names.sort();
        self.following.lock().insert(account.to_string(), names);
    }

    pub fn put_followers(&self, account: &str, mut names: Vec<String>) {
        names.sort();
        self.followers.lock().insert(account.to_string(), names);
    }

    pub fn put_trending(&self, posts: Vec<Candidate>) {
        *self.trending.lock() = posts;
    }

    pub fn put_block(&self, number: u64, block: SignedBlock) {
        self.blocks.lock().insert(number, block);
    }

    pub fn put_properties(&self, properties: GlobalProperties) {
        *self.properties.lock() = Some(properties);
    }

    pub fn fail_relationships(&self, fail: bool) {
        *self.fail_relationships.lock() = fail;
    }

    pub fn fail_history(&self, fail: bool) {
        *self.fail_history.lock() = fail;
    }

    // Follow lists page like the node: sorted, starting at (and including)
    // `start_after`.
    fn page(
        lists: &Mutex<HashMap<String, Vec<String>>>,
        account: &str,
        start_after: Option<&str>,
        limit: u32,
    ) -> Vec<String> {
        let lists = lists.lock();
        let names = match lists.get(account) {
            Some(names) => names,
            None => return Vec::new(),
        };
        let from = start_after
            .map(|start| names.partition_point(|n| n.as_str() < start))
            .unwrap_or(0);
        names.iter().skip(from).take(limit as usize).cloned().collect()
    }
}

#[async_trait::async_trait]
impl ChainPort for MockChain {
    async fn get_content(&self, author: &str, permlink: &str) -> Result<Candidate> {
        self.content_calls.fetch_add(1, Ordering::SeqCst);
        self.contents
            .lock()
            .get(&(author.to_string(), permlink.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("no content for @{}/{}", author, permlink))
    }

    async fn get_accounts(&self, names: &[String]) -> Result<Vec<AccountSnapshot>> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        let accounts = self.accounts.lock();
        Ok(names.iter().filter_map(|n| accounts.get(n).cloned()).collect())
    }

    async fn get_account_history(
        &self,
        account: &str,
        _start: i64,
        limit: u32,
    ) -> Result<Vec<(u64, HistoryItem)>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_history.lock() {
            return Err(anyhow!("history unavailable"));
        }
        let history = self.history.lock();
        let entries = history.get(account).cloned().unwrap_or_default();
        let skip = entries.len().saturating_sub(limit as usize);
        Ok(entries.into_iter().skip(skip).collect())
    }

    async fn get_following(
        &self,
        account: &str,
        start_after: Option<&str>,
        _kind: &str,
        limit: u32,
    ) -> Result<Vec<FollowEntry>> {
        self.follow_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_relationships.lock() {
            return Err(anyhow!("follow api unavailable"));
        }
        Ok(Self::page(&self.following, account, start_after, limit)
            .into_iter()
            .map(|following| FollowEntry { follower: account.to_string(), following })
            .collect())
    }

    async fn get_followers(
        &self,
        account: &str,
        start_after: Option<&str>,
        _kind: &str,
        limit: u32,
    ) -> Result<Vec<FollowEntry>> {
        self.follow_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_relationships.lock() {
            return Err(anyhow!("follow api unavailable"));
        }
        Ok(Self::page(&self.followers, account, start_after, limit)
            .into_iter()
            .map(|follower| FollowEntry { follower, following: account.to_string() })
            .collect())
    }

    async fn get_discussions_by_trending(&self, _tag: &str, limit: u32) -> Result<Vec<Candidate>> {
        self.trending_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.trending.lock().iter().take(limit as usize).cloned().collect())
    }

    async fn get_dynamic_global_properties(&self) -> Result<GlobalProperties> {
        self.properties
            .lock()
            .clone()
            .ok_or_else(|| anyhow!("no global properties"))
    }

    async fn get_block(&self, number: u64) -> Result<Option<SignedBlock>> {
        Ok(self.blocks.lock().get(&number).cloned())
    }
}

/// Broadcaster with scripted per-voter outcomes. Voters without a script
/// succeed. Every attempt is recorded along with the tokio clock reading.
#[derive(Default)]
pub struct MockBroadcaster {
    scripts: Mutex<HashMap<String, VecDeque<Result<String, BroadcastError>>>>,
    attempts: Mutex<Vec<(tokio::time::Instant, VoteOperation)>>,
}

impl MockBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, voter: &str, outcomes: Vec<Result<String, BroadcastError>>) {
        self.scripts.lock().insert(voter.to_string(), outcomes.into());
    }

    pub fn attempts(&self) -> Vec<(tokio::time::Instant, VoteOperation)> {
        self.attempts.lock().clone()
    }

    pub fn votes(&self) -> Vec<VoteOperation> {
        self.attempts.lock().iter().map(|(_, v)| v.clone()).collect()
    }
}

#[async_trait::async_trait]
impl VoteBroadcastPort for MockBroadcaster {
    async fn broadcast_vote(
        &self,
        _credential: &Credential,
        vote: &VoteOperation,
    ) -> std::result::Result<String, BroadcastError> {
        self.attempts
            .lock()
            .push((tokio::time::Instant::now(), vote.clone()));

        let scripted = self
            .scripts
            .lock()
            .get_mut(&vote.voter)
            .and_then(|outcomes| outcomes.pop_front());

        scripted.unwrap_or_else(|| Ok(format!("mock-tx-{}", vote.voter)))
    }
}
