use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use drphil_core::constants::{FOLLOW_KIND, FOLLOW_PAGE_SIZE, RELATIONSHIP_INVALIDATION_PROBABILITY};
use rand::Rng;
use tracing::{debug, warn};

use crate::ports::ChainPort;
use crate::state::SharedStateHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Following,
    Followers,
}

/// Lazily loaded follow graph of the managed accounts.
///
/// Each list is fetched in full the first time it is needed and cached in
/// shared state. Every lookup may randomly drop the cached list so it gets
/// reloaded later.
pub struct RelationshipCache {
    chain: Arc<dyn ChainPort>,
    state: SharedStateHandle,
    invalidation_probability: f64,
}

impl RelationshipCache {
    pub fn new(chain: Arc<dyn ChainPort>, state: SharedStateHandle) -> Self {
        Self::with_invalidation(chain, state, RELATIONSHIP_INVALIDATION_PROBABILITY)
    }

    pub fn with_invalidation(
        chain: Arc<dyn ChainPort>,
        state: SharedStateHandle,
        invalidation_probability: f64,
    ) -> Self {
        Self {
            chain,
            state,
            invalidation_probability: invalidation_probability.clamp(0.0, 1.0),
        }
    }

    /// Does `voter` follow `author`?
    pub async fn is_following(&self, voter: &str, author: &str) -> bool {
        self.contains(Direction::Following, voter, author).await
    }

    /// Does `author` follow `voter`?
    pub async fn is_follower(&self, voter: &str, author: &str) -> bool {
        self.contains(Direction::Followers, voter, author).await
    }

    async fn contains(&self, direction: Direction, voter: &str, other: &str) -> bool {
        self.maybe_invalidate(direction, voter);

        let cached = {
            let state = self.state.lock();
            let lists = match direction {
                Direction::Following => &state.following,
                Direction::Followers => &state.followers,
            };
            lists.get(voter).map(|names| names.contains(other))
        };
        if let Some(found) = cached {
            return found;
        }

        match self.load(direction, voter).await {
            Ok(names) => {
                let found = names.contains(other);
                let mut state = self.state.lock();
                let lists = match direction {
                    Direction::Following => &mut state.following,
                    Direction::Followers => &mut state.followers,
                };
                lists.insert(voter.to_string(), names);
                found
            }
            Err(e) => {
                warn!("Could not load {:?} for {}: {}", direction, voter, e);
                false
            }
        }
    }

    fn maybe_invalidate(&self, direction: Direction, voter: &str) {
        if !rand::thread_rng().gen_bool(self.invalidation_probability) {
            return;
        }
        let mut state = self.state.lock();
        let removed = match direction {
            Direction::Following => state.following.remove(voter),
            Direction::Followers => state.followers.remove(voter),
        };
        if removed.is_some() {
            debug!("Dropped cached {:?} for {}", direction, voter);
        }
    }

    // Pages restart at the last name seen; the node includes it again, so
    // paging stops once a page adds nothing new.
    async fn load(&self, direction: Direction, voter: &str) -> Result<HashSet<String>> {
        let mut names = HashSet::new();
        let mut start: Option<String> = None;

        loop {
            let page = match direction {
                Direction::Following => {
                    self.chain
                        .get_following(voter, start.as_deref(), FOLLOW_KIND, FOLLOW_PAGE_SIZE)
                        .await?
                }
                Direction::Followers => {
                    self.chain
                        .get_followers(voter, start.as_deref(), FOLLOW_KIND, FOLLOW_PAGE_SIZE)
                        .await?
                }
            };

            let before = names.len();
            let mut last = None;
            for entry in page {
                let name = match direction {
                    Direction::Following => entry.following,
                    Direction::Followers => entry.follower,
                };
                last = Some(name.clone());
                names.insert(name);
            }

            if names.len() == before {
                break;
            }
            start = last;
        }

        debug!("Loaded {} {:?} entries for {}", names.len(), direction, voter);
        Ok(names)
    }
}
