use std::sync::Arc;

use drphil_core::Weight;

use crate::relationships::RelationshipCache;
use crate::rules::{AccountLists, VotingRules};

/// Picks the vote weight a voter uses on an author.
///
/// First match wins: favorites (per-author override, else the favorites
/// weight), then accounts the voter follows, then accounts following the
/// voter, then the base weight.
pub struct WeightResolver {
    rules: Arc<VotingRules>,
    lists: Arc<AccountLists>,
    relationships: Arc<RelationshipCache>,
}

impl WeightResolver {
    pub fn new(
        rules: Arc<VotingRules>,
        lists: Arc<AccountLists>,
        relationships: Arc<RelationshipCache>,
    ) -> Self {
        Self { rules, lists, relationships }
    }

    pub async fn weight(&self, author: &str, voter: &str) -> Weight {
        if self.lists.is_favorite(author) {
            return self
                .lists
                .favorite_weights
                .get(author)
                .copied()
                .unwrap_or(self.rules.favorites_vote_weight);
        }

        if self.relationships.is_following(voter, author).await {
            return self.rules.following_vote_weight;
        }

        if self.relationships.is_follower(voter, author).await {
            return self.rules.followers_vote_weight;
        }

        self.rules.vote_weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockChain;
    use crate::state::new_shared_state;
    use std::sync::atomic::Ordering;

    fn resolver(chain: Arc<MockChain>, lists: AccountLists) -> WeightResolver {
        let rules = VotingRules {
            vote_weight: 1_000,
            favorites_vote_weight: 9_000,
            following_vote_weight: 5_000,
            followers_vote_weight: 3_000,
            ..Default::default()
        };
        let relationships = Arc::new(RelationshipCache::with_invalidation(chain, new_shared_state(), 0.0));
        WeightResolver::new(Arc::new(rules), Arc::new(lists), relationships)
    }

    #[tokio::test]
    async fn test_favorite_beats_following() {
        let chain = Arc::new(MockChain::new());
        chain.put_following("bot", vec!["alice".into(), "dave".into()]);
        chain.put_followers("bot", vec!["erin".into()]);

        let mut lists = AccountLists::default();
        lists.set_favorites(["alice", "carol:25"]);
        let resolver = resolver(chain.clone(), lists);

        assert_eq!(resolver.weight("alice", "bot").await, 9_000);
        assert_eq!(resolver.weight("carol", "bot").await, 2_500);
        assert_eq!(resolver.weight("dave", "bot").await, 5_000);
        assert_eq!(resolver.weight("erin", "bot").await, 3_000);
        assert_eq!(resolver.weight("zed", "bot").await, 1_000);
    }

    #[tokio::test]
    async fn test_favorites_skip_relationship_lookups() {
        let chain = Arc::new(MockChain::new());
        let mut lists = AccountLists::default();
        lists.set_favorites(["alice"]);
        let resolver = resolver(chain.clone(), lists);

        resolver.weight("alice", "bot").await;
        assert_eq!(chain.follow_calls.load(Ordering::SeqCst), 0);
    }
}
