#[cfg(test)]
mod eligibility_tests {
    use crate::adapters::MockChain;
    use crate::author_throttle::AuthorThrottle;
    use crate::relationships::RelationshipCache;
    use crate::rules::{AccountLists, ReputationFloor, VotingMode, VotingRules};
    use crate::safety::eligibility::{EligibilityFilter, SkipReason};
    use crate::state::new_shared_state;
    use crate::weight::WeightResolver;
    use chrono::{Duration, Utc};
    use drphil_core::{AccountSnapshot, ActiveVote, Candidate, HistoryItem, Operation, VoteOperation};
    use std::sync::Arc;

    const ESTABLISHED: i64 = 50_000_000_000; // ~40.3

    fn filter(chain: Arc<MockChain>, rules: VotingRules, lists: AccountLists) -> EligibilityFilter {
        let state = new_shared_state();
        let rules = Arc::new(rules);
        let lists = Arc::new(lists);
        let voters = vec!["bot".to_string(), "bot2".to_string()];
        let relationships = Arc::new(RelationshipCache::with_invalidation(chain.clone(), state.clone(), 0.0));
        let weights = Arc::new(WeightResolver::new(rules.clone(), lists.clone(), relationships));
        let throttle = Arc::new(AuthorThrottle::new(
            chain.clone(),
            state.clone(),
            voters.clone(),
            rules.unique_author_cooldown(),
        ));
        EligibilityFilter::new(chain, state, rules, lists, weights, throttle, voters)
    }

    fn post(author: &str) -> Candidate {
        Candidate {
            author: author.into(),
            permlink: "a-post".into(),
            parent_permlink: "life".into(),
            created: Some(Utc::now()),
            cashout_time: Some(Utc::now() + Duration::days(7)),
            json_metadata: r#"{"tags":["life"],"app":"steemit/0.1"}"#.into(),
            max_accepted_payout: Some("1000000.000 SBD".into()),
            percent_backed_dollars: Some(10_000),
            author_reputation: ESTABLISHED,
            ..Default::default()
        }
    }

    fn eligible() -> Vec<String> {
        vec!["bot".into(), "bot2".into()]
    }

    #[tokio::test]
    async fn test_may_consider_gates() {
        let chain = Arc::new(MockChain::new());
        let mut lists = AccountLists::default();
        lists.skip_accounts.insert("spammer".into());
        lists.skip_tags.insert("nsfw".into());
        let f = filter(chain.clone(), VotingRules::default(), lists);

        assert!(f.may_consider(&post("alice")).await);
        assert!(!f.may_consider(&post("spammer")).await);

        let comment = Candidate { parent_author: "bob".into(), ..post("alice") };
        assert!(!f.may_consider(&comment).await);

        let category = Candidate { parent_permlink: "nsfw".into(), ..post("alice") };
        assert!(!f.may_consider(&category).await);

        let tagged = Candidate { json_metadata: r#"{"tags":["art","nsfw"]}"#.into(), ..post("alice") };
        assert!(!f.may_consider(&tagged).await);
    }

    #[tokio::test]
    async fn test_may_consider_only_apps_and_disabled_mode() {
        let chain = Arc::new(MockChain::new());
        let mut lists = AccountLists::default();
        lists.only_apps.insert("busy".into());
        let f = filter(chain.clone(), VotingRules::default(), lists);
        assert!(!f.may_consider(&post("alice")).await);

        let disabled = filter(
            chain,
            VotingRules { mode: VotingMode::Disabled, ..Default::default() },
            AccountLists::default(),
        );
        assert!(!disabled.may_consider(&post("alice")).await);
    }

    #[tokio::test]
    async fn test_may_consider_needs_positive_weight() {
        let chain = Arc::new(MockChain::new());
        chain.put_following("bot2", vec!["alice".into()]);
        let rules = VotingRules {
            vote_weight: 0,
            following_vote_weight: 2_500,
            ..Default::default()
        };
        let f = filter(chain, rules, AccountLists::default());

        assert!(f.may_consider(&post("alice")).await);
        assert!(!f.may_consider(&post("stranger")).await);
    }

    #[tokio::test]
    async fn test_cashout_passed_checked_first() {
        let f = filter(Arc::new(MockChain::new()), VotingRules::default(), AccountLists::default());
        let expired = Candidate {
            cashout_time: Some(Utc::now() - Duration::minutes(1)),
            max_accepted_payout: Some("0.000 SBD".into()),
            ..post("alice")
        };
        assert!(matches!(
            f.should_skip(&expired, &eligible()).await,
            Some(SkipReason::CashoutPassed(_))
        ));
    }

    #[tokio::test]
    async fn test_declined_payout_skipped_even_for_favorites() {
        let mut lists = AccountLists::default();
        lists.set_favorites(["alice"]);
        let f = filter(Arc::new(MockChain::new()), VotingRules::default(), lists);

        let declined = Candidate { max_accepted_payout: Some("0.000 SBD".into()), ..post("alice") };
        assert_eq!(f.should_skip(&declined, &eligible()).await, Some(SkipReason::PayoutDeclined));
    }

    #[tokio::test]
    async fn test_favorites_bypass_floor_but_not_ceiling() {
        let mut lists = AccountLists::default();
        lists.set_favorites(["newbie", "whale"]);
        let rules = VotingRules { min_rep: ReputationFloor::Fixed(30.0), max_rep: 60.0, ..Default::default() };
        let f = filter(Arc::new(MockChain::new()), rules, lists);

        let low = Candidate { author_reputation: 0, ..post("newbie") };
        assert_eq!(f.should_skip(&low, &eligible()).await, None);

        let high = Candidate { author_reputation: 1_000_000_000_000_000, ..post("whale") };
        assert!(matches!(
            f.should_skip(&high, &eligible()).await,
            Some(SkipReason::HighReputation(rep)) if rep > 60.0
        ));

        let stranger = Candidate { author_reputation: 0, ..post("stranger") };
        assert!(matches!(
            f.should_skip(&stranger, &eligible()).await,
            Some(SkipReason::LowReputation(rep)) if (rep - 25.0).abs() < 1e-9
        ));
    }

    #[tokio::test]
    async fn test_dynamic_floor_from_trending() {
        let chain = Arc::new(MockChain::new());
        chain.put_trending(vec![
            Candidate { author_reputation: 3_000_000_000, ..Default::default() },
            Candidate { author_reputation: 800_000_000_000, ..Default::default() },
        ]);
        let rules = VotingRules { min_rep: ReputationFloor::Dynamic { sample: 10 }, ..Default::default() };
        let f = filter(chain, rules, AccountLists::default());

        let low = Candidate { author_reputation: 1_000_000_000, ..post("alice") };
        assert!(matches!(
            f.should_skip(&low, &eligible()).await,
            Some(SkipReason::LowDynamicReputation(_))
        ));
        assert_eq!(f.should_skip(&post("bob"), &eligible()).await, None);
    }

    #[tokio::test]
    async fn test_no_eligible_voters() {
        let f = filter(Arc::new(MockChain::new()), VotingRules::default(), AccountLists::default());
        assert_eq!(f.should_skip(&post("alice"), &[]).await, Some(SkipReason::NoEligibleVoters));
    }

    #[tokio::test]
    async fn test_signals_and_existing_votes() {
        let mut lists = AccountLists::default();
        lists.flag_signals.insert("cheetah".into());
        lists.vote_signals.insert("curie".into());
        let f = filter(Arc::new(MockChain::new()), VotingRules::default(), lists);

        let flagged = Candidate {
            active_votes: vec![ActiveVote { voter: "cheetah".into(), percent: -100 }],
            ..post("alice")
        };
        assert_eq!(
            f.should_skip(&flagged, &eligible()).await,
            Some(SkipReason::FlagSignal(vec!["cheetah".into()]))
        );

        // An upvote from a flag signal account is not a flag.
        let upvoted_by_flagger = Candidate {
            active_votes: vec![ActiveVote { voter: "cheetah".into(), percent: 100 }],
            ..post("alice")
        };
        assert_eq!(f.should_skip(&upvoted_by_flagger, &eligible()).await, None);

        let signalled = Candidate {
            active_votes: vec![ActiveVote { voter: "curie".into(), percent: 10_000 }],
            ..post("alice")
        };
        assert_eq!(
            f.should_skip(&signalled, &eligible()).await,
            Some(SkipReason::VoteSignal(vec!["curie".into()]))
        );

        let voted = Candidate {
            active_votes: vec![ActiveVote { voter: "bot2".into(), percent: 10_000 }],
            ..post("alice")
        };
        assert_eq!(f.should_skip(&voted, &eligible()).await, Some(SkipReason::AlreadyVoted));
        assert_eq!(f.should_skip(&voted, &["bot".to_string()]).await, None);
    }

    #[tokio::test]
    async fn test_first_post_only() {
        let chain = Arc::new(MockChain::new());
        chain.put_account(AccountSnapshot {
            name: "veteran".into(),
            voting_power: 10_000,
            last_vote_time: Utc::now(),
            post_count: 40,
        });
        chain.put_account(AccountSnapshot {
            name: "newbie".into(),
            voting_power: 10_000,
            last_vote_time: Utc::now(),
            post_count: 1,
        });
        let rules = VotingRules { only_first_posts: true, ..Default::default() };
        let f = filter(chain, rules, AccountLists::default());

        assert_eq!(f.should_skip(&post("veteran"), &eligible()).await, Some(SkipReason::NotFirstPost));
        assert_eq!(f.should_skip(&post("newbie"), &eligible()).await, None);
        assert!(matches!(
            f.should_skip(&post("ghost"), &eligible()).await,
            Some(SkipReason::AuthorLookupFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_fully_powered_up_required() {
        let rules = VotingRules { only_fully_powered_up: true, ..Default::default() };
        let f = filter(Arc::new(MockChain::new()), rules, AccountLists::default());

        assert_eq!(f.should_skip(&post("alice"), &eligible()).await, Some(SkipReason::NotFullyPoweredUp));
        let powered = Candidate { percent_backed_dollars: Some(0), ..post("alice") };
        assert_eq!(f.should_skip(&powered, &eligible()).await, None);
    }

    #[tokio::test]
    async fn test_unique_author_cooldown() {
        let chain = Arc::new(MockChain::new());
        chain.put_history(
            "bot",
            vec![(
                7,
                HistoryItem {
                    timestamp: Utc::now() - Duration::minutes(30),
                    op: Operation::Vote(VoteOperation {
                        voter: "bot".into(),
                        author: "alice".into(),
                        permlink: "older-post".into(),
                        weight: 10_000,
                    }),
                },
            )],
        );
        let rules = VotingRules { unique_author: Some(60), ..Default::default() };
        let f = filter(chain, rules, AccountLists::default());

        assert_eq!(
            f.should_skip(&post("alice"), &eligible()).await,
            Some(SkipReason::AuthorCooldown { author: "alice".into(), minutes: 60 })
        );
        assert_eq!(f.should_skip(&post("bob"), &eligible()).await, None);
    }
}
