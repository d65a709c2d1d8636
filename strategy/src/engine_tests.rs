/// Tests for the event entry point with an in-memory chain
#[cfg(test)]
mod engine_tests {
    use crate::adapters::{MockBroadcaster, MockChain};
    use crate::ports::TelemetryPort;
    use crate::rules::{AccountLists, VotingMode, VotingRules};
    use crate::scheduler::{SchedulerTiming, TaskOutcome};
    use crate::{EngineParts, VoteEngine};
    use chrono::Utc;
    use drphil_core::{AccountSnapshot, Candidate, Credential};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingTelemetry {
        seen: AtomicUsize,
        considered: AtomicUsize,
        votes: AtomicUsize,
        skips: AtomicUsize,
    }

    impl TelemetryPort for CountingTelemetry {
        fn log_event_seen(&self) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
        fn log_event_considered(&self) {
            self.considered.fetch_add(1, Ordering::SeqCst);
        }
        fn log_skip(&self, _reason: &'static str) {
            self.skips.fetch_add(1, Ordering::SeqCst);
        }
        fn log_duplicate_task(&self) {}
        fn log_vote_cast(&self) {
            self.votes.fetch_add(1, Ordering::SeqCst);
        }
        fn log_vote_failed(&self, _class: &'static str) {}
        fn log_pending_tasks(&self, _pending: usize) {}
        fn log_wasted_power(&self, _hundredths: u32) {}
    }

    fn engine(rules: VotingRules, lists: AccountLists) -> (VoteEngine, Arc<MockChain>, Arc<MockBroadcaster>, Arc<CountingTelemetry>) {
        let chain = Arc::new(MockChain::new());
        chain.put_account(AccountSnapshot {
            name: "bot".into(),
            voting_power: 9_000,
            last_vote_time: Utc::now(),
            post_count: 100,
        });
        let broadcaster = Arc::new(MockBroadcaster::new());
        let telemetry = Arc::new(CountingTelemetry::default());

        let mut credentials = HashMap::new();
        credentials.insert("bot".to_string(), Credential::new("5Kbot"));

        let engine = VoteEngine::new(EngineParts {
            chain: chain.clone(),
            broadcaster: broadcaster.clone(),
            rules,
            lists,
            credentials,
            telemetry: Some(telemetry.clone()),
            journal: None,
            timing: SchedulerTiming::default(),
        });
        (engine, chain, broadcaster, telemetry)
    }

    fn post(author: &str) -> Candidate {
        Candidate {
            author: author.into(),
            permlink: "post".into(),
            parent_permlink: "life".into(),
            created: Some(Utc::now()),
            cashout_time: Some(Utc::now() + chrono::Duration::days(7)),
            max_accepted_payout: Some("1000000.000 SBD".into()),
            author_reputation: 50_000_000_000,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_to_vote() {
        let (engine, chain, broadcaster, telemetry) = engine(VotingRules::default(), AccountLists::default());
        chain.put_content(post("alice"));
        engine.startup().await.unwrap();
        assert_eq!(engine.power().power("bot"), Some(9_000));

        let outcome = engine.process_event(post("alice"), None).await.unwrap().await.unwrap();

        assert_eq!(outcome, TaskOutcome::Voted { votes: 1 });
        assert_eq!(broadcaster.votes().len(), 1);
        assert_eq!(telemetry.seen.load(Ordering::SeqCst), 1);
        assert_eq!(telemetry.considered.load(Ordering::SeqCst), 1);
        assert_eq!(telemetry.votes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skipped_account_never_scheduled() {
        let mut lists = AccountLists::default();
        lists.skip_accounts.insert("spammer".into());
        let (engine, chain, broadcaster, telemetry) = engine(VotingRules::default(), lists);
        chain.put_content(post("spammer"));

        assert!(engine.process_event(post("spammer"), None).await.is_none());
        assert_eq!(telemetry.seen.load(Ordering::SeqCst), 1);
        assert_eq!(telemetry.considered.load(Ordering::SeqCst), 0);
        assert!(broadcaster.attempts().is_empty());
        assert_eq!(chain.content_calls.load(Ordering::SeqCst), 0);
        assert_eq!(chain.account_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_zero_weights_do_nothing() {
        let rules = VotingRules {
            vote_weight: 0,
            favorites_vote_weight: 0,
            following_vote_weight: 0,
            followers_vote_weight: 0,
            ..Default::default()
        };
        let (engine, chain, broadcaster, _) = engine(rules, AccountLists::default());
        assert_eq!(engine.rules().mode, VotingMode::Disabled);

        chain.put_content(post("alice"));
        assert!(engine.process_event(post("alice"), None).await.is_none());
        assert!(broadcaster.attempts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_reported_to_telemetry() {
        let (engine, chain, _, telemetry) = engine(VotingRules::default(), AccountLists::default());
        chain.put_content(Candidate { max_accepted_payout: Some("0.000 SBD".into()), ..post("alice") });

        let outcome = engine.process_event(post("alice"), None).await.unwrap().await.unwrap();

        assert!(matches!(outcome, TaskOutcome::Skipped(_)));
        assert_eq!(telemetry.skips.load(Ordering::SeqCst), 1);
    }
}
