//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Value conservation: total received == Σ(value-bearing amounts)
//! - Counting: record count == global total record count
//! - Deterministic replay: Same records → same stats
//! - Ordering: latest(n) is the log tail in reverse

use contribution_ledger::{
    Amount, Collaborators, Config, ContributionRecord, ContributorId, Error, InMemoryVault,
    Ledger, LedgerState, ManualClock, MemoryEventSink,
};
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Submission {
    Value { who: usize, amount: Amount },
    Gasless { who: usize },
}

/// Strategy for generating contributions from a small set of contributors
fn submission_strategy() -> impl Strategy<Value = Submission> {
    prop_oneof![
        (0usize..5, 1u128..1_000_000_000_000u128)
            .prop_map(|(who, amount)| Submission::Value { who, amount }),
        (0usize..5).prop_map(|who| Submission::Gasless { who }),
    ]
}

fn contributor(who: usize) -> ContributorId {
    ContributorId::new(format!("contributor-{}", who))
}

/// In-memory ledger with a manual clock
fn create_test_ledger(minimum: u64) -> Ledger {
    let mut config = Config::default();
    config.policy.custodian = "custodian".to_string();
    config.policy.minimum_contribution = minimum;

    let collaborators = Collaborators {
        vault: Arc::new(InMemoryVault::new()),
        clock: Arc::new(ManualClock::new(0)),
        events: Arc::new(MemoryEventSink::new()),
    };
    Ledger::in_memory(config, collaborators).unwrap()
}

fn apply(ledger: &Ledger, submissions: &[Submission]) {
    for submission in submissions {
        match submission {
            Submission::Value { who, amount } => {
                ledger
                    .submit_value_contribution(&contributor(*who), *amount, "")
                    .unwrap();
            }
            Submission::Gasless { who } => {
                ledger
                    .submit_gasless_contribution(&contributor(*who), "g")
                    .unwrap();
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: Global value total is the sum over value-bearing records
    #[test]
    fn prop_value_conservation(submissions in prop::collection::vec(submission_strategy(), 0..40)) {
        let ledger = create_test_ledger(0);
        apply(&ledger, &submissions);

        let expected: Amount = submissions
            .iter()
            .filter_map(|s| match s {
                Submission::Value { amount, .. } => Some(*amount),
                Submission::Gasless { .. } => None,
            })
            .sum();
        let global = ledger.global_stats();
        prop_assert_eq!(global.total_value_received, expected);

        let per_contributor: Amount = global
            .known_contributors
            .iter()
            .map(|c| ledger.stats_for(c).total_value_received)
            .sum();
        prop_assert_eq!(per_contributor, expected);
    }

    /// Property: Record count matches the global counters
    #[test]
    fn prop_record_counts(submissions in prop::collection::vec(submission_strategy(), 0..40)) {
        let ledger = create_test_ledger(0);
        apply(&ledger, &submissions);

        let global = ledger.global_stats();
        prop_assert_eq!(ledger.count(), submissions.len() as u64);
        prop_assert_eq!(global.total_record_count, ledger.count());

        let gasless = submissions
            .iter()
            .filter(|s| matches!(s, Submission::Gasless { .. }))
            .count() as u64;
        prop_assert_eq!(global.total_gasless_count, gasless);

        for c in &global.known_contributors {
            let stats = ledger.stats_for(c);
            prop_assert_eq!(stats.record_count, ledger.indices_by_contributor(c).len() as u64);
            prop_assert!(stats.gasless_count <= stats.record_count);
        }
    }

    /// Property: Replaying the log reproduces identical stats
    #[test]
    fn prop_deterministic_replay(submissions in prop::collection::vec(submission_strategy(), 0..40)) {
        let ledger = create_test_ledger(0);
        apply(&ledger, &submissions);

        let records: Vec<ContributionRecord> = (0..ledger.count())
            .map(|i| ledger.get(i).unwrap())
            .collect();
        let replayed = LedgerState::replay(records).unwrap();

        prop_assert_eq!(replayed.aggregator().fingerprint(), ledger.stats_fingerprint());
        prop_assert!(ledger.verify_aggregates().unwrap());
    }

    /// Property: latest(n) returns the log tail, most recent first
    #[test]
    fn prop_latest_is_reverse_tail(
        submissions in prop::collection::vec(submission_strategy(), 0..30),
        n in 0usize..40,
    ) {
        let ledger = create_test_ledger(0);
        apply(&ledger, &submissions);

        let latest = ledger.latest(n);
        let count = ledger.count();
        prop_assert_eq!(latest.len() as u64, (n as u64).min(count));
        for (offset, record) in latest.iter().enumerate() {
            let expected = ledger.get(count - 1 - offset as u64).unwrap();
            prop_assert_eq!(record, &expected);
        }
    }

    /// Property: Minimum contribution is inclusive
    #[test]
    fn prop_minimum_boundary(minimum in 1u64..1_000_000, amount in 0u64..2_000_000) {
        let ledger = create_test_ledger(minimum);
        let result = ledger.submit_value_contribution(&contributor(0), Amount::from(amount), "");

        if amount >= minimum {
            prop_assert!(result.is_ok());
            prop_assert_eq!(ledger.count(), 1);
        } else {
            let below_minimum = matches!(result, Err(Error::BelowMinimum { .. }));
            prop_assert!(below_minimum);
            prop_assert_eq!(ledger.count(), 0);
        }
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use contribution_ledger::{spawn_ledger_actor, EventKind};

    fn id(s: &str) -> ContributorId {
        ContributorId::new(s)
    }

    #[test]
    fn test_contribution_lifecycle() {
        let vault = Arc::new(InMemoryVault::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let events = Arc::new(MemoryEventSink::new());

        let mut config = Config::default();
        config.policy.custodian = "alice".to_string();
        config.policy.minimum_contribution = 100;
        let ledger = Ledger::in_memory(
            config,
            Collaborators {
                vault: vault.clone(),
                clock: clock.clone(),
                events: events.clone(),
            },
        )
        .unwrap();

        // 1. Value contribution, funds already in custody
        vault.deposit(150).unwrap();
        assert_eq!(ledger.submit_value_contribution(&id("bob"), 150, "").unwrap(), 0);

        // 2. Volunteer work
        clock.advance(5);
        assert_eq!(ledger.submit_gasless_contribution(&id("bob"), "vol-1").unwrap(), 1);

        let bob = ledger.stats_for(&id("bob"));
        assert_eq!(bob.total_value_received, 150);
        assert_eq!(bob.record_count, 2);
        assert_eq!(bob.gasless_count, 1);
        assert_eq!(bob.value_count(), 1);
        assert_eq!(bob.last_activity_at, 1_005);

        // 3. Overdrawn withdrawal changes nothing
        assert!(matches!(
            ledger.withdraw(&id("alice"), 200),
            Err(Error::InsufficientBalance { .. })
        ));
        assert_eq!(ledger.available_balance(), 150);

        // 4. Full withdrawal
        ledger.withdraw(&id("alice"), 150).unwrap();
        assert_eq!(ledger.available_balance(), 0);
        assert_eq!(vault.transfers(), vec![(id("alice"), 150)]);

        // Withdrawals never touch the log or stats
        assert_eq!(ledger.count(), 2);
        assert_eq!(ledger.global_stats().total_value_received, 150);

        let kinds: Vec<EventKind> = events.events().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds.len(), 3);
        assert!(matches!(kinds[2], EventKind::FundsWithdrawn { amount: 150, .. }));
    }

    #[test]
    fn test_persistent_ledger_survives_restart() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        config.policy.custodian = "alice".to_string();

        let before = {
            let ledger = Ledger::open(config.clone(), Collaborators::default()).unwrap();
            for n in 0..25u128 {
                ledger
                    .submit_value_contribution(&contributor((n % 3) as usize), n + 1, "")
                    .unwrap();
            }
            ledger
                .submit_gasless_batch(&id("carol"), vec!["a".to_string(); 10])
                .unwrap();
            ledger.global_stats()
        };

        let ledger = Ledger::open(config, Collaborators::default()).unwrap();
        assert_eq!(ledger.global_stats(), before);
        assert_eq!(ledger.count(), 35);
        assert_eq!(ledger.global_stats().total_value_received, (1..=25u128).sum::<u128>());
        assert!(ledger.verify_aggregates().unwrap());
    }

    #[tokio::test]
    async fn test_actor_front_end() {
        let ledger = Arc::new(create_test_ledger(10));
        let handle = spawn_ledger_actor(ledger, 8);

        handle
            .submit_value_contribution(id("bob"), 10, "exactly the minimum")
            .await
            .unwrap();
        assert!(matches!(
            handle.submit_value_contribution(id("bob"), 9, "").await,
            Err(Error::BelowMinimum { amount: 9, minimum: 10 })
        ));
        assert!(matches!(
            handle.withdraw(id("bob"), 1).await,
            Err(Error::Unauthorized(_))
        ));

        assert_eq!(handle.ledger().count(), 1);
        assert_eq!(
            handle.ledger().top_contributors(5),
            vec![(id("bob"), 10)]
        );

        handle.shutdown().await.unwrap();
    }
}
