//! Main ledger orchestration layer
//!
//! This module ties together the append transaction, access control, storage
//! and the external collaborators into the public contribution API.
//!
//! All mutating operations take the write lock, so they run one at a time in a
//! single total order. Queries take the read lock and can run concurrently, but
//! never see an append whose stats update has not been applied.
//!
//! # Example
//!
//! ```no_run
//! use contribution_ledger::{Collaborators, Config, ContributorId, Ledger};
//!
//! fn main() -> contribution_ledger::Result<()> {
//!     let ledger = Ledger::open(Config::default(), Collaborators::default())?;
//!
//!     let bob = ContributorId::new("bob");
//!     let index = ledger.submit_gasless_contribution(&bob, "reviewed docs")?;
//!     assert_eq!(ledger.get(index)?.contributor, bob);
//!
//!     Ok(())
//! }
//! ```

use crate::{
    access::{AccessController, AccessPolicy},
    clock::{Clock, SystemClock},
    config::LimitsConfig,
    events::{EventKind, EventSink, LedgerEvent, TracingEventSink},
    metrics::Metrics,
    state::LedgerState,
    storage::Storage,
    types::{Amount, ContributionRecord, ContributorId, ContributorStats, GlobalStats, Timestamp},
    vault::{InMemoryVault, ValueTransfer},
    Config, Error, Result,
};
use parking_lot::RwLock;
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

/// External collaborators the ledger calls out to
#[derive(Clone)]
pub struct Collaborators {
    /// Custody of contributed value
    pub vault: Arc<dyn ValueTransfer>,

    /// Timestamp source
    pub clock: Arc<dyn Clock>,

    /// Receiver of ledger events
    pub events: Arc<dyn EventSink>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            vault: Arc::new(InMemoryVault::new()),
            clock: Arc::new(SystemClock::new()),
            events: Arc::new(TracingEventSink),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

struct Inner {
    state: LedgerState,
    access: AccessController,
}

/// Main ledger interface
pub struct Ledger {
    inner: RwLock<Inner>,
    collaborators: Collaborators,
    storage: Option<Storage>,
    limits: LimitsConfig,
    metrics: Metrics,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("records", &self.count())
            .field("storage", &self.storage)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// Open ledger with configuration
    ///
    /// With persistence enabled, the record log is loaded from RocksDB and the
    /// stats are rebuilt by replaying it. The persisted policy wins over the
    /// configured genesis policy.
    pub fn open(config: Config, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let metrics = Metrics::new()?;

        let (storage, records, policy) = if config.persistence_enabled {
            let storage = Storage::open(&config)?;
            let records = storage.load_records()?;
            let policy = match storage.get_policy()? {
                Some(policy) => policy,
                None => {
                    let policy = config.policy.to_policy();
                    storage.put_policy(&policy)?;
                    policy
                }
            };
            (Some(storage), records, policy)
        } else {
            (None, Vec::new(), config.policy.to_policy())
        };

        let state = LedgerState::replay(records)?;
        let access = AccessController::new(policy)?;

        tracing::info!(
            service = %config.service_name,
            records = state.store().count(),
            contributors = state.store().known_contributors().len(),
            custodian = %access.policy().custodian,
            persistent = storage.is_some(),
            "Ledger opened"
        );
        metrics.set_known_contributors(state.store().known_contributors().len());

        Ok(Self {
            inner: RwLock::new(Inner { state, access }),
            collaborators,
            storage,
            limits: config.limits,
            metrics,
        })
    }

    /// Open a ledger that keeps everything in memory
    pub fn in_memory(mut config: Config, collaborators: Collaborators) -> Result<Self> {
        config.persistence_enabled = false;
        Self::open(config, collaborators)
    }

    // Contribution intake

    /// Record a value contribution from `caller`
    ///
    /// The calling context must already have moved `amount` into custody.
    pub fn submit_value_contribution(
        &self,
        caller: &ContributorId,
        amount: Amount,
        note: &str,
    ) -> Result<u64> {
        self.track(self.submit_value(caller, amount, note))
    }

    fn submit_value(&self, caller: &ContributorId, amount: Amount, note: &str) -> Result<u64> {
        check_caller(caller)?;
        self.check_note(note)?;

        let mut inner = self.inner.write();
        inner.access.check_minimum(amount)?;

        let record = ContributionRecord::value(
            caller.clone(),
            amount,
            note,
            self.collaborators.clock.now(),
        );
        let range = self.commit(&mut inner, vec![record])?;
        Ok(range.start)
    }

    /// Record a zero-value contribution from `caller`
    pub fn submit_gasless_contribution(&self, caller: &ContributorId, note: &str) -> Result<u64> {
        self.track(self.submit_gasless(caller, note))
    }

    fn submit_gasless(&self, caller: &ContributorId, note: &str) -> Result<u64> {
        check_caller(caller)?;
        self.check_note(note)?;

        let mut inner = self.inner.write();
        let record = ContributionRecord::gasless(caller.clone(), note, self.collaborators.clock.now());
        let range = self.commit(&mut inner, vec![record])?;
        Ok(range.start)
    }

    /// Record one zero-value contribution per note, all or nothing
    pub fn submit_gasless_batch(&self, caller: &ContributorId, notes: Vec<String>) -> Result<Vec<u64>> {
        self.track(self.submit_batch(caller, notes))
    }

    fn submit_batch(&self, caller: &ContributorId, notes: Vec<String>) -> Result<Vec<u64>> {
        check_caller(caller)?;
        if notes.len() > self.limits.max_batch_size {
            return Err(Error::InputTooLarge {
                field: "batch",
                len: notes.len(),
                max: self.limits.max_batch_size,
            });
        }
        for note in &notes {
            self.check_note(note)?;
        }
        if notes.is_empty() {
            return Ok(Vec::new());
        }

        let mut inner = self.inner.write();
        let records = notes
            .into_iter()
            .map(|note| ContributionRecord::gasless(caller.clone(), note, self.collaborators.clock.now()))
            .collect();
        let range = self.commit(&mut inner, records)?;
        Ok(range.collect())
    }

    // Privileged operations

    /// Move `amount` from custody to the custodian
    pub fn withdraw(&self, caller: &ContributorId, amount: Amount) -> Result<()> {
        self.track(self.withdraw_inner(caller, amount))
    }

    fn withdraw_inner(&self, caller: &ContributorId, amount: Amount) -> Result<()> {
        let inner = self.inner.write();
        inner
            .access
            .withdraw(caller, amount, self.collaborators.vault.as_ref())?;

        let custodian = inner.access.policy().custodian.clone();
        tracing::debug!(custodian = %custodian, amount = %amount, "Withdrawal completed");
        self.metrics.record_withdrawal();
        self.emit(EventKind::FundsWithdrawn { custodian, amount });
        Ok(())
    }

    /// Change the minimum value contribution
    pub fn set_minimum_contribution(&self, caller: &ContributorId, value: Amount) -> Result<()> {
        self.track(self.set_minimum_inner(caller, value))
    }

    fn set_minimum_inner(&self, caller: &ContributorId, value: Amount) -> Result<()> {
        let mut inner = self.inner.write();
        let next = inner.access.propose_minimum(caller, value)?;
        self.persist_policy(&next)?;

        let previous = inner.access.replace(next).minimum_contribution;
        tracing::debug!(previous = %previous, minimum = %value, "Minimum contribution updated");
        self.emit(EventKind::MinimumContributionUpdated {
            previous,
            minimum: value,
        });
        Ok(())
    }

    /// Hand the custodian role to `new_custodian`
    pub fn set_custodian(&self, caller: &ContributorId, new_custodian: &ContributorId) -> Result<()> {
        self.track(self.set_custodian_inner(caller, new_custodian))
    }

    fn set_custodian_inner(&self, caller: &ContributorId, new_custodian: &ContributorId) -> Result<()> {
        let mut inner = self.inner.write();
        let next = inner.access.propose_custodian(caller, new_custodian)?;
        self.persist_policy(&next)?;

        let previous = inner.access.replace(next).custodian;
        tracing::debug!(previous = %previous, custodian = %new_custodian, "Custodian changed");
        self.emit(EventKind::CustodianChanged {
            previous,
            custodian: new_custodian.clone(),
        });
        Ok(())
    }

    // Queries

    /// Record at `index`
    pub fn get(&self, index: u64) -> Result<ContributionRecord> {
        self.inner.read().state.store().get(index).cloned()
    }

    /// Number of records
    pub fn count(&self) -> u64 {
        self.inner.read().state.store().count()
    }

    /// Up to `n` most recent records, most recent first
    pub fn latest(&self, n: usize) -> Vec<ContributionRecord> {
        self.inner.read().state.store().latest(n)
    }

    /// Indices of all records from `contributor`, ascending
    pub fn indices_by_contributor(&self, contributor: &ContributorId) -> Vec<u64> {
        self.inner.read().state.store().indices_by_contributor(contributor)
    }

    /// All records from `contributor` in append order
    pub fn records_by_contributor(&self, contributor: &ContributorId) -> Result<Vec<ContributionRecord>> {
        let inner = self.inner.read();
        let store = inner.state.store();
        store
            .indices_by_contributor(contributor)
            .into_iter()
            .map(|index| store.get(index).cloned())
            .collect()
    }

    /// Stats for `contributor`; zero for unknown contributors
    pub fn stats_for(&self, contributor: &ContributorId) -> ContributorStats {
        self.inner.read().state.aggregator().stats_for(contributor)
    }

    /// Global stats
    pub fn global_stats(&self) -> GlobalStats {
        self.inner.read().state.aggregator().global_stats().clone()
    }

    /// First `limit` contributors in first-seen order (not ranked by amount)
    pub fn top_contributors(&self, limit: usize) -> Vec<(ContributorId, Amount)> {
        self.inner.read().state.aggregator().top_contributors(limit)
    }

    /// Current access policy
    pub fn policy(&self) -> AccessPolicy {
        self.inner.read().access.policy().clone()
    }

    /// Balance held in custody, as reported by the vault
    pub fn available_balance(&self) -> Amount {
        self.collaborators.vault.current_balance()
    }

    /// Rebuild stats from the record log and compare them with the live ones
    pub fn verify_aggregates(&self) -> Result<bool> {
        self.inner.read().state.verify_aggregates()
    }

    /// Digest of the current stats
    pub fn stats_fingerprint(&self) -> [u8; 32] {
        self.inner.read().state.aggregator().fingerprint()
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    // Internals

    /// The append transaction: persist, apply, then notify
    fn commit(&self, inner: &mut Inner, records: Vec<ContributionRecord>) -> Result<Range<u64>> {
        let started = Instant::now();
        let storage = self.storage.as_ref();

        let range = inner.state.commit(records, |first, records| match storage {
            Some(storage) => storage.append_records(first, records),
            None => Ok(()),
        })?;

        let store = inner.state.store();
        for index in range.clone() {
            let record = store.get(index)?;
            self.metrics.record_append(record.amount, record.is_value_bearing);
            self.emit_at(
                record.recorded_at,
                EventKind::ContributionRecorded {
                    index,
                    contributor: record.contributor.clone(),
                    amount: record.amount,
                    is_value_bearing: record.is_value_bearing,
                },
            );
        }

        self.metrics
            .set_known_contributors(store.known_contributors().len());
        self.metrics
            .record_append_duration(started.elapsed().as_secs_f64());

        tracing::debug!(
            first_index = range.start,
            count = range.end - range.start,
            "Records committed"
        );

        Ok(range)
    }

    fn persist_policy(&self, policy: &AccessPolicy) -> Result<()> {
        match &self.storage {
            Some(storage) => storage.put_policy(policy),
            None => Ok(()),
        }
    }

    fn check_note(&self, note: &str) -> Result<()> {
        if note.len() > self.limits.max_note_bytes {
            return Err(Error::InputTooLarge {
                field: "note",
                len: note.len(),
                max: self.limits.max_note_bytes,
            });
        }
        Ok(())
    }

    fn emit(&self, kind: EventKind) {
        self.emit_at(self.collaborators.clock.now(), kind);
    }

    fn emit_at(&self, timestamp: Timestamp, kind: EventKind) {
        self.collaborators
            .events
            .emit(&LedgerEvent::new(timestamp, kind));
    }

    fn track<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if let Error::ArithmeticOverflow(what) = e {
                tracing::error!(accumulator = *what, "Stats overflow, operation aborted");
            }
            self.metrics.record_rejection(e.kind());
        }
        result
    }
}

fn check_caller(caller: &ContributorId) -> Result<()> {
    if caller.is_null() {
        return Err(Error::InvalidIdentity("caller must not be empty".to_string()));
    }
    Ok(())
}
