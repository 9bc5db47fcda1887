//! The append transaction
//!
//! `LedgerState` pairs the record log with its aggregates. The only way to
//! add records is [`LedgerState::commit`], which validates the aggregate update,
//! runs the durability hook, and then applies log-append and stats-update
//! together. A failure at any step leaves both untouched.

use crate::{
    aggregator::Aggregator,
    error::{Error, Result},
    store::LedgerStore,
    types::ContributionRecord,
};
use std::ops::Range;

/// Record log plus derived stats, always in step
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    store: LedgerStore,
    aggregator: Aggregator,
}

impl LedgerState {
    /// Empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a persisted record sequence
    pub fn replay(records: Vec<ContributionRecord>) -> Result<Self> {
        let mut state = Self::new();
        state.commit(records, |_, _| Ok(()))?;
        Ok(state)
    }

    /// Append `records` atomically; returns their index range
    ///
    /// `persist` receives the first index and the records after the stats
    /// update has been validated and before anything is applied in memory.
    pub fn commit<F>(&mut self, records: Vec<ContributionRecord>, persist: F) -> Result<Range<u64>>
    where
        F: FnOnce(u64, &[ContributionRecord]) -> Result<()>,
    {
        let first = self.store.count();
        let end = first
            .checked_add(records.len() as u64)
            .ok_or(Error::ArithmeticOverflow("record index"))?;

        let plan = self.aggregator.plan(&records)?;
        persist(first, &records)?;

        self.aggregator.apply(plan);
        for record in records {
            self.store.append(record);
        }

        Ok(first..end)
    }

    /// Record log
    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// Aggregates
    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Rebuild the stats from the log and compare with the live ones
    pub fn verify_aggregates(&self) -> Result<bool> {
        let rebuilt = Aggregator::replay(self.store.records())?;
        Ok(rebuilt == self.aggregator
            && self.store.known_contributors() == rebuilt.global_stats().known_contributors.as_slice()
            && rebuilt.global_stats().total_record_count == self.store.count())
    }
}
