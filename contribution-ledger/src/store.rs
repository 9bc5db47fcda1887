//! Ledger store: the append-only record sequence
//!
//! Records are addressed by their 0-based position. The store also keeps a
//! per-contributor index and the set of known contributors in first-seen order.
//! Appending is crate-private: the only way in is the combined append
//! transaction in [`crate::state::LedgerState`].

use crate::{
    error::{Error, Result},
    types::{ContributionRecord, ContributorId},
};
use std::collections::HashMap;

/// In-memory record log with secondary indices
#[derive(Debug, Clone, Default)]
pub struct LedgerStore {
    records: Vec<ContributionRecord>,
    by_contributor: HashMap<ContributorId, Vec<u64>>,
    known: Vec<ContributorId>,
}

impl LedgerStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and return its index
    pub(crate) fn append(&mut self, record: ContributionRecord) -> u64 {
        let index = self.count();

        match self.by_contributor.get_mut(&record.contributor) {
            Some(indices) => indices.push(index),
            None => {
                self.known.push(record.contributor.clone());
                self.by_contributor
                    .insert(record.contributor.clone(), vec![index]);
            }
        }

        self.records.push(record);
        index
    }

    /// Record at `index`
    pub fn get(&self, index: u64) -> Result<&ContributionRecord> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.records.get(i))
            .ok_or(Error::IndexOutOfRange {
                index,
                count: self.count(),
            })
    }

    /// Number of records
    pub fn count(&self) -> u64 {
        self.records.len() as u64
    }

    /// Up to `n` most recent records, most recent first
    pub fn latest(&self, n: usize) -> Vec<ContributionRecord> {
        self.records.iter().rev().take(n).cloned().collect()
    }

    /// Indices of all records from `contributor`, ascending
    pub fn indices_by_contributor(&self, contributor: &ContributorId) -> Vec<u64> {
        self.by_contributor
            .get(contributor)
            .cloned()
            .unwrap_or_default()
    }

    /// Distinct contributors in first-seen order
    pub fn known_contributors(&self) -> &[ContributorId] {
        &self.known
    }

    /// Full record sequence in append order
    pub fn records(&self) -> &[ContributionRecord] {
        &self.records
    }
}
