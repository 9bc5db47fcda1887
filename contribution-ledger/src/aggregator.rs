//! Running statistics derived from the record log
//!
//! Stats are updated incrementally from each appended record, never by
//! re-scanning history. Updates are planned with checked arithmetic against the
//! current state first and applied only once the whole plan is valid, so an
//! overflow leaves the aggregator untouched.
//!
//! # Invariants
//!
//! - `total_value_received` = sum of amounts over value-bearing records
//! - `record_count` = `gasless_count` + value-bearing record count
//! - Global totals = sum of per-contributor stats
//! - `known_contributors` holds each contributor once, in first-seen order

use crate::{
    error::{Error, Result},
    types::{Amount, ContributionRecord, ContributorId, ContributorStats, GlobalStats},
};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Per-contributor and global statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregator {
    contributors: HashMap<ContributorId, ContributorStats>,
    global: GlobalStats,
}

/// Validated stats changes for one or more records, ready to apply
#[derive(Debug)]
pub(crate) struct AggregatePlan {
    updated: HashMap<ContributorId, ContributorStats>,
    newly_seen: Vec<ContributorId>,
    totals: (Amount, u64, u64),
}

impl Aggregator {
    /// Empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild stats by replaying a record sequence from empty state
    pub fn replay<'a>(records: impl IntoIterator<Item = &'a ContributionRecord>) -> Result<Self> {
        let mut aggregator = Self::new();
        for record in records {
            aggregator.on_append(record)?;
        }
        Ok(aggregator)
    }

    /// Fold one appended record into the stats
    pub fn on_append(&mut self, record: &ContributionRecord) -> Result<()> {
        let plan = self.plan(std::slice::from_ref(record))?;
        self.apply(plan);
        Ok(())
    }

    /// Compute the stats after `records` without mutating anything
    pub(crate) fn plan(&self, records: &[ContributionRecord]) -> Result<AggregatePlan> {
        let mut updated: HashMap<ContributorId, ContributorStats> = HashMap::new();
        let mut newly_seen = Vec::new();
        let mut total_value = self.global.total_value_received;
        let mut total_records = self.global.total_record_count;
        let mut total_gasless = self.global.total_gasless_count;

        for record in records {
            let current = match updated.get(&record.contributor) {
                Some(stats) => *stats,
                None => match self.contributors.get(&record.contributor) {
                    Some(stats) => *stats,
                    None => {
                        newly_seen.push(record.contributor.clone());
                        ContributorStats::default()
                    }
                },
            };

            let mut next = current;
            next.record_count = checked(current.record_count.checked_add(1), "record_count")?;
            total_records = checked(total_records.checked_add(1), "total_record_count")?;

            if record.is_value_bearing {
                next.total_value_received = checked(
                    current.total_value_received.checked_add(record.amount),
                    "total_value_received",
                )?;
                total_value = checked(
                    total_value.checked_add(record.amount),
                    "global total_value_received",
                )?;
            } else {
                next.gasless_count = checked(current.gasless_count.checked_add(1), "gasless_count")?;
                total_gasless = checked(total_gasless.checked_add(1), "total_gasless_count")?;
            }
            next.last_activity_at = record.recorded_at;

            updated.insert(record.contributor.clone(), next);
        }

        Ok(AggregatePlan {
            updated,
            newly_seen,
            totals: (total_value, total_records, total_gasless),
        })
    }

    /// Commit a plan produced by [`Aggregator::plan`] on this same state
    pub(crate) fn apply(&mut self, plan: AggregatePlan) {
        let (total_value, total_records, total_gasless) = plan.totals;

        self.contributors.extend(plan.updated);
        self.global.known_contributors.extend(plan.newly_seen);
        self.global.total_value_received = total_value;
        self.global.total_record_count = total_records;
        self.global.total_gasless_count = total_gasless;
    }

    /// Stats for `contributor`; zero for unknown contributors
    pub fn stats_for(&self, contributor: &ContributorId) -> ContributorStats {
        self.contributors
            .get(contributor)
            .copied()
            .unwrap_or_default()
    }

    /// Global stats
    pub fn global_stats(&self) -> &GlobalStats {
        &self.global
    }

    /// First `limit` contributors with their totals, in first-seen order
    ///
    /// This is NOT a ranking by amount. Callers that need the largest
    /// contributors must request all entries and sort them.
    pub fn top_contributors(&self, limit: usize) -> Vec<(ContributorId, Amount)> {
        self.global
            .known_contributors
            .iter()
            .take(limit)
            .map(|id| (id.clone(), self.stats_for(id).total_value_received))
            .collect()
    }

    /// SHA-256 over all stats in first-seen order
    ///
    /// Two aggregators built from the same record sequence have the same
    /// fingerprint.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.global.total_value_received.to_be_bytes());
        hasher.update(self.global.total_record_count.to_be_bytes());
        hasher.update(self.global.total_gasless_count.to_be_bytes());

        for id in &self.global.known_contributors {
            let stats = self.stats_for(id);
            hasher.update((id.as_str().len() as u64).to_be_bytes());
            hasher.update(id.as_str().as_bytes());
            hasher.update(stats.total_value_received.to_be_bytes());
            hasher.update(stats.record_count.to_be_bytes());
            hasher.update(stats.gasless_count.to_be_bytes());
            hasher.update(stats.last_activity_at.to_be_bytes());
        }

        hasher.finalize().into()
    }
}

fn checked<T>(value: Option<T>, what: &'static str) -> Result<T> {
    value.ok_or(Error::ArithmeticOverflow(what))
}
