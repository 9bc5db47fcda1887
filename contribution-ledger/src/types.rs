//! Core types for the contribution ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Exact integer arithmetic (no floating point money)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Value amount in the smallest unit of the custody system
pub type Amount = u128;

/// Timestamp in nanoseconds since the Unix epoch
pub type Timestamp = i64;

/// Opaque, already-authenticated contributor identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContributorId(String);

impl ContributorId {
    /// Create new contributor ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The null identity: empty or whitespace only
    pub fn is_null(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ContributorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContributorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A single entry in the contribution log
///
/// Immutable once appended; identified only by its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionRecord {
    /// Who contributed
    pub contributor: ContributorId,

    /// Value received (0 for gasless contributions)
    pub amount: Amount,

    /// Clock timestamp at append time
    pub recorded_at: Timestamp,

    /// Free-form note, bounded by `LimitsConfig::max_note_bytes`
    pub note: String,

    /// Whether the record carries value
    pub is_value_bearing: bool,
}

impl ContributionRecord {
    /// Value-bearing record
    pub fn value(
        contributor: ContributorId,
        amount: Amount,
        note: impl Into<String>,
        recorded_at: Timestamp,
    ) -> Self {
        Self {
            contributor,
            amount,
            recorded_at,
            note: note.into(),
            is_value_bearing: true,
        }
    }

    /// Zero-value record
    pub fn gasless(contributor: ContributorId, note: impl Into<String>, recorded_at: Timestamp) -> Self {
        Self {
            contributor,
            amount: 0,
            recorded_at,
            note: note.into(),
            is_value_bearing: false,
        }
    }

    /// Timestamp as a UTC datetime
    pub fn recorded_at_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.recorded_at)
    }

    /// SHA-256 over the canonical (bincode) encoding
    pub fn digest(&self) -> crate::Result<[u8; 32]> {
        let bytes = bincode::serialize(self)?;
        Ok(Sha256::digest(&bytes).into())
    }
}

/// Running statistics for one contributor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorStats {
    /// Sum of amounts over value-bearing records
    pub total_value_received: Amount,

    /// All records
    pub record_count: u64,

    /// Zero-value records
    pub gasless_count: u64,

    /// Timestamp of the most recent record (0 before any)
    pub last_activity_at: Timestamp,
}

impl ContributorStats {
    /// Number of value-bearing records
    pub fn value_count(&self) -> u64 {
        self.record_count - self.gasless_count
    }
}

/// Running statistics over the whole ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalStats {
    /// Sum over all contributors
    pub total_value_received: Amount,

    /// Number of records in the ledger
    pub total_record_count: u64,

    /// Number of zero-value records
    pub total_gasless_count: u64,

    /// Distinct contributors in first-seen order
    pub known_contributors: Vec<ContributorId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_identity() {
        assert!(ContributorId::new("").is_null());
        assert!(ContributorId::new("   ").is_null());
        assert!(!ContributorId::new("alice").is_null());
    }

    #[test]
    fn test_gasless_record_has_zero_amount() {
        let record = ContributionRecord::gasless(ContributorId::new("carol"), "vol-1", 42);
        assert_eq!(record.amount, 0);
        assert!(!record.is_value_bearing);
        assert_eq!(record.recorded_at_utc().timestamp_nanos_opt(), Some(42));
    }

    #[test]
    fn test_digest_is_deterministic() {
        let a = ContributionRecord::value(ContributorId::new("bob"), 150, "thanks", 7);
        let b = a.clone();
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());

        let c = ContributionRecord::value(ContributorId::new("bob"), 151, "thanks", 7);
        assert_ne!(a.digest().unwrap(), c.digest().unwrap());
    }

    #[test]
    fn test_value_count() {
        let stats = ContributorStats {
            total_value_received: 10,
            record_count: 5,
            gasless_count: 2,
            last_activity_at: 0,
        };
        assert_eq!(stats.value_count(), 3);
    }
}
