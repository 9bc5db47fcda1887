//! Error types for the contribution ledger

use crate::types::{Amount, ContributorId};
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Value contribution under the configured threshold
    #[error("Contribution of {amount} is below the minimum of {minimum}")]
    BelowMinimum {
        /// Submitted amount
        amount: Amount,
        /// Current minimum contribution
        minimum: Amount,
    },

    /// Caller is not the custodian
    #[error("Unauthorized: {0} is not the custodian")]
    Unauthorized(ContributorId),

    /// Null or empty identity where a real one is required
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// Query for a record index past the end of the log
    #[error("Record index {index} out of range (count {count})")]
    IndexOutOfRange {
        /// Requested index
        index: u64,
        /// Number of records in the ledger
        count: u64,
    },

    /// Withdrawal amount exceeds the balance held in custody
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// Requested withdrawal
        requested: Amount,
        /// Balance reported by the value-transfer collaborator
        available: Amount,
    },

    /// Value-transfer collaborator reported failure
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    /// A stats accumulator would exceed its representable range
    #[error("Arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    /// Note or batch exceeds the configured bound
    #[error("Input too large: {field} is {len}, maximum is {max}")]
    InputTooLarge {
        /// Which input was too large
        field: &'static str,
        /// Actual size
        len: usize,
        /// Configured bound
        max: usize,
    },

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invariant violation (corrupt log, stats mismatch)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl Error {
    /// Short label used for the rejection metric
    pub fn kind(&self) -> &'static str {
        match self {
            Error::BelowMinimum { .. } => "below_minimum",
            Error::Unauthorized(_) => "unauthorized",
            Error::InvalidIdentity(_) => "invalid_identity",
            Error::IndexOutOfRange { .. } => "index_out_of_range",
            Error::InsufficientBalance { .. } => "insufficient_balance",
            Error::TransferFailed(_) => "transfer_failed",
            Error::ArithmeticOverflow(_) => "arithmetic_overflow",
            Error::InputTooLarge { .. } => "input_too_large",
            Error::Storage(_) => "storage",
            Error::Serialization(_) => "serialization",
            Error::Json(_) => "json",
            Error::InvariantViolation(_) => "invariant_violation",
            Error::Concurrency(_) => "concurrency",
            Error::Config(_) => "config",
            Error::Metrics(_) => "metrics",
            Error::Io(_) => "io",
        }
    }
}
