//! Contribution Ledger
//!
//! Append-only ledger of contributions with per-contributor and global
//! statistics, plus custodian-gated control of funds held in custody.
//!
//! # Architecture
//!
//! - **Append-only log**: Records are never modified or removed
//! - **Derived stats**: Aggregates are a pure function of the log and are
//!   rebuilt by replay on open
//! - **Atomic appends**: Log append and stats update commit together or not at all
//! - **Single writer**: Mutations are totally ordered; reads run concurrently
//!
//! # Invariants
//!
//! - Total value received equals the sum of value-bearing record amounts
//! - Record count equals the global total record count
//! - Replaying the log reproduces identical stats
//! - Only the custodian can withdraw or change policy

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod access;
pub mod actor;
pub mod aggregator;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
pub mod metrics;
pub mod state;
pub mod storage;
pub mod store;
pub mod types;
pub mod vault;

// Re-exports
pub use access::{is_authorized, AccessController, AccessPolicy};
pub use actor::{spawn_ledger_actor, LedgerHandle};
pub use aggregator::Aggregator;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
pub use events::{
    BroadcastEventSink, EventKind, EventSink, JsonLinesEventSink, LedgerEvent, MemoryEventSink,
    TracingEventSink,
};
pub use ledger::{Collaborators, Ledger};
pub use metrics::Metrics;
pub use state::LedgerState;
pub use storage::Storage;
pub use store::LedgerStore;
pub use types::{
    Amount, ContributionRecord, ContributorId, ContributorStats, GlobalStats, Timestamp,
};
pub use vault::{InMemoryVault, ValueTransfer};
