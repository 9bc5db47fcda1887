//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `contribution_records_total` - Records appended
//! - `contribution_value_records_total` - Value-bearing records appended
//! - `contribution_gasless_records_total` - Gasless records appended
//! - `contribution_value_received_total` - Sum of value received (saturating)
//! - `contribution_rejected_total{reason}` - Rejected operations by error kind
//! - `contribution_withdrawals_total` - Successful withdrawals
//! - `contribution_known_contributors` - Distinct contributors
//! - `contribution_append_duration_seconds` - Histogram of append latencies

use crate::types::Amount;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Records appended
    pub records_total: IntCounter,

    /// Value-bearing records appended
    pub value_records_total: IntCounter,

    /// Gasless records appended
    pub gasless_records_total: IntCounter,

    /// Value received
    pub value_received_total: IntCounter,

    /// Rejected operations by reason
    pub rejected_total: IntCounterVec,

    /// Successful withdrawals
    pub withdrawals_total: IntCounter,

    /// Distinct contributors
    pub known_contributors: IntGauge,

    /// Append duration histogram
    pub append_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("records_total", &self.records_total.get())
            .field("withdrawals_total", &self.withdrawals_total.get())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let records_total = IntCounter::new("contribution_records_total", "Records appended")?;
        registry.register(Box::new(records_total.clone()))?;

        let value_records_total = IntCounter::new(
            "contribution_value_records_total",
            "Value-bearing records appended",
        )?;
        registry.register(Box::new(value_records_total.clone()))?;

        let gasless_records_total = IntCounter::new(
            "contribution_gasless_records_total",
            "Gasless records appended",
        )?;
        registry.register(Box::new(gasless_records_total.clone()))?;

        let value_received_total = IntCounter::new(
            "contribution_value_received_total",
            "Sum of value received",
        )?;
        registry.register(Box::new(value_received_total.clone()))?;

        let rejected_total = IntCounterVec::new(
            Opts::new("contribution_rejected_total", "Rejected operations by reason"),
            &["reason"],
        )?;
        registry.register(Box::new(rejected_total.clone()))?;

        let withdrawals_total = IntCounter::new(
            "contribution_withdrawals_total",
            "Successful withdrawals",
        )?;
        registry.register(Box::new(withdrawals_total.clone()))?;

        let known_contributors = IntGauge::new(
            "contribution_known_contributors",
            "Distinct contributors",
        )?;
        registry.register(Box::new(known_contributors.clone()))?;

        let append_duration = Histogram::with_opts(
            HistogramOpts::new(
                "contribution_append_duration_seconds",
                "Histogram of append latencies",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500]),
        )?;
        registry.register(Box::new(append_duration.clone()))?;

        Ok(Self {
            records_total,
            value_records_total,
            gasless_records_total,
            value_received_total,
            rejected_total,
            withdrawals_total,
            known_contributors,
            append_duration,
            registry,
        })
    }

    /// Record one appended record
    pub fn record_append(&self, amount: Amount, is_value_bearing: bool) {
        self.records_total.inc();
        if is_value_bearing {
            self.value_records_total.inc();
            self.value_received_total
                .inc_by(u64::try_from(amount).unwrap_or(u64::MAX));
        } else {
            self.gasless_records_total.inc();
        }
    }

    /// Record a rejected operation
    pub fn record_rejection(&self, reason: &str) {
        self.rejected_total.with_label_values(&[reason]).inc();
    }

    /// Record a successful withdrawal
    pub fn record_withdrawal(&self) {
        self.withdrawals_total.inc();
    }

    /// Update the distinct contributor gauge
    pub fn set_known_contributors(&self, count: usize) {
        self.known_contributors
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Record append duration
    pub fn record_append_duration(&self, duration_seconds: f64) {
        self.append_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
