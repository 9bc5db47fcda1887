//! Contribution ledger server binary

use anyhow::Context;
use contribution_ledger::{spawn_ledger_actor, Collaborators, Config, Ledger};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load configuration: explicit file first, then environment
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("loading config from {}", path))?
            .with_env_overrides()?,
        None => Config::from_env()?,
    };

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        "Starting contribution ledger"
    );

    let mailbox_capacity = config.actor.mailbox_capacity;
    let ledger = Arc::new(Ledger::open(config, Collaborators::default()).context("opening ledger")?);

    let global = ledger.global_stats();
    tracing::info!(
        records = global.total_record_count,
        contributors = global.known_contributors.len(),
        total_value_received = %global.total_value_received,
        custodian = %ledger.policy().custodian,
        "Ledger ready"
    );

    let handle = spawn_ledger_actor(Arc::clone(&ledger), mailbox_capacity);

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down ledger server");
    handle.shutdown().await?;

    if !ledger.verify_aggregates()? {
        tracing::error!("Stats diverged from the record log");
    }

    Ok(())
}
