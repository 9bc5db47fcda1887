//! Actor-based front for the ledger
//!
//! All state-changing requests go through one task's mailbox, so they are
//! applied in the order they were received. Queries skip the mailbox and read
//! the shared [`Ledger`] directly.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │   Mutations → mailbox        Queries → Arc<Ledger>    │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │     plan → persist (RocksDB) → apply → emit event     │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::{
    types::{Amount, ContributorId},
    Error, Ledger, Result,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Record a value contribution
    SubmitValue {
        caller: ContributorId,
        amount: Amount,
        note: String,
        response: oneshot::Sender<Result<u64>>,
    },

    /// Record a zero-value contribution
    SubmitGasless {
        caller: ContributorId,
        note: String,
        response: oneshot::Sender<Result<u64>>,
    },

    /// Record a batch of zero-value contributions
    SubmitGaslessBatch {
        caller: ContributorId,
        notes: Vec<String>,
        response: oneshot::Sender<Result<Vec<u64>>>,
    },

    /// Move funds to the custodian
    Withdraw {
        caller: ContributorId,
        amount: Amount,
        response: oneshot::Sender<Result<()>>,
    },

    /// Change the minimum value contribution
    SetMinimumContribution {
        caller: ContributorId,
        value: Amount,
        response: oneshot::Sender<Result<()>>,
    },

    /// Hand over the custodian role
    SetCustodian {
        caller: ContributorId,
        custodian: ContributorId,
        response: oneshot::Sender<Result<()>>,
    },

    /// Shutdown actor
    Shutdown {
        response: oneshot::Sender<()>,
    },
}

/// Actor that applies ledger mutations one at a time
#[derive(Debug)]
pub struct LedgerActor {
    ledger: Arc<Ledger>,
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(ledger: Arc<Ledger>, mailbox: mpsc::Receiver<LedgerMessage>) -> Self {
        Self { ledger, mailbox }
    }

    /// Run the actor event loop until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            if let LedgerMessage::Shutdown { response } = msg {
                tracing::info!("Ledger actor shutting down");
                let _ = response.send(());
                break;
            }
            self.handle_message(msg);
        }
    }

    fn handle_message(&self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::SubmitValue {
                caller,
                amount,
                note,
                response,
            } => {
                reply(response, self.ledger.submit_value_contribution(&caller, amount, &note));
            }

            LedgerMessage::SubmitGasless {
                caller,
                note,
                response,
            } => {
                reply(response, self.ledger.submit_gasless_contribution(&caller, &note));
            }

            LedgerMessage::SubmitGaslessBatch {
                caller,
                notes,
                response,
            } => {
                reply(response, self.ledger.submit_gasless_batch(&caller, notes));
            }

            LedgerMessage::Withdraw {
                caller,
                amount,
                response,
            } => {
                reply(response, self.ledger.withdraw(&caller, amount));
            }

            LedgerMessage::SetMinimumContribution {
                caller,
                value,
                response,
            } => {
                reply(response, self.ledger.set_minimum_contribution(&caller, value));
            }

            LedgerMessage::SetCustodian {
                caller,
                custodian,
                response,
            } => {
                reply(response, self.ledger.set_custodian(&caller, &custodian));
            }

            LedgerMessage::Shutdown { .. } => {
                // Handled in run loop
            }
        }
    }
}

fn reply<T>(response: oneshot::Sender<Result<T>>, result: Result<T>) {
    if let Err(e) = &result {
        if matches!(
            e,
            Error::Storage(_) | Error::InvariantViolation(_) | Error::ArithmeticOverflow(_)
        ) {
            tracing::error!(error = %e, "Error handling message");
        }
    }
    let _ = response.send(result);
}

/// Handle for sending messages to the actor
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
    ledger: Arc<Ledger>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>, ledger: Arc<Ledger>) -> Self {
        Self { sender, ledger }
    }

    /// Shared ledger for queries
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Record a value contribution
    pub async fn submit_value_contribution(
        &self,
        caller: ContributorId,
        amount: Amount,
        note: impl Into<String>,
    ) -> Result<u64> {
        let note = note.into();
        self.request(|response| LedgerMessage::SubmitValue {
            caller,
            amount,
            note,
            response,
        })
        .await
    }

    /// Record a zero-value contribution
    pub async fn submit_gasless_contribution(
        &self,
        caller: ContributorId,
        note: impl Into<String>,
    ) -> Result<u64> {
        let note = note.into();
        self.request(|response| LedgerMessage::SubmitGasless {
            caller,
            note,
            response,
        })
        .await
    }

    /// Record a batch of zero-value contributions
    pub async fn submit_gasless_batch(
        &self,
        caller: ContributorId,
        notes: Vec<String>,
    ) -> Result<Vec<u64>> {
        self.request(|response| LedgerMessage::SubmitGaslessBatch {
            caller,
            notes,
            response,
        })
        .await
    }

    /// Move funds to the custodian
    pub async fn withdraw(&self, caller: ContributorId, amount: Amount) -> Result<()> {
        self.request(|response| LedgerMessage::Withdraw {
            caller,
            amount,
            response,
        })
        .await
    }

    /// Change the minimum value contribution
    pub async fn set_minimum_contribution(&self, caller: ContributorId, value: Amount) -> Result<()> {
        self.request(|response| LedgerMessage::SetMinimumContribution {
            caller,
            value,
            response,
        })
        .await
    }

    /// Hand over the custodian role
    pub async fn set_custodian(&self, caller: ContributorId, custodian: ContributorId) -> Result<()> {
        self.request(|response| LedgerMessage::SetCustodian {
            caller,
            custodian,
            response,
        })
        .await
    }

    /// Shutdown actor and wait for it to stop taking messages
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Shutdown { response: tx })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }
}

/// Spawn the ledger actor with a bounded mailbox
pub fn spawn_ledger_actor(ledger: Arc<Ledger>, mailbox_capacity: usize) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity.max(1));
    let actor = LedgerActor::new(Arc::clone(&ledger), rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx, ledger)
}
