//! Value-transfer collaborator
//!
//! The ledger never holds value itself. It asks the collaborator for the balance
//! in custody and requests transfers out of it; moving value in is the calling
//! context's job.

use crate::{
    error::{Error, Result},
    types::{Amount, ContributorId},
};
use parking_lot::Mutex;

/// External custody of contributed value
pub trait ValueTransfer: Send + Sync {
    /// Balance currently held in custody
    fn current_balance(&self) -> Amount;

    /// Transfer `amount` out of custody to `to`
    ///
    /// Must be synchronous: it either completes or fails before returning.
    fn transfer(&self, to: &ContributorId, amount: Amount) -> Result<()>;
}

/// In-process custody balance
///
/// Used by tests and by deployments where the ledger process itself tracks
/// custody. Transfers can be made to fail for fault-injection.
#[derive(Debug, Default)]
pub struct InMemoryVault {
    inner: Mutex<VaultState>,
}

#[derive(Debug, Default)]
struct VaultState {
    balance: Amount,
    failing: bool,
    transfers: Vec<(ContributorId, Amount)>,
}

impl InMemoryVault {
    /// Empty vault
    pub fn new() -> Self {
        Self::default()
    }

    /// Vault holding `balance`
    pub fn with_balance(balance: Amount) -> Self {
        let vault = Self::new();
        vault.inner.lock().balance = balance;
        vault
    }

    /// Credit value moved into custody by the calling context
    pub fn deposit(&self, amount: Amount) -> Result<Amount> {
        let mut state = self.inner.lock();
        state.balance = state
            .balance
            .checked_add(amount)
            .ok_or(Error::ArithmeticOverflow("vault balance"))?;
        Ok(state.balance)
    }

    /// Make every following transfer fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().failing = failing;
    }

    /// Completed transfers, oldest first
    pub fn transfers(&self) -> Vec<(ContributorId, Amount)> {
        self.inner.lock().transfers.clone()
    }
}

impl ValueTransfer for InMemoryVault {
    fn current_balance(&self) -> Amount {
        self.inner.lock().balance
    }

    fn transfer(&self, to: &ContributorId, amount: Amount) -> Result<()> {
        let mut state = self.inner.lock();

        if state.failing {
            return Err(Error::TransferFailed("transfer rejected by vault".to_string()));
        }

        let available = state.balance;
        state.balance = available.checked_sub(amount).ok_or_else(|| {
            Error::TransferFailed(format!(
                "vault holds {} but {} was requested",
                available, amount
            ))
        })?;
        state.transfers.push((to.clone(), amount));

        Ok(())
    }
}
