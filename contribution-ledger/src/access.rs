//! Access control: the custodian and the contribution threshold
//!
//! Two roles only, the custodian and everyone else. Authorization is a pure
//! capability check over the policy and the caller; there is no ambient
//! authority.

use crate::{
    error::{Error, Result},
    types::{Amount, ContributorId},
    vault::ValueTransfer,
};
use serde::{Deserialize, Serialize};

/// Privileged identity and value policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    /// Identity allowed to run privileged operations
    pub custodian: ContributorId,

    /// Smallest accepted value-bearing contribution
    pub minimum_contribution: Amount,
}

/// Capability check: is `caller` the custodian under `policy`?
pub fn is_authorized(policy: &AccessPolicy, caller: &ContributorId) -> bool {
    !caller.is_null() && policy.custodian == *caller
}

/// Owner of the [`AccessPolicy`]
#[derive(Debug, Clone)]
pub struct AccessController {
    policy: AccessPolicy,
}

impl AccessController {
    /// Controller over an initial policy
    pub fn new(policy: AccessPolicy) -> Result<Self> {
        if policy.custodian.is_null() {
            return Err(Error::InvalidIdentity(
                "custodian must not be empty".to_string(),
            ));
        }
        Ok(Self { policy })
    }

    /// Current policy
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Ok iff `caller` is the custodian
    pub fn authorize(&self, caller: &ContributorId) -> Result<()> {
        if is_authorized(&self.policy, caller) {
            Ok(())
        } else {
            tracing::warn!(caller = %caller, "Rejected privileged call from non-custodian");
            Err(Error::Unauthorized(caller.clone()))
        }
    }

    /// Check a value contribution against the threshold
    pub fn check_minimum(&self, amount: Amount) -> Result<()> {
        if amount < self.policy.minimum_contribution {
            return Err(Error::BelowMinimum {
                amount,
                minimum: self.policy.minimum_contribution,
            });
        }
        Ok(())
    }

    /// Policy after changing the minimum, without applying it
    pub fn propose_minimum(&self, caller: &ContributorId, value: Amount) -> Result<AccessPolicy> {
        self.authorize(caller)?;
        Ok(AccessPolicy {
            minimum_contribution: value,
            ..self.policy.clone()
        })
    }

    /// Policy after reassigning the custodian, without applying it
    pub fn propose_custodian(
        &self,
        caller: &ContributorId,
        new_custodian: &ContributorId,
    ) -> Result<AccessPolicy> {
        self.authorize(caller)?;
        if new_custodian.is_null() {
            return Err(Error::InvalidIdentity(
                "new custodian must not be empty".to_string(),
            ));
        }
        Ok(AccessPolicy {
            custodian: new_custodian.clone(),
            ..self.policy.clone()
        })
    }

    /// Replace the policy; returns the previous one
    pub(crate) fn replace(&mut self, policy: AccessPolicy) -> AccessPolicy {
        std::mem::replace(&mut self.policy, policy)
    }

    /// Change the minimum contribution; returns the previous value
    pub fn set_minimum_contribution(&mut self, caller: &ContributorId, value: Amount) -> Result<Amount> {
        let next = self.propose_minimum(caller, value)?;
        Ok(self.replace(next).minimum_contribution)
    }

    /// Reassign the custodian; returns the previous custodian
    pub fn set_custodian(
        &mut self,
        caller: &ContributorId,
        new_custodian: &ContributorId,
    ) -> Result<ContributorId> {
        let next = self.propose_custodian(caller, new_custodian)?;
        Ok(self.replace(next).custodian)
    }

    /// Move `amount` out of custody to the custodian
    ///
    /// Only value moves; no ledger or stats state is involved.
    pub fn withdraw(
        &self,
        caller: &ContributorId,
        amount: Amount,
        vault: &dyn ValueTransfer,
    ) -> Result<()> {
        self.authorize(caller)?;

        let available = vault.current_balance();
        if amount > available {
            return Err(Error::InsufficientBalance {
                requested: amount,
                available,
            });
        }

        if let Err(e) = vault.transfer(&self.policy.custodian, amount) {
            let reason = match e {
                Error::TransferFailed(reason) => reason,
                other => other.to_string(),
            };
            tracing::warn!(
                custodian = %self.policy.custodian,
                amount = %amount,
                "Withdrawal transfer failed: {}",
                reason
            );
            return Err(Error::TransferFailed(reason));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::InMemoryVault;

    fn id(s: &str) -> ContributorId {
        ContributorId::new(s)
    }

    fn controller() -> AccessController {
        AccessController::new(AccessPolicy {
            custodian: id("alice"),
            minimum_contribution: 100,
        })
        .unwrap()
    }

    #[test]
    fn test_is_authorized_pure() {
        let policy = AccessPolicy {
            custodian: id("alice"),
            minimum_contribution: 0,
        };
        assert!(is_authorized(&policy, &id("alice")));
        assert!(!is_authorized(&policy, &id("bob")));
        assert!(!is_authorized(&policy, &id("")));
    }

    #[test]
    fn test_empty_initial_custodian_rejected() {
        let result = AccessController::new(AccessPolicy {
            custodian: id(""),
            minimum_contribution: 0,
        });
        assert!(matches!(result, Err(Error::InvalidIdentity(_))));
    }

    #[test]
    fn test_check_minimum_boundary() {
        let access = controller();
        assert!(matches!(
            access.check_minimum(99),
            Err(Error::BelowMinimum { amount: 99, minimum: 100 })
        ));
        assert!(access.check_minimum(100).is_ok());
    }

    #[test]
    fn test_set_minimum() {
        let mut access = controller();
        assert_eq!(access.set_minimum_contribution(&id("alice"), 5).unwrap(), 100);
        assert_eq!(access.policy().minimum_contribution, 5);
    }

    #[test]
    fn test_non_custodian_cannot_change_policy() {
        let mut access = controller();
        let before = access.policy().clone();

        assert!(matches!(
            access.set_minimum_contribution(&id("bob"), 1),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            access.set_custodian(&id("bob"), &id("bob")),
            Err(Error::Unauthorized(_))
        ));
        assert_eq!(access.policy(), &before);
    }

    #[test]
    fn test_set_custodian() {
        let mut access = controller();
        assert!(matches!(
            access.set_custodian(&id("alice"), &id("")),
            Err(Error::InvalidIdentity(_))
        ));

        let previous = access.set_custodian(&id("alice"), &id("carol")).unwrap();
        assert_eq!(previous, id("alice"));
        assert!(access.authorize(&id("carol")).is_ok());
        assert!(access.authorize(&id("alice")).is_err());
    }

    #[test]
    fn test_withdraw() {
        let access = controller();
        let vault = InMemoryVault::with_balance(150);

        assert!(matches!(
            access.withdraw(&id("bob"), 10, &vault),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            access.withdraw(&id("alice"), 200, &vault),
            Err(Error::InsufficientBalance { requested: 200, available: 150 })
        ));
        assert_eq!(vault.current_balance(), 150);

        access.withdraw(&id("alice"), 150, &vault).unwrap();
        assert_eq!(vault.current_balance(), 0);
        assert_eq!(vault.transfers(), vec![(id("alice"), 150)]);
    }

    #[test]
    fn test_withdraw_transfer_failure() {
        let access = controller();
        let vault = InMemoryVault::with_balance(150);
        vault.set_failing(true);

        assert!(matches!(
            access.withdraw(&id("alice"), 50, &vault),
            Err(Error::TransferFailed(_))
        ));
        assert_eq!(vault.current_balance(), 150);
    }
}
