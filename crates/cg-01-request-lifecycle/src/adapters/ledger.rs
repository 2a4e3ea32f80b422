//! In-memory Ledger
//!
//! Implements `ValueTransfer` over a balance map. Test hooks inject
//! transfer failures and let a recipient run code while being paid.

use crate::ports::outbound::{TransferError, ValueTransfer};
use parking_lot::RwLock;
use shared_types::{short_addr, Address, U256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Code a recipient runs while receiving a payment.
///
/// Returning an error makes the whole transfer fail, including any value
/// the hook moved itself.
pub type RecipientHook = Arc<dyn Fn(&Address, U256) -> Result<(), TransferError> + Send + Sync>;

/// Balance-map ledger with a designated contract account.
///
/// Transfers are not serialized here; callers that let hooks re-enter must
/// hold their own lock across `send`, as the lifecycle engine does.
pub struct InMemoryLedger {
    contract: Address,
    balances: RwLock<HashMap<Address, U256>>,
    /// Recipients whose incoming transfers fail.
    rejecting: RwLock<HashSet<Address>>,
    hooks: RwLock<HashMap<Address, RecipientHook>>,
}

impl InMemoryLedger {
    /// Create a ledger whose contract account is `contract`.
    pub fn new(contract: Address) -> Self {
        Self {
            contract,
            balances: RwLock::new(HashMap::new()),
            rejecting: RwLock::new(HashSet::new()),
            hooks: RwLock::new(HashMap::new()),
        }
    }

    /// The contract account.
    pub fn contract_address(&self) -> Address {
        self.contract
    }

    /// Mint `amount` into `account`.
    pub fn credit(&self, account: Address, amount: U256) {
        let mut balances = self.balances.write();
        let balance = balances.entry(account).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Balance of `account`.
    pub fn balance_of(&self, account: &Address) -> U256 {
        self.balances
            .read()
            .get(account)
            .copied()
            .unwrap_or_default()
    }

    /// Make every transfer to `account` fail until [`Self::accept_transfers_to`].
    pub fn reject_transfers_to(&self, account: Address) {
        self.rejecting.write().insert(account);
    }

    /// Undo [`Self::reject_transfers_to`].
    pub fn accept_transfers_to(&self, account: &Address) {
        self.rejecting.write().remove(account);
    }

    /// Run `hook` whenever `account` is paid.
    pub fn set_recipient_hook(&self, account: Address, hook: RecipientHook) {
        self.hooks.write().insert(account, hook);
    }

    /// Remove the hook of `account`.
    pub fn clear_recipient_hook(&self, account: &Address) {
        self.hooks.write().remove(account);
    }

    fn move_value(&self, from: &Address, to: &Address, amount: U256) -> Result<(), TransferError> {
        let mut balances = self.balances.write();
        let available = balances.get(from).copied().unwrap_or_default();
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        balances.insert(*from, available - amount);
        let target = balances.entry(*to).or_default();
        *target = target.saturating_add(amount);
        Ok(())
    }
}

impl ValueTransfer for InMemoryLedger {
    fn receive(&self, from: &Address, amount: U256) -> Result<(), TransferError> {
        self.move_value(from, &self.contract, amount)?;
        debug!(from = %short_addr(from), %amount, "Value received into contract");
        Ok(())
    }

    fn send(&self, to: &Address, amount: U256) -> Result<(), TransferError> {
        if self.rejecting.read().contains(to) {
            return Err(TransferError::Rejected(format!(
                "{} refuses payments",
                short_addr(to)
            )));
        }

        let hook = self.hooks.read().get(to).cloned();
        let Some(hook) = hook else {
            self.move_value(&self.contract, to, amount)?;
            debug!(to = %short_addr(to), %amount, "Value sent from contract");
            return Ok(());
        };

        // The hook runs with no ledger lock held so it may call back in. A
        // revert restores every balance touched since the snapshot.
        let snapshot = self.balances.read().clone();
        self.move_value(&self.contract, to, amount)?;
        if let Err(err) = hook(to, amount) {
            *self.balances.write() = snapshot;
            debug!(to = %short_addr(to), %err, "Recipient reverted payment");
            return Err(err);
        }

        debug!(to = %short_addr(to), %amount, "Value sent from contract");
        Ok(())
    }

    fn contract_balance(&self) -> U256 {
        self.balance_of(&self.contract)
    }
}
