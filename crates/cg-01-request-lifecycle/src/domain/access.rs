//! # Access Policy
//!
//! Owner and gateway identities. Both live here and change only through
//! an owner-authorized call; the lifecycle engine emits the audit event.

use super::errors::LifecycleError;
use super::value_objects::Role;
use serde::{Deserialize, Serialize};
use shared_types::{Address, ZERO_ADDRESS};

/// Role assignment of the contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    owner: Address,
    gateway: Address,
}

impl AccessPolicy {
    /// Create a policy. Neither identity may be the zero address.
    pub fn new(owner: Address, gateway: Address) -> Result<Self, LifecycleError> {
        ensure_nonzero(&owner, "owner")?;
        ensure_nonzero(&gateway, "gateway")?;
        Ok(Self { owner, gateway })
    }

    /// Current owner.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Current gateway.
    pub fn gateway(&self) -> Address {
        self.gateway
    }

    /// Fail unless `caller` is the owner.
    pub fn ensure_owner(&self, caller: &Address) -> Result<(), LifecycleError> {
        ensure_role(caller, &self.owner, Role::Owner)
    }

    /// Fail unless `caller` is the current gateway.
    pub fn ensure_gateway(&self, caller: &Address) -> Result<(), LifecycleError> {
        ensure_role(caller, &self.gateway, Role::Gateway)
    }

    /// Fail unless `caller` submitted the request.
    pub fn ensure_requester(requester: &Address, caller: &Address) -> Result<(), LifecycleError> {
        ensure_role(caller, requester, Role::Requester)
    }

    /// Replace the gateway. Returns the previous one.
    pub fn rotate_gateway(
        &mut self,
        caller: &Address,
        new_gateway: Address,
    ) -> Result<Address, LifecycleError> {
        self.ensure_owner(caller)?;
        ensure_nonzero(&new_gateway, "gateway")?;
        Ok(std::mem::replace(&mut self.gateway, new_gateway))
    }

    /// Hand ownership to `new_owner`. Returns the previous owner.
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<Address, LifecycleError> {
        self.ensure_owner(caller)?;
        ensure_nonzero(&new_owner, "owner")?;
        Ok(std::mem::replace(&mut self.owner, new_owner))
    }
}

fn ensure_role(caller: &Address, holder: &Address, role: Role) -> Result<(), LifecycleError> {
    if caller != holder {
        return Err(LifecycleError::Unauthorized {
            caller: *caller,
            role,
        });
    }
    Ok(())
}

fn ensure_nonzero(address: &Address, what: &str) -> Result<(), LifecycleError> {
    if *address == ZERO_ADDRESS {
        return Err(LifecycleError::invalid_input(format!(
            "{what} cannot be the zero address"
        )));
    }
    Ok(())
}
