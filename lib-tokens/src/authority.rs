//! Roles and authority for privileged ledger operations.
//!
//! Who may mint is a collaborator decision; the ledger only answers
//! whether an address holds the role.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use lib_types::Address;

/// Role enumeration for authority checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Ledger owner (legacy disable, role management)
    Owner,
    /// Mint authority
    Minter,
}

/// Authority set: maps roles to sets of authorized addresses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthoritySet {
    authorities: HashMap<Role, BTreeSet<Address>>,
}

impl AuthoritySet {
    /// Create empty authority set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an address to a role. Returns whether it already held the role.
    pub fn add(&mut self, role: Role, address: Address) -> bool {
        !self.authorities.entry(role).or_default().insert(address)
    }

    /// Remove an address from a role. Returns whether it held the role.
    pub fn remove(&mut self, role: Role, address: &Address) -> bool {
        self.authorities
            .get_mut(&role)
            .map(|set| set.remove(address))
            .unwrap_or(false)
    }

    /// Put membership back to a previously observed value
    pub(crate) fn restore(&mut self, role: Role, address: Address, member: bool) {
        if member {
            self.add(role, address);
        } else {
            self.remove(role, &address);
        }
    }

    /// Check if an address has a role
    pub fn has_role(&self, role: Role, address: &Address) -> bool {
        self.authorities
            .get(&role)
            .map(|set| set.contains(address))
            .unwrap_or(false)
    }

    /// Get all addresses for a role
    pub fn addresses(&self, role: Role) -> impl Iterator<Item = &Address> {
        self.authorities
            .get(&role)
            .map(|set| set.iter())
            .into_iter()
            .flatten()
    }
}
