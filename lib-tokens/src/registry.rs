//! Registry Client
//!
//! The ledger consults an external directory mapping (account, interface)
//! to an implementer address, and the execution environment maps addresses
//! to deployed code. Both are consumed through traits so the ledger never
//! depends on a concrete registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use lib_types::{Address, InterfaceHash};

use crate::hooks::TokenHook;

/// Well-known interface names
pub mod interfaces {
    /// Advertised by the ledger for its own address
    pub const TOKEN: &str = "ERC777Token";
    /// Legacy allowance interface, withdrawn on disable
    pub const LEGACY: &str = "ERC20Token";
    /// Implemented on behalf of accounts that want `tokensToSend`
    pub const TOKENS_SENDER: &str = "ERC777TokensSender";
    /// Implemented on behalf of accounts that want `tokensReceived`
    pub const TOKENS_RECIPIENT: &str = "ERC777TokensRecipient";
}

/// Directory of "who implements interface X for account Y"
pub trait InterfaceRegistry {
    /// Look up the implementer registered for `account`
    fn get_interface_implementer(
        &self,
        account: &Address,
        interface: &InterfaceHash,
    ) -> Option<Address>;

    /// Register an implementer; `None` removes the registration
    fn set_interface_implementer(
        &mut self,
        account: Address,
        interface: InterfaceHash,
        implementer: Option<Address>,
    );
}

/// Execution environment the ledger is embedded in
pub trait Environment: InterfaceRegistry {
    /// Code deployed at `account`, if any. Accounts with code are the
    /// "contract-like" accounts of the receiver policy.
    fn code_at(&self, account: &Address) -> Option<Arc<dyn TokenHook>>;
}

/// In-memory registry and code table
#[derive(Default)]
pub struct MemoryEnvironment {
    implementers: HashMap<(Address, InterfaceHash), Address>,
    code: HashMap<Address, Arc<dyn TokenHook>>,
}

impl fmt::Debug for MemoryEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryEnvironment")
            .field("implementers", &self.implementers.len())
            .field("deployed", &self.code.len())
            .finish()
    }
}

impl MemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place hook code at `address`
    pub fn deploy(&mut self, address: Address, code: Arc<dyn TokenHook>) {
        self.code.insert(address, code);
    }

    /// Register `implementer` for `account` under a named interface
    pub fn register(&mut self, account: Address, interface: &str, implementer: Address) {
        self.set_interface_implementer(account, InterfaceHash::of(interface), Some(implementer));
    }

    /// Remove a named registration
    pub fn unregister(&mut self, account: Address, interface: &str) {
        self.set_interface_implementer(account, InterfaceHash::of(interface), None);
    }
}

impl InterfaceRegistry for MemoryEnvironment {
    fn get_interface_implementer(
        &self,
        account: &Address,
        interface: &InterfaceHash,
    ) -> Option<Address> {
        self.implementers.get(&(*account, *interface)).copied()
    }

    fn set_interface_implementer(
        &mut self,
        account: Address,
        interface: InterfaceHash,
        implementer: Option<Address>,
    ) {
        match implementer {
            // zero is the registry's "nobody"
            Some(implementer) if !implementer.is_zero() => {
                self.implementers.insert((account, interface), implementer);
            }
            _ => {
                self.implementers.remove(&(account, interface));
            }
        }
    }
}

impl Environment for MemoryEnvironment {
    fn code_at(&self, account: &Address) -> Option<Arc<dyn TokenHook>> {
        self.code.get(account).cloned()
    }
}
