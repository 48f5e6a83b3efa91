//! Token ledger - caller-facing surface
//!
//! # Call pipeline
//!
//! ```text
//! send(caller, from, to, amount)
//!     │
//!     ├── 1. push call stack, take journal checkpoint
//!     │
//!     ├── 2. require_authorized(caller, from)
//!     │
//!     ├── 3. tokensToSend(from)          [may reenter]
//!     │
//!     ├── 4. balances.transfer(from, to)  [fresh balance check]
//!     │
//!     ├── 5. tokensReceived(to)           [may reenter]
//!     │
//!     └── 6. pop; on error revert to checkpoint
//! ```
//!
//! # Invariants
//!
//! - A failed top-level call leaves no trace: balances, supply, operators,
//!   allowances, roles, compatibility, events and registry writes are
//!   restored to the checkpoint
//! - A reentrant call sees every effect already applied by the calls
//!   enclosing it, and commits into the enclosing call's journal
//! - Checks are re-evaluated on every call; nothing is cached across a hook

use lib_types::{Address, Amount, InterfaceHash};

use crate::authority::Role;
use crate::calls::CallStack;
use crate::compat::CompatibilityState;
use crate::config::LedgerConfig;
use crate::errors::{TokenError, TokenResult};
use crate::events::LedgerEvent;
use crate::hooks::HookCall;
use crate::journal::{Checkpoint, JournalEntry};
use crate::registry::{interfaces, Environment};
use crate::state::LedgerState;

/// A single granular fungible token
pub struct TokenLedger {
    /// The ledger's own account
    address: Address,
    config: LedgerConfig,
    pub(crate) state: LedgerState,
    env: Box<dyn Environment>,
    call_stack: CallStack,
}

impl std::fmt::Debug for TokenLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenLedger")
            .field("address", &self.address)
            .field("symbol", &self.config.symbol)
            .field("total_supply", &self.state.balances.total_supply())
            .field("compatibility", &self.state.compatibility)
            .field("call_depth", &self.call_stack.current_depth())
            .finish_non_exhaustive()
    }
}

impl TokenLedger {
    /// Create a ledger at `address`, owned by `owner`.
    ///
    /// Advertises the ledger in the registry under both the token and the
    /// legacy interface. The owner receives the `Owner` and `Minter` roles.
    pub fn new(
        address: Address,
        owner: Address,
        config: LedgerConfig,
        mut env: Box<dyn Environment>,
    ) -> TokenResult<Self> {
        config
            .validate()
            .map_err(|e| TokenError::InvalidConfig(e.to_string()))?;

        env.set_interface_implementer(address, InterfaceHash::of(interfaces::TOKEN), Some(address));
        env.set_interface_implementer(address, InterfaceHash::of(interfaces::LEGACY), Some(address));

        let mut state = LedgerState::new(config.granularity_amount());
        state.authorities.add(Role::Owner, owner);
        state.authorities.add(Role::Minter, owner);

        tracing::info!(
            "Created ledger {} ({}) at {:?}, granularity {}",
            config.name,
            config.symbol,
            address,
            config.granularity
        );

        Ok(Self {
            address,
            call_stack: CallStack::new(config.max_call_depth),
            config,
            state,
            env,
        })
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn symbol(&self) -> &str {
        &self.config.symbol
    }

    pub fn granularity(&self) -> Amount {
        self.state.balances.granularity()
    }

    pub fn total_supply(&self) -> Amount {
        self.state.balances.total_supply()
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.state.balances.balance_of(account)
    }

    /// True if `operator` may move `holder`'s tokens
    pub fn is_operator_for(&self, operator: &Address, holder: &Address) -> bool {
        self.state.operators.is_operator_for(operator, holder)
    }

    pub fn compatibility(&self) -> CompatibilityState {
        self.state.compatibility
    }

    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.state.authorities.has_role(role, account)
    }

    /// Events of every committed call, oldest first
    pub fn events(&self) -> &[LedgerEvent] {
        &self.state.events
    }

    /// Number of ledger calls currently in progress
    pub fn call_depth(&self) -> u16 {
        self.call_stack.current_depth()
    }

    pub fn environment(&self) -> &dyn Environment {
        self.env.as_ref()
    }

    /// Register (or with `None`, withdraw) an implementer for `account`.
    ///
    /// Only the account itself may change its registrations, and the
    /// ledger's own advertisements are managed by the ledger alone. Inside a
    /// hook the write belongs to the enclosing call and is undone if that
    /// call aborts.
    pub fn set_interface_implementer(
        &mut self,
        caller: &Address,
        account: &Address,
        interface: &str,
        implementer: Option<Address>,
    ) -> TokenResult<()> {
        self.atomic("set_interface_implementer", |ledger| {
            if caller != account || *account == ledger.address {
                return Err(TokenError::NotAuthorized {
                    operator: *caller,
                    holder: *account,
                });
            }
            ledger.write_interface(*account, InterfaceHash::of(interface), implementer);
            Ok(())
        })
    }

    /// Re-check conservation and granularity across the whole ledger
    pub fn verify_invariants(&self) -> TokenResult<()> {
        self.state.balances.verify()
    }

    // =========================================================================
    // Atomic boundary
    // =========================================================================

    /// Run `f` as one all-or-nothing call
    pub(crate) fn atomic<T>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut Self) -> TokenResult<T>,
    ) -> TokenResult<T> {
        let depth = self.call_stack.push(operation)?;
        let checkpoint = self.state.journal.checkpoint();

        let result = f(self);
        self.call_stack.pop();

        match result {
            Ok(value) => {
                if depth == 1 {
                    self.state.journal.clear();
                }
                Ok(value)
            }
            Err(e) => {
                if depth == 1 {
                    tracing::warn!("{} aborted: {}", operation, e);
                } else {
                    tracing::debug!("{} aborted at depth {}: {}", operation, depth, e);
                }
                self.revert_to(checkpoint);
                Err(e)
            }
        }
    }

    fn revert_to(&mut self, checkpoint: Checkpoint) {
        let undone = self.state.journal.unwind(checkpoint);
        tracing::debug!(
            "reverting {} journal entries, {} remain",
            undone.len(),
            self.state.journal.len()
        );
        for entry in undone {
            if let Some(JournalEntry::Interface {
                account,
                interface,
                previous,
            }) = self.state.restore(entry)
            {
                self.env.set_interface_implementer(account, interface, previous);
            }
        }
    }

    /// Journaled registry write
    pub(crate) fn write_interface(
        &mut self,
        account: Address,
        interface: InterfaceHash,
        implementer: Option<Address>,
    ) {
        let previous = self.env.get_interface_implementer(&account, &interface);
        self.state.journal.record(JournalEntry::Interface {
            account,
            interface,
            previous,
        });
        self.env.set_interface_implementer(account, interface, implementer);
    }

    pub(crate) fn require_role(&self, role: Role, account: &Address) -> TokenResult<()> {
        if !self.has_role(role, account) {
            return Err(TokenError::MissingRole {
                role,
                account: *account,
            });
        }
        Ok(())
    }

    fn emit_legacy_transfer(&mut self, from: Address, to: Address, amount: Amount) {
        if self.state.compatibility.is_enabled() {
            self.state.emit(LedgerEvent::Transfer { from, to, amount });
        }
    }

    // =========================================================================
    // Mint / send / burn
    // =========================================================================

    /// Create `amount` tokens in `to`. Requires `Minter`.
    ///
    /// Notifies the recipient's `tokensReceived` after the credit.
    pub fn mint(
        &mut self,
        caller: &Address,
        to: &Address,
        amount: Amount,
        operator_data: &[u8],
    ) -> TokenResult<()> {
        self.atomic("mint", |ledger| {
            ledger.require_role(Role::Minter, caller)?;
            ledger.state.balances.require_multiple(amount)?;
            if to.is_zero() {
                return Err(TokenError::InvalidRecipient(*to));
            }

            let state = &mut ledger.state;
            state.balances.mint(&mut state.journal, to, amount)?;
            state.emit(LedgerEvent::Minted {
                operator: *caller,
                to: *to,
                amount,
                operator_data: operator_data.to_vec(),
            });
            ledger.emit_legacy_transfer(Address::ZERO, *to, amount);

            let call = HookCall {
                operator: *caller,
                from: Address::ZERO,
                to: *to,
                amount,
                data: Vec::new(),
                operator_data: operator_data.to_vec(),
            };
            ledger.notify_recipient(&call, true)
        })
    }

    /// Move `amount` from `from` to `to` on behalf of `caller`.
    ///
    /// `caller` must be `from` or one of its operators.
    pub fn send(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
        data: &[u8],
        operator_data: &[u8],
    ) -> TokenResult<()> {
        self.atomic("send", |ledger| {
            ledger.state.operators.require_authorized(caller, from)?;
            ledger.state.balances.require_multiple(amount)?;
            if to.is_zero() {
                return Err(TokenError::InvalidRecipient(*to));
            }

            let call = HookCall {
                operator: *caller,
                from: *from,
                to: *to,
                amount,
                data: data.to_vec(),
                operator_data: operator_data.to_vec(),
            };
            ledger.notify_sender(&call)?;

            let state = &mut ledger.state;
            state.balances.transfer(&mut state.journal, from, to, amount)?;
            state.emit(LedgerEvent::Sent {
                operator: *caller,
                from: *from,
                to: *to,
                amount,
                data: call.data.clone(),
                operator_data: call.operator_data.clone(),
            });
            ledger.emit_legacy_transfer(*from, *to, amount);

            ledger.notify_recipient(&call, true)
        })
    }

    /// Destroy `amount` of `holder`'s tokens on behalf of `caller`.
    ///
    /// Notifies the holder's `tokensToSend` before the debit; there is no
    /// recipient to notify.
    pub fn burn(
        &mut self,
        caller: &Address,
        holder: &Address,
        amount: Amount,
        holder_data: &[u8],
        operator_data: &[u8],
    ) -> TokenResult<()> {
        self.atomic("burn", |ledger| {
            ledger.state.operators.require_authorized(caller, holder)?;
            ledger.state.balances.require_multiple(amount)?;

            let call = HookCall {
                operator: *caller,
                from: *holder,
                to: Address::ZERO,
                amount,
                data: holder_data.to_vec(),
                operator_data: operator_data.to_vec(),
            };
            ledger.notify_sender(&call)?;

            let state = &mut ledger.state;
            state.balances.burn(&mut state.journal, holder, amount)?;
            state.emit(LedgerEvent::Burned {
                operator: *caller,
                from: *holder,
                amount,
                holder_data: call.data.clone(),
                operator_data: call.operator_data.clone(),
            });
            ledger.emit_legacy_transfer(*holder, Address::ZERO, amount);
            Ok(())
        })
    }

    // =========================================================================
    // Operators
    // =========================================================================

    /// Let `operator` move the caller's tokens
    pub fn authorize_operator(&mut self, caller: &Address, operator: &Address) -> TokenResult<()> {
        self.atomic("authorize_operator", |ledger| {
            let state = &mut ledger.state;
            if state.operators.authorize(&mut state.journal, caller, operator) {
                state.emit(LedgerEvent::AuthorizedOperator {
                    operator: *operator,
                    holder: *caller,
                });
            }
            Ok(())
        })
    }

    /// Withdraw `operator`'s right to move the caller's tokens
    pub fn revoke_operator(&mut self, caller: &Address, operator: &Address) -> TokenResult<()> {
        self.atomic("revoke_operator", |ledger| {
            let state = &mut ledger.state;
            if state.operators.revoke(&mut state.journal, caller, operator) {
                state.emit(LedgerEvent::RevokedOperator {
                    operator: *operator,
                    holder: *caller,
                });
            }
            Ok(())
        })
    }

    // =========================================================================
    // Roles
    // =========================================================================

    /// Grant `role` to `account`. Requires `Owner`.
    pub fn grant_role(&mut self, caller: &Address, role: Role, account: &Address) -> TokenResult<()> {
        self.atomic("grant_role", |ledger| {
            ledger.require_role(Role::Owner, caller)?;
            if ledger.state.grant(role, *account) {
                ledger.state.emit(LedgerEvent::RoleGranted {
                    role,
                    account: *account,
                });
            }
            Ok(())
        })
    }

    /// Remove `role` from `account`. Requires `Owner`.
    pub fn revoke_role(&mut self, caller: &Address, role: Role, account: &Address) -> TokenResult<()> {
        self.atomic("revoke_role", |ledger| {
            ledger.require_role(Role::Owner, caller)?;
            if ledger.state.revoke(role, account) {
                ledger.state.emit(LedgerEvent::RoleRevoked {
                    role,
                    account: *account,
                });
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryEnvironment;

    const GRANULARITY: u64 = 10_000_000_000_000_000;
    const ONE: Amount = 1_000_000_000_000_000_000;

    fn addr(id: u8) -> Address {
        Address::new([id; 32])
    }

    fn owner() -> Address {
        addr(1)
    }

    fn ledger() -> TokenLedger {
        let config = LedgerConfig::new("ReferenceToken", "XRT", GRANULARITY);
        TokenLedger::new(addr(100), owner(), config, Box::new(MemoryEnvironment::new())).unwrap()
    }

    #[test]
    fn test_new_advertises_interfaces() {
        let ledger = ledger();
        let env = ledger.environment();

        assert_eq!(
            env.get_interface_implementer(&addr(100), &InterfaceHash::of(interfaces::TOKEN)),
            Some(addr(100))
        );
        assert_eq!(
            env.get_interface_implementer(&addr(100), &InterfaceHash::of(interfaces::LEGACY)),
            Some(addr(100))
        );
        assert_eq!(ledger.name(), "ReferenceToken");
        assert_eq!(ledger.symbol(), "XRT");
        assert_eq!(ledger.granularity(), Amount::from(GRANULARITY));
        assert_eq!(ledger.total_supply(), 0);
        assert!(ledger.has_role(Role::Owner, &owner()));
        assert!(ledger.has_role(Role::Minter, &owner()));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = LedgerConfig::new("ReferenceToken", "XRT", 0);
        let result = TokenLedger::new(addr(100), owner(), config, Box::new(MemoryEnvironment::new()));
        assert!(matches!(result, Err(TokenError::InvalidConfig(_))));
    }

    #[test]
    fn test_mint_requires_minter() {
        let mut ledger = ledger();

        let result = ledger.mint(&addr(2), &addr(2), ONE, b"");
        assert_eq!(
            result,
            Err(TokenError::MissingRole {
                role: Role::Minter,
                account: addr(2)
            })
        );

        ledger.mint(&owner(), &addr(2), ONE, b"").unwrap();
        assert_eq!(ledger.balance_of(&addr(2)), ONE);
        assert_eq!(ledger.total_supply(), ONE);
    }

    #[test]
    fn test_mint_emits_both_events_while_legacy_enabled() {
        let mut ledger = ledger();
        ledger.mint(&owner(), &addr(2), ONE, b"issued").unwrap();

        assert_eq!(
            ledger.events(),
            &[
                LedgerEvent::Minted {
                    operator: owner(),
                    to: addr(2),
                    amount: ONE,
                    operator_data: b"issued".to_vec(),
                },
                LedgerEvent::Transfer {
                    from: Address::ZERO,
                    to: addr(2),
                    amount: ONE,
                },
            ]
        );
    }

    #[test]
    fn test_mint_to_zero_address() {
        let mut ledger = ledger();
        let result = ledger.mint(&owner(), &Address::ZERO, ONE, b"");
        assert_eq!(result, Err(TokenError::InvalidRecipient(Address::ZERO)));
    }

    #[test]
    fn test_send_by_holder() {
        let mut ledger = ledger();
        ledger.mint(&owner(), &addr(2), ONE, b"").unwrap();

        ledger.send(&addr(2), &addr(2), &addr(3), ONE / 4, b"memo", b"").unwrap();

        assert_eq!(ledger.balance_of(&addr(2)), ONE - ONE / 4);
        assert_eq!(ledger.balance_of(&addr(3)), ONE / 4);
        assert_eq!(ledger.total_supply(), ONE);
        assert!(ledger.verify_invariants().is_ok());
    }

    #[test]
    fn test_send_failures_leave_state_unchanged() {
        let mut ledger = ledger();
        ledger.mint(&owner(), &addr(2), ONE, b"").unwrap();
        let events = ledger.events().len();

        assert_eq!(
            ledger.send(&addr(3), &addr(2), &addr(3), ONE, b"", b""),
            Err(TokenError::NotAuthorized {
                operator: addr(3),
                holder: addr(2)
            })
        );
        assert!(matches!(
            ledger.send(&addr(2), &addr(2), &addr(3), 1, b"", b""),
            Err(TokenError::Granularity { .. })
        ));
        assert_eq!(
            ledger.send(&addr(2), &addr(2), &addr(3), 2 * ONE, b"", b""),
            Err(TokenError::InsufficientBalance {
                have: ONE,
                need: 2 * ONE
            })
        );
        assert_eq!(
            ledger.send(&addr(2), &addr(2), &Address::ZERO, ONE, b"", b""),
            Err(TokenError::InvalidRecipient(Address::ZERO))
        );

        assert_eq!(ledger.balance_of(&addr(2)), ONE);
        assert_eq!(ledger.balance_of(&addr(3)), 0);
        assert_eq!(ledger.events().len(), events);
        assert_eq!(ledger.call_depth(), 0);
    }

    #[test]
    fn test_operator_send_and_burn() {
        let mut ledger = ledger();
        ledger.mint(&owner(), &addr(2), ONE, b"").unwrap();
        ledger.authorize_operator(&addr(2), &addr(5)).unwrap();
        assert!(ledger.is_operator_for(&addr(5), &addr(2)));

        ledger.send(&addr(5), &addr(2), &addr(3), ONE / 2, b"", b"op").unwrap();
        ledger.burn(&addr(5), &addr(2), ONE / 4, b"", b"op").unwrap();

        assert_eq!(ledger.balance_of(&addr(2)), ONE / 4);
        assert_eq!(ledger.total_supply(), ONE - ONE / 4);

        ledger.revoke_operator(&addr(2), &addr(5)).unwrap();
        assert!(!ledger.is_operator_for(&addr(5), &addr(2)));
        assert!(matches!(
            ledger.burn(&addr(5), &addr(2), ONE / 4, b"", b""),
            Err(TokenError::NotAuthorized { .. })
        ));
    }

    #[test]
    fn test_operator_events_only_on_change() {
        let mut ledger = ledger();
        ledger.authorize_operator(&addr(2), &addr(5)).unwrap();
        ledger.authorize_operator(&addr(2), &addr(5)).unwrap();
        ledger.authorize_operator(&addr(2), &addr(2)).unwrap();
        ledger.revoke_operator(&addr(2), &addr(6)).unwrap();

        assert_eq!(
            ledger.events(),
            &[LedgerEvent::AuthorizedOperator {
                operator: addr(5),
                holder: addr(2)
            }]
        );
    }

    #[test]
    fn test_burn_insufficient_balance() {
        let mut ledger = ledger();
        ledger.mint(&owner(), &addr(2), ONE, b"").unwrap();

        let result = ledger.burn(&addr(2), &addr(2), 2 * ONE, b"", b"");
        assert_eq!(
            result,
            Err(TokenError::InsufficientBalance {
                have: ONE,
                need: 2 * ONE
            })
        );
        assert_eq!(ledger.total_supply(), ONE);
    }

    #[test]
    fn test_role_management() {
        let mut ledger = ledger();

        assert!(matches!(
            ledger.grant_role(&addr(2), Role::Minter, &addr(2)),
            Err(TokenError::MissingRole { role: Role::Owner, .. })
        ));

        ledger.grant_role(&owner(), Role::Minter, &addr(2)).unwrap();
        ledger.mint(&addr(2), &addr(3), ONE, b"").unwrap();

        ledger.revoke_role(&owner(), Role::Minter, &addr(2)).unwrap();
        assert!(matches!(
            ledger.mint(&addr(2), &addr(3), ONE, b""),
            Err(TokenError::MissingRole { role: Role::Minter, .. })
        ));
    }

    #[test]
    fn test_failed_call_discards_registry_write() {
        let mut ledger = ledger();
        let legacy = InterfaceHash::of(interfaces::LEGACY);

        let result = ledger.atomic("test", |ledger| {
            let address = ledger.address();
            ledger.write_interface(address, legacy, None);
            Err::<(), _>(TokenError::Overflow)
        });

        assert_eq!(result, Err(TokenError::Overflow));
        assert_eq!(
            ledger.environment().get_interface_implementer(&addr(100), &legacy),
            Some(addr(100))
        );
    }

    #[test]
    fn test_nested_failure_only_reverts_inner_call() {
        let mut ledger = ledger();
        ledger.mint(&owner(), &addr(2), ONE, b"").unwrap();

        ledger
            .atomic("outer", |ledger| {
                ledger.send(&addr(2), &addr(2), &addr(3), ONE / 2, b"", b"")?;
                let inner = ledger.send(&addr(2), &addr(2), &addr(3), ONE, b"", b"");
                assert!(inner.is_err());
                Ok(())
            })
            .unwrap();

        assert_eq!(ledger.balance_of(&addr(2)), ONE / 2);
        assert_eq!(ledger.balance_of(&addr(3)), ONE / 2);
        assert!(ledger.state.journal.len() == 0);
    }

    #[test]
    fn test_call_depth_limit() {
        let config = LedgerConfig::new("Shallow", "SH", 1).with_max_call_depth(1);
        let mut ledger =
            TokenLedger::new(addr(100), owner(), config, Box::new(MemoryEnvironment::new())).unwrap();

        let result = ledger.atomic("outer", |ledger| ledger.mint(&owner(), &addr(2), 1, b""));
        assert_eq!(result, Err(TokenError::CallDepthExceeded { depth: 2, max: 1 }));
        assert_eq!(ledger.total_supply(), 0);
    }
}
