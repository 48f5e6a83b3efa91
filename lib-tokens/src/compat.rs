//! Compatibility Layer
//!
//! Legacy allowance-based interface on top of the same balance sheet.
//! Legacy moves skip the hook dispatcher entirely but are still subject to
//! granularity and balance checks.
//!
//! # State machine
//!
//! ```text
//! Enabled ──disable()──► Disabled
//! ```
//!
//! There is no transition back. Once disabled, every legacy call fails with
//! `CompatibilityDisabled` and the ledger is no longer advertised under the
//! legacy interface.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use lib_types::{Address, Amount, InterfaceHash};

use crate::authority::Role;
use crate::errors::{TokenError, TokenResult};
use crate::events::LedgerEvent;
use crate::journal::{Journal, JournalEntry};
use crate::ledger::TokenLedger;
use crate::registry::interfaces;

/// Legacy interface state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompatibilityState {
    Enabled,
    Disabled,
}

impl CompatibilityState {
    pub fn is_enabled(&self) -> bool {
        matches!(self, CompatibilityState::Enabled)
    }

    /// The single forward transition. Fails if already disabled.
    pub(crate) fn disable(&mut self, journal: &mut Journal) -> TokenResult<()> {
        match self {
            CompatibilityState::Enabled => {
                journal.record(JournalEntry::Compatibility { previous: *self });
                *self = CompatibilityState::Disabled;
                Ok(())
            }
            CompatibilityState::Disabled => Err(TokenError::CompatibilityDisabled),
        }
    }
}

/// (owner, spender) → approved amount
///
/// Independent of operator authorization.
#[derive(Debug, Clone, Default)]
pub struct AllowanceBook {
    allowances: HashMap<(Address, Address), Amount>,
}

impl AllowanceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    /// Overwrite the allowance (not additive)
    pub(crate) fn set(&mut self, journal: &mut Journal, owner: &Address, spender: &Address, amount: Amount) {
        journal.record(JournalEntry::Allowance {
            owner: *owner,
            spender: *spender,
            previous: self.allowance(owner, spender),
        });
        self.write(owner, spender, amount);
    }

    /// Use `amount` of the allowance, failing without change if short
    pub(crate) fn spend(
        &mut self,
        journal: &mut Journal,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> TokenResult<()> {
        let have = self.allowance(owner, spender);
        if have < amount {
            return Err(TokenError::InsufficientAllowance { have, need: amount });
        }
        self.set(journal, owner, spender, have - amount);
        Ok(())
    }

    /// Drop every allowance
    pub(crate) fn clear(&mut self, journal: &mut Journal) {
        for ((owner, spender), previous) in self.allowances.drain() {
            journal.record(JournalEntry::Allowance {
                owner,
                spender,
                previous,
            });
        }
    }

    pub(crate) fn restore(&mut self, owner: &Address, spender: &Address, previous: Amount) {
        self.write(owner, spender, previous);
    }

    pub fn len(&self) -> usize {
        self.allowances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowances.is_empty()
    }

    fn write(&mut self, owner: &Address, spender: &Address, amount: Amount) {
        if amount == 0 {
            self.allowances.remove(&(*owner, *spender));
        } else {
            self.allowances.insert((*owner, *spender), amount);
        }
    }
}

impl TokenLedger {
    fn require_legacy(&self) -> TokenResult<()> {
        if !self.compatibility().is_enabled() {
            return Err(TokenError::CompatibilityDisabled);
        }
        Ok(())
    }

    /// Legacy display decimals
    pub fn decimals(&self) -> TokenResult<u8> {
        self.require_legacy()?;
        Ok(self.config().decimals)
    }

    /// Amount `spender` may still move out of `owner`
    pub fn allowance(&self, owner: &Address, spender: &Address) -> TokenResult<Amount> {
        self.require_legacy()?;
        Ok(self.state.allowances.allowance(owner, spender))
    }

    /// Set the allowance of `spender` over the caller's balance
    pub fn approve(&mut self, caller: &Address, spender: &Address, amount: Amount) -> TokenResult<()> {
        self.atomic("approve", |ledger| {
            ledger.require_legacy()?;
            let state = &mut ledger.state;
            state.allowances.set(&mut state.journal, caller, spender, amount);
            state.emit(LedgerEvent::Approval {
                owner: *caller,
                spender: *spender,
                amount,
            });
            Ok(())
        })
    }

    /// Move the caller's tokens without notifying hooks
    pub fn transfer(&mut self, caller: &Address, to: &Address, amount: Amount) -> TokenResult<()> {
        self.atomic("transfer", |ledger| {
            ledger.require_legacy()?;
            ledger.legacy_move(caller, to, amount)
        })
    }

    /// Move `from`'s tokens using the caller's allowance, without hooks
    pub fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> TokenResult<()> {
        self.atomic("transfer_from", |ledger| {
            ledger.require_legacy()?;
            ledger.state.balances.require_multiple(amount)?;
            let state = &mut ledger.state;
            state.allowances.spend(&mut state.journal, from, caller, amount)?;
            ledger.legacy_move(from, to, amount)
        })
    }

    fn legacy_move(&mut self, from: &Address, to: &Address, amount: Amount) -> TokenResult<()> {
        if to.is_zero() {
            return Err(TokenError::InvalidRecipient(*to));
        }
        let state = &mut self.state;
        state.balances.transfer(&mut state.journal, from, to, amount)?;
        state.emit(LedgerEvent::Transfer {
            from: *from,
            to: *to,
            amount,
        });
        Ok(())
    }

    /// Irreversibly turn off the legacy interface.
    ///
    /// Withdraws the legacy advertisement from the registry and clears all
    /// allowances. Requires `Owner`.
    pub fn disable_legacy_compatibility(&mut self, caller: &Address) -> TokenResult<()> {
        self.atomic("disable_legacy_compatibility", |ledger| {
            ledger.require_role(Role::Owner, caller)?;

            let state = &mut ledger.state;
            state.compatibility.disable(&mut state.journal)?;
            state.allowances.clear(&mut state.journal);

            let address = ledger.address();
            ledger.write_interface(address, InterfaceHash::of(interfaces::LEGACY), None);

            ledger.state.emit(LedgerEvent::LegacyDisabled { by: *caller });
            tracing::info!("Legacy compatibility disabled for ledger {:?}", address);
            Ok(())
        })
    }
}
