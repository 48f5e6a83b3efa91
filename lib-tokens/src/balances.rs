//! Ledger Core - balance and supply mutation primitives
//!
//! These are the ONLY functions allowed to change balances or total supply.
//!
//! # Invariants
//!
//! - total_supply == Σ balances[*] after every primitive
//! - every balance and total_supply are multiples of granularity
//! - no primitive leaves a partial write behind: all checks run before
//!   the first write

use std::collections::HashMap;

use lib_types::{Address, Amount};

use crate::errors::{TokenError, TokenResult};
use crate::journal::{Journal, JournalEntry};

/// Balances and total supply of a single granular token
#[derive(Debug, Clone)]
pub struct BalanceSheet {
    balances: HashMap<Address, Amount>,
    total_supply: Amount,
    granularity: Amount,
}

impl BalanceSheet {
    /// Create an empty sheet. `granularity` comes from a validated config.
    pub(crate) fn new(granularity: Amount) -> Self {
        Self {
            balances: HashMap::new(),
            total_supply: 0,
            granularity,
        }
    }

    /// Smallest unit every amount must be a multiple of
    pub fn granularity(&self) -> Amount {
        self.granularity
    }

    /// Total supply in circulation
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Balance of an account (0 if it never held tokens)
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// All non-zero balances
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter()
    }

    /// Fail with `Granularity` unless `amount` is an exact multiple
    pub fn require_multiple(&self, amount: Amount) -> TokenResult<()> {
        // A zero granularity accepts nothing
        if amount.checked_rem(self.granularity) != Some(0) {
            return Err(TokenError::Granularity {
                amount,
                granularity: self.granularity,
            });
        }
        Ok(())
    }

    /// Fail with `InsufficientBalance` unless `account` holds `amount`
    pub fn require_balance(&self, account: &Address, amount: Amount) -> TokenResult<()> {
        let have = self.balance_of(account);
        if have < amount {
            return Err(TokenError::InsufficientBalance { have, need: amount });
        }
        Ok(())
    }

    // =========================================================================
    // Mutation primitives
    // =========================================================================

    /// Create `amount` tokens in `to`
    ///
    /// # Errors
    /// - `Granularity` if amount is not a multiple of granularity
    /// - `Overflow` if total supply would leave the representable range
    pub(crate) fn mint(
        &mut self,
        journal: &mut Journal,
        to: &Address,
        amount: Amount,
    ) -> TokenResult<()> {
        self.require_multiple(amount)?;

        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        // Bounded by supply, but checked anyway
        let new_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.write_supply(journal, new_supply);
        self.write_balance(journal, to, new_balance);
        Ok(())
    }

    /// Destroy `amount` tokens held by `from`
    ///
    /// # Errors
    /// - `Granularity` if amount is not a multiple of granularity
    /// - `InsufficientBalance` if balance < amount
    pub(crate) fn burn(
        &mut self,
        journal: &mut Journal,
        from: &Address,
        amount: Amount,
    ) -> TokenResult<()> {
        self.require_multiple(amount)?;
        self.require_balance(from, amount)?;

        let new_balance = self.balance_of(from) - amount;
        let new_supply = self
            .total_supply
            .checked_sub(amount)
            .ok_or_else(|| TokenError::InvariantViolated(format!(
                "burn of {} exceeds total supply {}",
                amount, self.total_supply
            )))?;

        self.write_balance(journal, from, new_balance);
        self.write_supply(journal, new_supply);
        Ok(())
    }

    /// Move `amount` from one account to another
    ///
    /// Debit and credit are computed before either is written, so no
    /// debited-but-not-credited state exists even transiently.
    pub(crate) fn transfer(
        &mut self,
        journal: &mut Journal,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> TokenResult<()> {
        self.require_multiple(amount)?;
        self.require_balance(from, amount)?;

        if from == to {
            return Ok(());
        }

        let new_from = self.balance_of(from) - amount;
        let new_to = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.write_balance(journal, from, new_from);
        self.write_balance(journal, to, new_to);
        Ok(())
    }

    fn write_balance(&mut self, journal: &mut Journal, account: &Address, value: Amount) {
        let previous = self.balance_of(account);
        journal.record(JournalEntry::Balance {
            account: *account,
            previous,
        });
        self.set_balance(account, value);
    }

    fn write_supply(&mut self, journal: &mut Journal, value: Amount) {
        journal.record(JournalEntry::Supply {
            previous: self.total_supply,
        });
        self.total_supply = value;
    }

    fn set_balance(&mut self, account: &Address, value: Amount) {
        if value == 0 {
            self.balances.remove(account);
        } else {
            self.balances.insert(*account, value);
        }
    }

    // =========================================================================
    // Journal replay
    // =========================================================================

    pub(crate) fn restore_balance(&mut self, account: &Address, previous: Amount) {
        self.set_balance(account, previous);
    }

    pub(crate) fn restore_supply(&mut self, previous: Amount) {
        self.total_supply = previous;
    }

    /// Re-derive conservation and granularity over the whole sheet
    pub fn verify(&self) -> TokenResult<()> {
        let mut sum: Amount = 0;
        for (account, balance) in &self.balances {
            if balance.checked_rem(self.granularity) != Some(0) {
                return Err(TokenError::InvariantViolated(format!(
                    "balance {} of {:?} is not a multiple of granularity {}",
                    balance, account, self.granularity
                )));
            }
            sum = sum.checked_add(*balance).ok_or(TokenError::Overflow)?;
        }

        if sum != self.total_supply {
            return Err(TokenError::InvariantViolated(format!(
                "total_supply {} != sum(balances) {}",
                self.total_supply, sum
            )));
        }

        if self.total_supply.checked_rem(self.granularity) != Some(0) {
            return Err(TokenError::InvariantViolated(format!(
                "total_supply {} is not a multiple of granularity {}",
                self.total_supply, self.granularity
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRANULARITY: Amount = 10_000_000_000_000_000; // 0.01 at 18 decimals

    fn addr(id: u8) -> Address {
        Address::new([id; 32])
    }

    #[test]
    fn test_mint_increases_supply_and_balance() {
        let mut sheet = BalanceSheet::new(GRANULARITY);
        let mut journal = Journal::new();

        sheet.mint(&mut journal, &addr(1), 100 * GRANULARITY).unwrap();

        assert_eq!(sheet.total_supply(), 100 * GRANULARITY);
        assert_eq!(sheet.balance_of(&addr(1)), 100 * GRANULARITY);
        sheet.verify().unwrap();
    }

    #[test]
    fn test_mint_rejects_non_multiple() {
        let mut sheet = BalanceSheet::new(GRANULARITY);
        let mut journal = Journal::new();

        let result = sheet.mint(&mut journal, &addr(1), GRANULARITY + 1);

        assert!(matches!(result, Err(TokenError::Granularity { .. })));
        assert_eq!(sheet.total_supply(), 0);
        assert_eq!(journal.len(), 0);
    }

    #[test]
    fn test_mint_overflow() {
        let mut sheet = BalanceSheet::new(1);
        let mut journal = Journal::new();

        sheet.mint(&mut journal, &addr(1), Amount::MAX).unwrap();
        let result = sheet.mint(&mut journal, &addr(2), 1);

        assert_eq!(result, Err(TokenError::Overflow));
        assert_eq!(sheet.balance_of(&addr(2)), 0);
        assert_eq!(sheet.total_supply(), Amount::MAX);
    }

    #[test]
    fn test_burn() {
        let mut sheet = BalanceSheet::new(1);
        let mut journal = Journal::new();
        sheet.mint(&mut journal, &addr(1), 500).unwrap();

        sheet.burn(&mut journal, &addr(1), 100).unwrap();
        assert_eq!(sheet.balance_of(&addr(1)), 400);
        assert_eq!(sheet.total_supply(), 400);

        let result = sheet.burn(&mut journal, &addr(1), 401);
        assert_eq!(
            result,
            Err(TokenError::InsufficientBalance { have: 400, need: 401 })
        );
        assert_eq!(sheet.total_supply(), 400);
    }

    #[test]
    fn test_transfer_moves_exactly_amount() {
        let mut sheet = BalanceSheet::new(1);
        let mut journal = Journal::new();
        sheet.mint(&mut journal, &addr(1), 500).unwrap();

        sheet.transfer(&mut journal, &addr(1), &addr(2), 200).unwrap();

        assert_eq!(sheet.balance_of(&addr(1)), 300);
        assert_eq!(sheet.balance_of(&addr(2)), 200);
        assert_eq!(sheet.total_supply(), 500);
        sheet.verify().unwrap();
    }

    #[test]
    fn test_self_transfer_is_checked_but_unchanged() {
        let mut sheet = BalanceSheet::new(1);
        let mut journal = Journal::new();
        sheet.mint(&mut journal, &addr(1), 50).unwrap();

        sheet.transfer(&mut journal, &addr(1), &addr(1), 50).unwrap();
        assert_eq!(sheet.balance_of(&addr(1)), 50);

        let result = sheet.transfer(&mut journal, &addr(1), &addr(1), 51);
        assert!(matches!(result, Err(TokenError::InsufficientBalance { .. })));
    }

    #[test]
    fn test_zero_balances_are_pruned() {
        let mut sheet = BalanceSheet::new(1);
        let mut journal = Journal::new();
        sheet.mint(&mut journal, &addr(1), 10).unwrap();
        sheet.transfer(&mut journal, &addr(1), &addr(2), 10).unwrap();

        assert_eq!(sheet.iter().count(), 1);
        assert_eq!(sheet.balance_of(&addr(1)), 0);
    }

    #[test]
    fn test_restore_replays_previous_values() {
        let mut sheet = BalanceSheet::new(1);
        let mut journal = Journal::new();
        sheet.mint(&mut journal, &addr(1), 10).unwrap();
        let checkpoint = journal.checkpoint();

        sheet.transfer(&mut journal, &addr(1), &addr(2), 4).unwrap();
        for entry in journal.unwind(checkpoint) {
            match entry {
                JournalEntry::Balance { account, previous } => {
                    sheet.restore_balance(&account, previous)
                }
                JournalEntry::Supply { previous } => sheet.restore_supply(previous),
                other => panic!("unexpected entry {:?}", other),
            }
        }

        assert_eq!(sheet.balance_of(&addr(1)), 10);
        assert_eq!(sheet.balance_of(&addr(2)), 0);
        sheet.verify().unwrap();
    }

    #[test]
    fn test_zero_granularity_rejects_instead_of_panicking() {
        let mut journal = Journal::new();
        let mut sheet = BalanceSheet::new(0);

        assert_eq!(
            sheet.require_multiple(0),
            Err(TokenError::Granularity { amount: 0, granularity: 0 })
        );
        assert!(matches!(
            sheet.mint(&mut journal, &addr(1), 100),
            Err(TokenError::Granularity { .. })
        ));
        assert_eq!(sheet.total_supply(), 0);
        assert_eq!(journal.len(), 0);
        assert!(matches!(sheet.verify(), Err(TokenError::InvariantViolated(_))));
    }
}
