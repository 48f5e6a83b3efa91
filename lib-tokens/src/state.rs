//! Ledger state and its undo journal
//!
//! Each component owns its own data; the journal is shared so that one
//! checkpoint covers balances, operators, allowances, roles, compatibility
//! and events together.

use lib_types::{Address, Amount};

use crate::authority::{AuthoritySet, Role};
use crate::balances::BalanceSheet;
use crate::compat::{AllowanceBook, CompatibilityState};
use crate::events::LedgerEvent;
use crate::journal::{Journal, JournalEntry};
use crate::operators::OperatorTable;

#[derive(Debug)]
pub(crate) struct LedgerState {
    pub(crate) balances: BalanceSheet,
    pub(crate) operators: OperatorTable,
    pub(crate) allowances: AllowanceBook,
    pub(crate) authorities: AuthoritySet,
    pub(crate) compatibility: CompatibilityState,
    pub(crate) events: Vec<LedgerEvent>,
    pub(crate) journal: Journal,
}

impl LedgerState {
    pub(crate) fn new(granularity: Amount) -> Self {
        Self {
            balances: BalanceSheet::new(granularity),
            operators: OperatorTable::new(),
            allowances: AllowanceBook::new(),
            authorities: AuthoritySet::new(),
            compatibility: CompatibilityState::Enabled,
            events: Vec::new(),
            journal: Journal::new(),
        }
    }

    /// Append an event; it disappears again if the call aborts
    pub(crate) fn emit(&mut self, event: LedgerEvent) {
        tracing::debug!("event: {}", event);
        self.events.push(event);
        self.journal.record(JournalEntry::Event);
    }

    /// Undo one journal entry.
    ///
    /// Returns registry entries untouched; only the environment can undo them.
    pub(crate) fn restore(&mut self, entry: JournalEntry) -> Option<JournalEntry> {
        match entry {
            JournalEntry::Balance { account, previous } => {
                self.balances.restore_balance(&account, previous)
            }
            JournalEntry::Supply { previous } => self.balances.restore_supply(previous),
            JournalEntry::Operator {
                holder,
                operator,
                previous,
            } => self.operators.restore(&holder, &operator, previous),
            JournalEntry::Allowance {
                owner,
                spender,
                previous,
            } => self.allowances.restore(&owner, &spender, previous),
            JournalEntry::Compatibility { previous } => self.compatibility = previous,
            JournalEntry::Role {
                role,
                account,
                previous,
            } => self.authorities.restore(role, account, previous),
            JournalEntry::Event => {
                self.events.pop();
            }
            interface @ JournalEntry::Interface { .. } => return Some(interface),
        }
        None
    }

    /// Grant a role, journaled
    pub(crate) fn grant(&mut self, role: Role, account: Address) -> bool {
        let previous = self.authorities.add(role, account);
        if !previous {
            self.journal.record(JournalEntry::Role {
                role,
                account,
                previous,
            });
        }
        !previous
    }

    /// Remove a role, journaled
    pub(crate) fn revoke(&mut self, role: Role, account: &Address) -> bool {
        let previous = self.authorities.remove(role, account);
        if previous {
            self.journal.record(JournalEntry::Role {
                role,
                account: *account,
                previous,
            });
        }
        previous
    }
}
