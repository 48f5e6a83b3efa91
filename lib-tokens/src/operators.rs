//! Operator Authorization
//!
//! A pair table of (holder, operator) grants. A holder is always its own
//! operator; that pair is implicit and never stored. The predicate is
//! evaluated against the table on every call and never cached, so a hook
//! that revokes an operator mid-call is seen by the next check.

use std::collections::HashSet;

use lib_types::Address;

use crate::errors::{TokenError, TokenResult};
use crate::journal::{Journal, JournalEntry};

#[derive(Debug, Clone, Default)]
pub struct OperatorTable {
    /// (holder, operator)
    pairs: HashSet<(Address, Address)>,
}

impl OperatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `operator` may move funds of `holder`
    pub fn is_operator_for(&self, operator: &Address, holder: &Address) -> bool {
        operator == holder || self.pairs.contains(&(*holder, *operator))
    }

    /// Fail with `NotAuthorized` unless `operator` may act for `holder`
    pub fn require_authorized(&self, operator: &Address, holder: &Address) -> TokenResult<()> {
        if !self.is_operator_for(operator, holder) {
            return Err(TokenError::NotAuthorized {
                operator: *operator,
                holder: *holder,
            });
        }
        Ok(())
    }

    /// Operators explicitly authorized by `holder`
    pub fn operators_of<'a>(&'a self, holder: &'a Address) -> impl Iterator<Item = &'a Address> + 'a {
        self.pairs
            .iter()
            .filter(move |(h, _)| h == holder)
            .map(|(_, operator)| operator)
    }

    /// Grant `operator` over `holder`'s funds. Idempotent.
    ///
    /// Returns whether the table changed.
    pub(crate) fn authorize(
        &mut self,
        journal: &mut Journal,
        holder: &Address,
        operator: &Address,
    ) -> bool {
        if holder == operator {
            return false;
        }
        let changed = self.pairs.insert((*holder, *operator));
        if changed {
            journal.record(JournalEntry::Operator {
                holder: *holder,
                operator: *operator,
                previous: false,
            });
        }
        changed
    }

    /// Remove exactly the (holder, operator) pair. Idempotent.
    ///
    /// Returns whether the table changed.
    pub(crate) fn revoke(
        &mut self,
        journal: &mut Journal,
        holder: &Address,
        operator: &Address,
    ) -> bool {
        let changed = self.pairs.remove(&(*holder, *operator));
        if changed {
            journal.record(JournalEntry::Operator {
                holder: *holder,
                operator: *operator,
                previous: true,
            });
        }
        changed
    }

    pub(crate) fn restore(&mut self, holder: &Address, operator: &Address, previous: bool) {
        if previous {
            self.pairs.insert((*holder, *operator));
        } else {
            self.pairs.remove(&(*holder, *operator));
        }
    }
}
