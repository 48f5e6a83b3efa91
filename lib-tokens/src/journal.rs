//! Undo journal for all-or-nothing top-level calls.
//!
//! Every state write records the value it overwrote. A checkpoint is a
//! position in the journal; reverting to it replays the recorded values
//! newest-first, which restores the exact state observed at the checkpoint.
//!
//! Nested (reentrant) calls take their own checkpoints. A nested call that
//! succeeds leaves its entries in place so that an enclosing call that later
//! fails undoes it as well. The journal is cleared only when the outermost
//! call commits.

use lib_types::{Address, Amount, InterfaceHash};

use crate::authority::Role;
use crate::compat::CompatibilityState;

/// A single undoable write
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum JournalEntry {
    Balance {
        account: Address,
        previous: Amount,
    },
    Supply {
        previous: Amount,
    },
    Operator {
        holder: Address,
        operator: Address,
        previous: bool,
    },
    Allowance {
        owner: Address,
        spender: Address,
        previous: Amount,
    },
    Compatibility {
        previous: CompatibilityState,
    },
    Role {
        role: Role,
        account: Address,
        previous: bool,
    },
    /// Registry write; undone through the environment, not the ledger state
    Interface {
        account: Address,
        interface: InterfaceHash,
        previous: Option<Address>,
    },
    Event,
}

/// Journal position taken at the start of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint(usize);

#[derive(Debug, Default)]
pub(crate) struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.entries.len())
    }

    /// Remove every entry written after `checkpoint`, newest first
    pub(crate) fn unwind(&mut self, checkpoint: Checkpoint) -> Vec<JournalEntry> {
        let start = checkpoint.0.min(self.entries.len());
        let mut undone = self.entries.split_off(start);
        undone.reverse();
        undone
    }

    /// Drop all entries; the outermost call has committed
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
