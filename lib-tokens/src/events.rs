//! Ledger events
//!
//! Typed record of every committed mutation. Events emitted by a call that
//! later aborts are discarded together with its state changes.

use serde::{Deserialize, Serialize};

use lib_types::{Address, Amount};

use crate::authority::Role;

/// Events appended by committed ledger mutations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LedgerEvent {
    /// Tokens created
    Minted {
        operator: Address,
        to: Address,
        amount: Amount,
        operator_data: Vec<u8>,
    },

    /// Tokens destroyed
    Burned {
        operator: Address,
        from: Address,
        amount: Amount,
        holder_data: Vec<u8>,
        operator_data: Vec<u8>,
    },

    /// Tokens moved through the hooked interface
    Sent {
        operator: Address,
        from: Address,
        to: Address,
        amount: Amount,
        data: Vec<u8>,
        operator_data: Vec<u8>,
    },

    /// Holder authorized an operator
    AuthorizedOperator { operator: Address, holder: Address },

    /// Holder revoked an operator
    RevokedOperator { operator: Address, holder: Address },

    /// Legacy balance change notice
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },

    /// Legacy allowance set
    Approval {
        owner: Address,
        spender: Address,
        amount: Amount,
    },

    /// Legacy interface withdrawn for good
    LegacyDisabled { by: Address },

    /// Role granted to an account
    RoleGranted { role: Role, account: Address },

    /// Role removed from an account
    RoleRevoked { role: Role, account: Address },
}

impl std::fmt::Display for LedgerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerEvent::Minted { to, amount, .. } => write!(f, "Minted({} -> {:?})", amount, to),
            LedgerEvent::Burned { from, amount, .. } => write!(f, "Burned({} from {:?})", amount, from),
            LedgerEvent::Sent { from, to, amount, .. } => {
                write!(f, "Sent({:?} -> {:?}: {})", from, to, amount)
            }
            LedgerEvent::AuthorizedOperator { operator, holder } => {
                write!(f, "AuthorizedOperator({:?} for {:?})", operator, holder)
            }
            LedgerEvent::RevokedOperator { operator, holder } => {
                write!(f, "RevokedOperator({:?} for {:?})", operator, holder)
            }
            LedgerEvent::Transfer { from, to, amount } => {
                write!(f, "Transfer({:?} -> {:?}: {})", from, to, amount)
            }
            LedgerEvent::Approval { owner, spender, amount } => {
                write!(f, "Approval({:?} -> {:?}: {})", owner, spender, amount)
            }
            LedgerEvent::LegacyDisabled { by } => write!(f, "LegacyDisabled(by {:?})", by),
            LedgerEvent::RoleGranted { role, account } => {
                write!(f, "RoleGranted({:?} to {:?})", role, account)
            }
            LedgerEvent::RoleRevoked { role, account } => {
                write!(f, "RoleRevoked({:?} from {:?})", role, account)
            }
        }
    }
}
