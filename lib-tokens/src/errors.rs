//! Token Ledger Errors

use lib_types::{Address, Amount};
use thiserror::Error;

use crate::authority::Role;
use crate::hooks::HookKind;

/// Error during ledger operations.
///
/// Every variant aborts the enclosing top-level call; nothing it did
/// before failing survives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Amount {amount} is not a multiple of granularity {granularity}")]
    Granularity { amount: Amount, granularity: Amount },

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("Insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: Amount, need: Amount },

    #[error("{operator} is not an operator for {holder}")]
    NotAuthorized { operator: Address, holder: Address },

    #[error("{kind} hook of {account} (implementer {implementer}) rejected: {reason}")]
    HookRejected {
        kind: HookKind,
        account: Address,
        implementer: Address,
        reason: String,
    },

    #[error("Recipient {0} requires a tokensReceived implementer")]
    NoReceiver(Address),

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Legacy compatibility is disabled")]
    CompatibilityDisabled,

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(Address),

    #[error("{account} is missing the {role:?} role")]
    MissingRole { role: Role, account: Address },

    #[error("Call depth {depth} exceeds maximum of {max}")]
    CallDepthExceeded { depth: u16, max: u16 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invariant violated: {0}")]
    InvariantViolated(String),
}

/// Result type for ledger operations
pub type TokenResult<T> = Result<T, TokenError>;

/// Failure reported by a sender or receiver hook.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct HookError {
    pub reason: String,
}

impl HookError {
    /// Reject a move with a reason
    pub fn reject(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl From<TokenError> for HookError {
    fn from(e: TokenError) -> Self {
        Self { reason: e.to_string() }
    }
}
