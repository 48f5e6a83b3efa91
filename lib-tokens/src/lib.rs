//! Granular Token Ledger
//!
//! A fungible token with a fixed granularity, per-holder operators, sender
//! and receiver hooks resolved through an interface registry, and a legacy
//! allowance-based interface that the owner can switch off for good.
//!
//! # Key Types
//!
//! - [`TokenLedger`]: balances, operators, hooks and the legacy layer
//! - [`LedgerConfig`]: name, symbol, granularity and receiver policy
//! - [`Environment`]: interface registry plus deployed hook code
//! - [`TokenHook`]: `tokensToSend` / `tokensReceived` implementations
//!
//! # Execution
//!
//! Every mutating call is all-or-nothing. Hooks may call back into the
//! ledger; a failure anywhere in the nested chain reverts the whole
//! top-level call, registry writes included.

pub mod authority;
pub mod balances;
pub mod calls;
pub mod compat;
pub mod config;
pub mod errors;
pub mod events;
pub mod hooks;
pub mod ledger;
pub mod operators;
pub mod registry;

mod journal;
mod state;

pub use authority::{AuthoritySet, Role};
pub use balances::BalanceSheet;
pub use calls::{CallStack, DEFAULT_MAX_CALL_DEPTH};
pub use compat::{AllowanceBook, CompatibilityState};
pub use config::{ConfigError, LedgerConfig, ReceiverPolicy};
pub use errors::{HookError, TokenError, TokenResult};
pub use events::LedgerEvent;
pub use hooks::{HookCall, HookHandle, HookKind, TokenHook};
pub use ledger::TokenLedger;
pub use operators::OperatorTable;
pub use registry::{interfaces, Environment, InterfaceRegistry, MemoryEnvironment};

pub use lib_types::{Address, Amount, InterfaceHash};
