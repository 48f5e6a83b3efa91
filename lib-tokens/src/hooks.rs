//! Hook Dispatcher
//!
//! Before a hooked move debits an account, the sender's `tokensToSend`
//! implementer is resolved through the registry and invoked; after the move
//! is applied, the recipient's `tokensReceived` implementer is. Hooks run
//! with mutable access to the ledger and may call back into it.
//!
//! Implementers are resolved on every call. Registrations can change
//! between calls (or inside a hook), so nothing is cached.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use lib_types::{Address, Amount, InterfaceHash};

use crate::config::ReceiverPolicy;
use crate::errors::{HookError, TokenError, TokenResult};
use crate::ledger::TokenLedger;
use crate::registry::interfaces;

/// Which side of a move a hook observes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookKind {
    /// `tokensToSend`, invoked before the debit
    Sender,
    /// `tokensReceived`, invoked after the credit
    Receiver,
}

impl HookKind {
    /// Registry interface name for this hook
    pub fn interface_name(self) -> &'static str {
        match self {
            HookKind::Sender => interfaces::TOKENS_SENDER,
            HookKind::Receiver => interfaces::TOKENS_RECIPIENT,
        }
    }

    /// Registry key for this hook
    pub fn interface(self) -> InterfaceHash {
        InterfaceHash::of(self.interface_name())
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::Sender => write!(f, "tokensToSend"),
            HookKind::Receiver => write!(f, "tokensReceived"),
        }
    }
}

/// The six parameters both hooks receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookCall {
    pub operator: Address,
    /// `Address::ZERO` for mints
    pub from: Address,
    /// `Address::ZERO` for burns
    pub to: Address,
    pub amount: Amount,
    pub data: Vec<u8>,
    pub operator_data: Vec<u8>,
}

/// Code deployed at an implementer address.
///
/// Returning an error rejects the move. An implementer registered for a
/// hook it does not override rejects as well.
pub trait TokenHook: Send + Sync {
    fn tokens_to_send(&self, ledger: &mut TokenLedger, call: &HookCall) -> Result<(), HookError> {
        let _ = (ledger, call);
        Err(HookError::reject("tokensToSend not implemented"))
    }

    fn tokens_received(&self, ledger: &mut TokenLedger, call: &HookCall) -> Result<(), HookError> {
        let _ = (ledger, call);
        Err(HookError::reject("tokensReceived not implemented"))
    }
}

/// A resolved implementer
#[derive(Clone)]
pub struct HookHandle {
    pub kind: HookKind,
    pub implementer: Address,
    /// `None` when the registry names an address without code
    pub code: Option<Arc<dyn TokenHook>>,
}

impl fmt::Debug for HookHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookHandle")
            .field("kind", &self.kind)
            .field("implementer", &self.implementer)
            .field("has_code", &self.code.is_some())
            .finish()
    }
}

impl HookHandle {
    fn invoke(&self, ledger: &mut TokenLedger, call: &HookCall) -> Result<(), HookError> {
        let code = self
            .code
            .as_ref()
            .ok_or_else(|| HookError::reject("implementer has no code"))?;
        match self.kind {
            HookKind::Sender => code.tokens_to_send(ledger, call),
            HookKind::Receiver => code.tokens_received(ledger, call),
        }
    }
}

impl TokenLedger {
    /// Resolve the implementer of `kind` for `account`
    pub fn resolve_hook(&self, account: &Address, kind: HookKind) -> Option<HookHandle> {
        let env = self.environment();
        let implementer = env.get_interface_implementer(account, &kind.interface())?;
        Some(HookHandle {
            kind,
            implementer,
            code: env.code_at(&implementer),
        })
    }

    /// Whether a hooked move into `account` needs a receiver implementer
    pub fn receiver_required(&self, account: &Address) -> bool {
        match self.config().receiver_policy {
            ReceiverPolicy::Never => false,
            ReceiverPolicy::ContractsOnly => self.environment().code_at(account).is_some(),
            ReceiverPolicy::Always => true,
        }
    }

    /// Pre-move notification. Runs before any balance is touched.
    pub(crate) fn notify_sender(&mut self, call: &HookCall) -> TokenResult<()> {
        match self.resolve_hook(&call.from, HookKind::Sender) {
            Some(handle) => self.invoke_hook(&handle, &call.from, call),
            None => Ok(()),
        }
    }

    /// Post-move notification.
    ///
    /// With `prevent_locking`, a recipient that the receiver policy marks
    /// as needing an implementer but has none fails with `NoReceiver`.
    pub(crate) fn notify_recipient(&mut self, call: &HookCall, prevent_locking: bool) -> TokenResult<()> {
        match self.resolve_hook(&call.to, HookKind::Receiver) {
            Some(handle) => self.invoke_hook(&handle, &call.to, call),
            None if prevent_locking && self.receiver_required(&call.to) => {
                Err(TokenError::NoReceiver(call.to))
            }
            None => Ok(()),
        }
    }

    fn invoke_hook(&mut self, handle: &HookHandle, account: &Address, call: &HookCall) -> TokenResult<()> {
        tracing::debug!(
            "invoking {} of {:?} via {:?} (depth {})",
            handle.kind,
            account,
            handle.implementer,
            self.call_depth()
        );
        handle.invoke(self, call).map_err(|e| TokenError::HookRejected {
            kind: handle.kind,
            account: *account,
            implementer: handle.implementer,
            reason: e.reason,
        })
    }
}
