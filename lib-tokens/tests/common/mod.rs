//! Shared fixtures for ledger integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use lib_tokens::{
    interfaces, Address, Amount, HookCall, HookError, LedgerConfig, MemoryEnvironment, TokenHook,
    TokenLedger,
};

pub const GRANULARITY: u64 = 10_000_000_000_000_000;
pub const ONE: Amount = 1_000_000_000_000_000_000;

pub const LEDGER: u8 = 100;
pub const OWNER: u8 = 1;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn addr(id: u8) -> Address {
    Address::new([id; 32])
}

pub fn reference_config() -> LedgerConfig {
    LedgerConfig::new("ReferenceToken", "XRT", GRANULARITY)
}

pub fn new_ledger(env: MemoryEnvironment) -> TokenLedger {
    init_tracing();
    TokenLedger::new(addr(LEDGER), addr(OWNER), reference_config(), Box::new(env))
        .expect("reference config is valid")
}

/// Deploy `hook` at `implementer` and register it for `account`
pub fn install(env: &mut MemoryEnvironment, account: u8, interface: &str, implementer: u8, hook: Arc<dyn TokenHook>) {
    env.deploy(addr(implementer), hook);
    env.register(addr(account), interface, addr(implementer));
}

pub fn install_receiver(env: &mut MemoryEnvironment, account: u8, implementer: u8, hook: Arc<dyn TokenHook>) {
    install(env, account, interfaces::TOKENS_RECIPIENT, implementer, hook);
}

pub fn install_sender(env: &mut MemoryEnvironment, account: u8, implementer: u8, hook: Arc<dyn TokenHook>) {
    install(env, account, interfaces::TOKENS_SENDER, implementer, hook);
}

/// Accepts everything
pub struct AcceptAll;

impl TokenHook for AcceptAll {
    fn tokens_to_send(&self, _: &mut TokenLedger, _: &HookCall) -> Result<(), HookError> {
        Ok(())
    }

    fn tokens_received(&self, _: &mut TokenLedger, _: &HookCall) -> Result<(), HookError> {
        Ok(())
    }
}

/// Rejects everything
pub struct RejectAll;

impl TokenHook for RejectAll {
    fn tokens_to_send(&self, _: &mut TokenLedger, _: &HookCall) -> Result<(), HookError> {
        Err(HookError::reject("sender refuses"))
    }

    fn tokens_received(&self, _: &mut TokenLedger, _: &HookCall) -> Result<(), HookError> {
        Err(HookError::reject("recipient refuses"))
    }
}

/// Records the balance of the hooked account at the moment it is notified
#[derive(Default)]
pub struct BalanceProbe {
    pub seen: Mutex<Vec<(HookCall, Amount, Amount)>>,
}

impl BalanceProbe {
    fn record(&self, ledger: &TokenLedger, call: &HookCall) {
        let from = ledger.balance_of(&call.from);
        let to = ledger.balance_of(&call.to);
        self.seen
            .lock()
            .expect("probe lock")
            .push((call.clone(), from, to));
    }
}

impl TokenHook for BalanceProbe {
    fn tokens_to_send(&self, ledger: &mut TokenLedger, call: &HookCall) -> Result<(), HookError> {
        self.record(ledger, call);
        Ok(())
    }

    fn tokens_received(&self, ledger: &mut TokenLedger, call: &HookCall) -> Result<(), HookError> {
        self.record(ledger, call);
        Ok(())
    }
}

/// Sends `share` of every receipt straight back to the sender, then
/// optionally rejects
pub struct Bounce {
    pub share: Amount,
    pub reject_after: bool,
}

impl TokenHook for Bounce {
    fn tokens_received(&self, ledger: &mut TokenLedger, call: &HookCall) -> Result<(), HookError> {
        if !call.from.is_zero() && self.share > 0 {
            ledger.send(&call.to, &call.to, &call.from, self.share, b"bounce", b"")?;
        }
        if self.reject_after {
            return Err(HookError::reject("bounced, then refused"));
        }
        Ok(())
    }
}
