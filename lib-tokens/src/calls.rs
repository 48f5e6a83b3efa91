//! Call stack tracking for reentrant ledger calls
//!
//! Hooks may call back into the ledger before the call that invoked them
//! returns. The stack bounds how deep such chains can go.

use crate::errors::{TokenError, TokenResult};

/// Default bound on nested top-level calls
pub const DEFAULT_MAX_CALL_DEPTH: u16 = 16;

/// Tracks the chain of in-progress ledger calls
///
/// Depth 0 means no call is running. Every top-level entry point pushes on
/// entry and pops on exit, whether it succeeded or not.
#[derive(Debug, Clone)]
pub struct CallStack {
    /// Current depth in call chain (0 = idle)
    depth: u16,
    /// Hard limit on depth
    max_depth: u16,
    /// Operation names, outermost first
    chain: Vec<&'static str>,
}

impl CallStack {
    /// Create an empty call stack with the given depth bound
    pub fn new(max_depth: u16) -> Self {
        Self {
            depth: 0,
            max_depth,
            chain: Vec::new(),
        }
    }

    /// Push a call onto the stack
    ///
    /// Returns the new depth, or `CallDepthExceeded` if the bound is reached.
    pub fn push(&mut self, operation: &'static str) -> TokenResult<u16> {
        // Check depth limit BEFORE incrementing
        if self.depth >= self.max_depth {
            return Err(TokenError::CallDepthExceeded {
                depth: self.depth + 1,
                max: self.max_depth,
            });
        }

        self.chain.push(operation);
        self.depth += 1;

        Ok(self.depth)
    }

    /// Pop the most recent call
    pub fn pop(&mut self) -> Option<&'static str> {
        let popped = self.chain.pop();
        if popped.is_some() {
            self.depth -= 1;
        }
        popped
    }

    /// Get current call depth
    pub fn current_depth(&self) -> u16 {
        self.depth
    }

    /// Get the configured depth bound
    pub fn max_depth(&self) -> u16 {
        self.max_depth
    }

    /// Get the full call chain (ordered from first to most recent)
    pub fn chain(&self) -> &[&'static str] {
        &self.chain
    }

    /// Get the most recent call (top of stack)
    pub fn peek(&self) -> Option<&'static str> {
        self.chain.last().copied()
    }
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CALL_DEPTH)
    }
}
