//! Ledger configuration
//!
//! ```toml
//! name = "ReferenceToken"
//! symbol = "XRT"
//! granularity = 10000000000000000
//! decimals = 18
//! receiver_policy = "contracts_only"
//! max_call_depth = 16
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lib_types::Amount;

use crate::calls::DEFAULT_MAX_CALL_DEPTH;

/// Maximum symbol length
pub const MAX_SYMBOL_LEN: usize = 10;

/// Maximum legacy display decimals
pub const MAX_DECIMALS: u8 = 18;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid ledger configuration: {reason}")]
    Invalid { reason: String },

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Configuration parsing error: {0}")]
    Parsing(#[from] toml::de::Error),
}

/// When a recipient must have a `tokensReceived` implementer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiverPolicy {
    /// Never required; missing hooks are skipped
    Never,
    /// Required when the environment reports code at the recipient
    #[default]
    ContractsOnly,
    /// Required for every recipient
    Always,
}

/// Static parameters of a ledger, fixed at creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Human-readable token name
    pub name: String,
    /// Token symbol (e.g., "XRT")
    pub symbol: String,
    /// Smallest unit every balance and amount must be a multiple of.
    ///
    /// Bounded by `u64` although balances are `Amount` (`u128`); TOML
    /// integers are 64-bit signed, so a file can go up to `i64::MAX`.
    /// Widened with [`LedgerConfig::granularity_amount`].
    pub granularity: u64,
    /// Decimals reported by the legacy interface (display only)
    pub decimals: u8,
    /// Receiver hook requirement for hooked moves
    pub receiver_policy: ReceiverPolicy,
    /// Bound on nested reentrant calls
    pub max_call_depth: u16,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            symbol: String::new(),
            granularity: 1,
            decimals: MAX_DECIMALS,
            receiver_policy: ReceiverPolicy::default(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl LedgerConfig {
    /// Create config with the three creation parameters
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, granularity: u64) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            granularity,
            ..Self::default()
        }
    }

    pub fn with_receiver_policy(mut self, policy: ReceiverPolicy) -> Self {
        self.receiver_policy = policy;
        self
    }

    pub fn with_max_call_depth(mut self, depth: u16) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    /// Granularity in ledger units
    pub fn granularity_amount(&self) -> Amount {
        Amount::from(self.granularity)
    }

    /// Validate token parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| {
            Err(ConfigError::Invalid {
                reason: reason.to_string(),
            })
        };

        if self.name.is_empty() {
            return invalid("Token name cannot be empty");
        }
        if self.symbol.is_empty() {
            return invalid("Token symbol cannot be empty");
        }
        if self.symbol.len() > MAX_SYMBOL_LEN {
            return invalid("Token symbol too long (max 10 characters)");
        }
        if self.granularity == 0 {
            return invalid("Granularity must be at least 1");
        }
        if self.decimals > MAX_DECIMALS {
            return invalid("Too many decimal places (max 18)");
        }
        if self.max_call_depth == 0 {
            return invalid("max_call_depth must be at least 1");
        }

        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: LedgerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        tracing::info!("Loading ledger configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(
            "  name = {}, symbol = {}, granularity = {}",
            config.name,
            config.symbol,
            config.granularity
        );
        Ok(config)
    }
}
