use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::CoreError;

/// Longest accepted fallback window (100 years).
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

/// Bounded fixed-delay retry for price history requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per symbol, including the first one.
    pub max_attempts: u32,
    /// Fixed delay between attempts, in milliseconds.
    pub delay_ms: u64,
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// At least one attempt is always made.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
        }
    }
}

/// Per-ledger configuration, passed explicitly into the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// How far back to fetch when the ledger has no usable last date.
    pub lookback_days: i64,

    /// NAV used when the ledger has no non-zero NAV yet.
    pub seed_nav: f64,

    /// Quantity assigned to each symbol of a `Stocks` block that has no `Quantities` row.
    pub default_quantity: f64,

    pub retry: RetryPolicy,

    /// Optional API keys for price sources that require them.
    /// Keys: source name (e.g., "alphavantage").
    pub api_keys: HashMap<String, String>,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            seed_nav: 100.0,
            default_quantity: 1.0,
            retry: RetryPolicy::default(),
            api_keys: HashMap::new(),
        }
    }
}

impl LedgerSettings {
    /// Parse settings from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let settings: LedgerSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !(0..=MAX_LOOKBACK_DAYS).contains(&self.lookback_days) {
            return Err(CoreError::ValidationError(format!(
                "lookback_days must be between 0 and {MAX_LOOKBACK_DAYS} (got {})",
                self.lookback_days
            )));
        }
        if !self.seed_nav.is_finite() || self.seed_nav <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "seed_nav must be a positive number (got {})",
                self.seed_nav
            )));
        }
        if !self.default_quantity.is_finite() || self.default_quantity < 0.0 {
            return Err(CoreError::ValidationError(format!(
                "default_quantity must be non-negative (got {})",
                self.default_quantity
            )));
        }
        Ok(())
    }
}
