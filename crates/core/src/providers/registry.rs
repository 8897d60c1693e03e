use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::HashMap;

use super::alphavantage::AlphaVantageSource;
use super::traits::PriceSource;
use super::yahoo_finance::YahooFinanceSource;
use crate::errors::CoreError;
use crate::models::price::PricePoint;

/// Ordered fallback chain of price sources.
///
/// Sources are tried in registration order; the first one returning a
/// non-empty history wins. New sources can be added without touching the
/// NAV computation, which only sees a single `PriceSource`.
pub struct PriceSourceChain {
    sources: Vec<Box<dyn PriceSource>>,
}

impl PriceSourceChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Create a chain with the default sources: Yahoo first, then Alpha Vantage
    /// if an `"alphavantage"` key is configured.
    pub fn new_with_defaults(api_keys: &HashMap<String, String>) -> Self {
        let mut chain = Self::new();

        match YahooFinanceSource::new() {
            Ok(yahoo) => chain.register(Box::new(yahoo)),
            Err(e) => warn!("Yahoo Finance unavailable: {e}"),
        }

        if let Some(key) = api_keys.get("alphavantage") {
            chain.register(Box::new(AlphaVantageSource::new(key.clone())));
        }

        chain
    }

    /// Register a new price source at the end of the chain.
    pub fn register(&mut self, source: Box<dyn PriceSource>) {
        self.sources.push(source);
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for PriceSourceChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceSource for PriceSourceChain {
    fn name(&self) -> &str {
        "chain"
    }

    /// Empty when every source answered with no data; the last error when
    /// every source failed. Retrying is left to the caller.
    async fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let mut last_error = None;
        let mut any_ok = false;

        for source in &self.sources {
            match source.history(symbol, start, end).await {
                Ok(points) if !points.is_empty() => return Ok(points),
                Ok(_) => {
                    debug!("{}: no data for {symbol}, trying next source", source.name());
                    any_ok = true;
                }
                Err(e) => {
                    debug!("{}: {e}, trying next source", source.name());
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !any_ok => Err(e),
            _ => Ok(Vec::new()),
        }
    }
}
