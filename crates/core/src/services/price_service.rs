use chrono::NaiveDate;
use log::{debug, warn};

use crate::errors::CoreError;
use crate::models::price::PricePoint;
use crate::models::settings::RetryPolicy;
use crate::providers::traits::PriceSource;

/// Fetches price history with a bounded, fixed-delay retry.
///
/// This is the only place the pipeline waits. A symbol that still has no
/// data once retries are exhausted is reported as unavailable and valued
/// in degraded (zero-price) mode by the caller, never raised.
pub struct PriceService {
    retry: RetryPolicy,
}

impl PriceService {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetch and clean the history for one symbol.
    ///
    /// Transient failures are retried up to `max_attempts` in total with a
    /// fixed delay between attempts. An empty result is reported as
    /// `PriceUnavailable`.
    pub async fn try_history(
        &self,
        source: &dyn PriceSource,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let attempts = self.retry.attempts();
        let mut attempt = 1;

        let points = loop {
            match source.history(symbol, start, end).await {
                Ok(points) => break points,
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(
                        "{}: attempt {attempt}/{attempts} for {symbol} failed: {e}; retrying",
                        source.name()
                    );
                    tokio::time::sleep(self.retry.delay()).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        let points = Self::clean(symbol, points, start, end);
        if points.is_empty() {
            return Err(CoreError::PriceUnavailable {
                symbol: symbol.to_string(),
                from: start,
                to: end,
            });
        }
        Ok(points)
    }

    /// Like `try_history`, but any failure degrades to an empty history (logged).
    pub async fn history(
        &self,
        source: &dyn PriceSource,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<PricePoint> {
        match self.try_history(source, symbol, start, end).await {
            Ok(points) => points,
            Err(e @ CoreError::PriceUnavailable { .. }) => {
                warn!("{e}");
                Vec::new()
            }
            Err(e) => {
                warn!("{symbol}: giving up on price history ({e}); treating as unavailable");
                Vec::new()
            }
        }
    }

    /// Keep valid points inside `[start, end]`, sorted, one per date.
    fn clean(
        symbol: &str,
        mut points: Vec<PricePoint>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<PricePoint> {
        let before = points.len();
        points.retain(|p| p.is_valid() && p.date >= start && p.date <= end);
        if points.len() < before {
            debug!(
                "{symbol}: discarded {} invalid or out-of-window price points",
                before - points.len()
            );
        }
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        points
    }
}

impl Default for PriceService {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
