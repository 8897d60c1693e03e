use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::price::PricePoint;

/// A source of daily closing prices.
///
/// Implementations return whatever the upstream has for the window, which
/// may be empty. Failures worth retrying are reported as
/// `CoreError::PriceSourceTransient` (or `CoreError::Network`).
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Human-readable name of this source (for logs/errors).
    fn name(&self) -> &str;

    /// Closing prices for `symbol` on trading days in `[start, end]`, sorted by date.
    async fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError>;
}
