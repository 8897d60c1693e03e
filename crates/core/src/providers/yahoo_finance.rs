use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use log::debug;
use time::OffsetDateTime;

use super::traits::PriceSource;
use crate::errors::CoreError;
use crate::models::price::PricePoint;

const NAME: &str = "Yahoo Finance";

/// Yahoo Finance price source for equities, ETFs and indices.
///
/// - **Free**: No API key required.
/// - **Data**: full daily history, closing prices in the listing currency.
///
/// Uses the `yahoo_finance_api` crate which wraps Yahoo Finance's
/// public endpoints.
pub struct YahooFinanceSource {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceSource {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| CoreError::Api {
            provider: NAME.into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }

    /// Convert a `chrono::NaiveDate` to `time::OffsetDateTime` (midnight UTC).
    fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime, CoreError> {
        let invalid = |e: String| CoreError::Api {
            provider: NAME.into(),
            message: format!("Invalid date {date}: {e}"),
        };

        let month = time::Month::try_from(date.month() as u8).map_err(|e| invalid(e.to_string()))?;
        let odt = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
            .map_err(|e| invalid(e.to_string()))?
            .with_hms(0, 0, 0)
            .map_err(|e| invalid(e.to_string()))?
            .assume_utc();
        Ok(odt)
    }

    /// Convert a unix timestamp (seconds) to `chrono::NaiveDate`.
    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }
}

#[async_trait]
impl PriceSource for YahooFinanceSource {
    fn name(&self) -> &str {
        NAME
    }

    async fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let from = Self::to_offset_datetime(start)?;
        let to = Self::to_offset_datetime(end + chrono::Duration::days(1))?; // inclusive end

        // Request failures (connection, throttling, 5xx) are worth retrying.
        let resp = self
            .connector
            .get_quote_history(symbol, from, to)
            .await
            .map_err(|e| CoreError::PriceSourceTransient {
                provider: NAME.into(),
                message: format!("Failed to fetch history for {symbol}: {e}"),
            })?;

        // A response without quotes means nothing traded in the window.
        let quotes = match resp.quotes() {
            Ok(quotes) => quotes,
            Err(e) => {
                debug!("{NAME}: no quotes for {symbol} in {start}..={end}: {e}");
                return Ok(Vec::new());
            }
        };

        let mut points: Vec<PricePoint> = quotes
            .iter()
            .filter_map(|q| {
                let date = Self::timestamp_to_naive_date(q.timestamp as i64)?;
                (date >= start && date <= end).then(|| PricePoint::new(date, q.close))
            })
            .collect();

        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}
