use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::traits::PriceSource;
use crate::errors::CoreError;
use crate::models::price::PricePoint;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const NAME: &str = "Alpha Vantage";

/// Alpha Vantage price source, used as a keyed fallback behind Yahoo.
///
/// - **Free tier**: 25 requests/day (across ALL endpoints).
/// - **Requires**: API key (set via settings as "alphavantage").
/// - Compact daily series only (last 100 trading days), which covers
///   any incremental extension window.
pub struct AlphaVantageSource {
    client: Client,
    api_key: String,
}

impl AlphaVantageSource {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, api_key }
    }
}

// ── Alpha Vantage API response types ────────────────────────────────

#[derive(Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyData>>,
    /// Set when the daily request quota is exhausted.
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Deserialize)]
struct DailyData {
    #[serde(rename = "4. close")]
    close: String,
}

#[async_trait]
impl PriceSource for AlphaVantageSource {
    fn name(&self) -> &str {
        NAME
    }

    async fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let body = self
            .client
            .get(BASE_URL)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", &symbol.to_uppercase()),
                ("outputsize", "compact"),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?
            .text()
            .await?;

        parse_series(symbol, &body, start, end)
    }
}

/// Closing prices inside `[start, end]` from a `TIME_SERIES_DAILY` body.
///
/// Quota notices are transient; a body without a series is an API error.
pub fn parse_series(
    symbol: &str,
    body: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<PricePoint>, CoreError> {
    let resp: TimeSeriesResponse = serde_json::from_str(body).map_err(|e| CoreError::Api {
        provider: NAME.into(),
        message: format!("Failed to parse time series for {symbol}: {e}"),
    })?;

    if let Some(limit) = resp.note.or(resp.information) {
        return Err(CoreError::PriceSourceTransient {
            provider: NAME.into(),
            message: limit,
        });
    }

    let Some(time_series) = resp.time_series else {
        return Err(CoreError::Api {
            provider: NAME.into(),
            message: format!("No time series data for {symbol}"),
        });
    };

    let mut points: Vec<PricePoint> = time_series
        .iter()
        .filter_map(|(date_str, data)| {
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
            if date >= start && date <= end {
                let price: f64 = data.close.parse().ok()?;
                Some(PricePoint::new(date, price))
            } else {
                None
            }
        })
        .collect();

    points.sort_by_key(|p| p.date);
    Ok(points)
}
