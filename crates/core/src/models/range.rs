use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::CoreError;

use super::valuation::ValuationRow;

/// Public date-range selector for windowed views of a ledger.
///
/// Day/5-day windows count rows; the longer windows are fixed-day
/// calendar spans measured back from the latest date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateRangeSpec {
    #[serde(rename = "1 Day")]
    LastDay,
    #[serde(rename = "5 Days")]
    Last5Days,
    #[serde(rename = "1 Month")]
    Last1Month,
    #[serde(rename = "6 Months")]
    Last6Months,
    #[serde(rename = "1 Year")]
    Last1Year,
    #[serde(rename = "Max")]
    Max,
}

impl DateRangeSpec {
    /// All selectors in display order.
    pub const ALL: [DateRangeSpec; 6] = [
        DateRangeSpec::LastDay,
        DateRangeSpec::Last5Days,
        DateRangeSpec::Last1Month,
        DateRangeSpec::Last6Months,
        DateRangeSpec::Last1Year,
        DateRangeSpec::Max,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DateRangeSpec::LastDay => "1 Day",
            DateRangeSpec::Last5Days => "5 Days",
            DateRangeSpec::Last1Month => "1 Month",
            DateRangeSpec::Last6Months => "6 Months",
            DateRangeSpec::Last1Year => "1 Year",
            DateRangeSpec::Max => "Max",
        }
    }

    /// Number of trailing rows for the row-count windows.
    fn row_count(&self) -> Option<usize> {
        match self {
            DateRangeSpec::LastDay => Some(1),
            DateRangeSpec::Last5Days => Some(5),
            _ => None,
        }
    }

    /// Span in days for the fixed-day windows.
    fn span_days(&self) -> Option<i64> {
        match self {
            DateRangeSpec::Last1Month => Some(30),
            DateRangeSpec::Last6Months => Some(180),
            DateRangeSpec::Last1Year => Some(365),
            _ => None,
        }
    }

    /// Select the window from `rows`, which must be sorted by date ascending.
    /// The result keeps ascending order.
    pub fn select(&self, rows: &[ValuationRow]) -> Vec<ValuationRow> {
        if let Some(n) = self.row_count() {
            let start = rows.len().saturating_sub(n);
            return rows[start..].to_vec();
        }

        if let Some(days) = self.span_days() {
            let Some(latest) = rows.iter().map(|r| r.date).max() else {
                return Vec::new();
            };
            let cutoff = latest - Duration::days(days);
            return rows.iter().filter(|r| r.date >= cutoff).cloned().collect();
        }

        rows.to_vec()
    }
}

impl std::fmt::Display for DateRangeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DateRangeSpec {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        DateRangeSpec::ALL
            .into_iter()
            .find(|spec| spec.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| CoreError::ValidationError(format!("Unknown date range '{s}'")))
    }
}
