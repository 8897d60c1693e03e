use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::CoreError;

use super::range::DateRangeSpec;
use super::sheet::{RawRow, Row};
use super::valuation::ValuationRow;

/// Append-only, date-deduplicated sequence of valuation rows for one basket sheet.
///
/// Rows are kept sorted by date (strictly increasing). This is the single
/// source of truth for the "last known state" that seeds further extension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    rows: Vec<ValuationRow>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the ledger from raw sheet rows.
    ///
    /// Marker rows are skipped. Rows whose date cannot be read are dropped,
    /// as are later rows repeating an earlier date (first occurrence wins).
    pub fn load(raw: &[RawRow]) -> Self {
        let mut seen = HashSet::new();
        let mut rows = Vec::new();

        for (idx, raw_row) in raw.iter().enumerate() {
            match raw_row.classify() {
                Row::Marker(_) => {}
                Row::Unparsed(reason) => {
                    debug!("Dropping sheet row {idx}: {reason}");
                }
                Row::Valuation(row) => {
                    if seen.insert(row.date) {
                        rows.push(row);
                    } else {
                        warn!("Dropping sheet row {idx}: duplicate date {}", row.date);
                    }
                }
            }
        }

        rows.sort_by_key(|r| r.date);
        Self { rows }
    }

    /// Build from already-typed rows, applying the same dedup and ordering as `load`.
    pub fn from_rows(rows: Vec<ValuationRow>) -> Self {
        let mut seen = HashSet::new();
        let mut rows: Vec<ValuationRow> = rows.into_iter().filter(|r| seen.insert(r.date)).collect();
        rows.sort_by_key(|r| r.date);
        Self { rows }
    }

    pub fn rows(&self) -> &[ValuationRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_row(&self) -> Option<&ValuationRow> {
        self.rows.first()
    }

    pub fn last_row(&self) -> Option<&ValuationRow> {
        self.rows.last()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    /// Binary search on the sorted dates.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.rows.binary_search_by_key(&date, |r| r.date).is_ok()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&ValuationRow> {
        self.rows
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|idx| &self.rows[idx])
    }

    /// Basket value of the latest row where it is non-zero.
    pub fn last_nonzero_basket_value(&self) -> Option<f64> {
        self.rows
            .iter()
            .rev()
            .map(|r| r.basket_value)
            .find(|v| *v != 0.0)
    }

    /// NAV of the latest row where it is non-zero.
    pub fn last_nonzero_nav(&self) -> Option<f64> {
        self.rows.iter().rev().map(|r| r.nav).find(|v| *v != 0.0)
    }

    /// Append one row. Fails with `DuplicateDate` if the date is already present.
    pub fn append(&mut self, row: ValuationRow) -> Result<(), CoreError> {
        match self.rows.binary_search_by_key(&row.date, |r| r.date) {
            Ok(_) => Err(CoreError::DuplicateDate(row.date)),
            Err(pos) => {
                // Extension only ever produces later dates, so `pos` is normally the end.
                self.rows.insert(pos, row);
                Ok(())
            }
        }
    }

    /// Append a batch atomically: if any date clashes (with the ledger or
    /// within the batch) nothing is appended.
    pub fn append_all(&mut self, rows: &[ValuationRow]) -> Result<(), CoreError> {
        let mut batch_dates = HashSet::new();
        for row in rows {
            if self.contains(row.date) || !batch_dates.insert(row.date) {
                return Err(CoreError::DuplicateDate(row.date));
            }
        }
        for row in rows {
            self.append(row.clone())?;
        }
        Ok(())
    }

    /// Windowed view of the ledger; pure and repeatable.
    pub fn filter(&self, range: DateRangeSpec) -> Vec<ValuationRow> {
        range.select(&self.rows)
    }
}
