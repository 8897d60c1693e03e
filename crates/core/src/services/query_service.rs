use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::models::basket::{BasketBlock, BasketDefinition};
use crate::models::ledger::Ledger;
use crate::models::range::DateRangeSpec;
use crate::models::valuation::{RebasedRow, ValuationRow};

/// One basket block's slice of the ledger: the member list followed by the
/// valuation rows recorded while it was in force.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketView {
    pub basket: BasketDefinition,
    pub rows: Vec<ValuationRow>,
}

/// Read-only views over a ledger for charting and reporting consumers.
///
/// The core computes all the numbers; the frontend only renders.
pub struct QueryService;

impl QueryService {
    pub fn new() -> Self {
        Self
    }

    /// Rows of the selected window, ascending by date. `rows` must be sorted.
    pub fn window_for(&self, rows: &[ValuationRow], spec: DateRangeSpec) -> Vec<ValuationRow> {
        spec.select(rows)
    }

    /// Re-express NAV as a 100-based index anchored at the first row of `rows`.
    ///
    /// Anchoring is relative to the window passed in, not the ledger's first row.
    pub fn rebase(&self, rows: &[ValuationRow]) -> Result<Vec<RebasedRow>, CoreError> {
        let first = rows.first().ok_or(CoreError::EmptyWindow)?;
        let base = first.nav;
        if base == 0.0 || !base.is_finite() {
            return Err(CoreError::ValidationError(format!(
                "cannot rebase from a NAV of {base} on {}",
                first.date
            )));
        }

        Ok(rows
            .iter()
            .map(|row| RebasedRow {
                row: row.clone(),
                rebased_nav: row.nav / base * 100.0,
            })
            .collect())
    }

    /// Window then rebase.
    pub fn rebased_window(
        &self,
        rows: &[ValuationRow],
        spec: DateRangeSpec,
    ) -> Result<Vec<RebasedRow>, CoreError> {
        self.rebase(&self.window_for(rows, spec))
    }

    /// Group the ledger's rows by basket block, in block order.
    ///
    /// A block owns the rows dated from the first valuation row inside its span
    /// up to (not including) the next block's first dated row; the last block
    /// is open-ended so freshly appended rows land in it. `blocks` must be
    /// sorted by effective date.
    pub fn basket_views(&self, ledger: &Ledger, blocks: &[BasketBlock]) -> Vec<BasketView> {
        let starts: Vec<Option<NaiveDate>> =
            blocks.iter().map(|b| b.date_span.map(|(first, _)| first)).collect();

        blocks
            .iter()
            .enumerate()
            .map(|(n, block)| {
                let rows = match starts[n] {
                    Some(from) => {
                        let until = starts[n + 1..].iter().flatten().next().copied();
                        ledger
                            .rows()
                            .iter()
                            .filter(|r| r.date >= from && until.map_or(true, |u| r.date < u))
                            .cloned()
                            .collect()
                    }
                    None => Vec::new(),
                };
                BasketView {
                    basket: block.definition.clone(),
                    rows,
                }
            })
            .collect()
    }

    /// Serialize rows (plain or rebased) to JSON for external renderers.
    pub fn to_json<T: Serialize>(&self, rows: &[T]) -> Result<String, CoreError> {
        serde_json::to_string_pretty(rows)
            .map_err(|e| CoreError::ValidationError(format!("Failed to serialize rows: {e}")))
    }
}

impl Default for QueryService {
    fn default() -> Self {
        Self::new()
    }
}
