use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::sheet::{
    Cell, RawRow, BASKET_VALUE_COL, COLUMN_COUNT, DATE_COL, FIRST_SLOT_COL, MAX_MEMBERS, NAV_COL,
    RETURN_COL,
};

/// One daily valuation data point of a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationRow {
    /// Unique key within a ledger.
    pub date: NaiveDate,

    /// Closing prices, aligned positionally with the active basket's members.
    pub prices: Vec<f64>,

    /// Σ(price × quantity) over the active members.
    pub basket_value: f64,

    /// Fractional return against the previous row's basket value.
    #[serde(rename = "return")]
    pub daily_return: f64,

    /// Chained index value.
    pub nav: f64,
}

impl ValuationRow {
    /// Render as a raw sheet row in the fixed 10-column layout.
    pub fn to_raw(&self) -> RawRow {
        let mut cells = vec![Cell::Empty; COLUMN_COUNT];
        cells[DATE_COL] = Cell::Text(self.date.format("%Y-%m-%d").to_string());
        for (i, price) in self.prices.iter().take(MAX_MEMBERS).enumerate() {
            cells[FIRST_SLOT_COL + i] = Cell::Number(*price);
        }
        cells[BASKET_VALUE_COL] = Cell::Number(self.basket_value);
        cells[RETURN_COL] = Cell::Number(self.daily_return);
        cells[NAV_COL] = Cell::Number(self.nav);
        RawRow::new(cells)
    }
}

/// A valuation row with its NAV re-expressed as a 100-based index
/// relative to the first row of the displayed window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebasedRow {
    #[serde(flatten)]
    pub row: ValuationRow,
    pub rebased_nav: f64,
}
