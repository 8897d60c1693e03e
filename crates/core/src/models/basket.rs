use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One symbol held in a basket and its quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketMember {
    pub symbol: String,
    pub quantity: f64,
}

impl BasketMember {
    pub fn new(symbol: impl Into<String>, quantity: f64) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
        }
    }
}

/// The symbols and quantities in force from `effective_date` onwards.
///
/// Immutable once produced by the block parser. A chronologically sorted
/// list of definitions forms a step function from date to membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketDefinition {
    pub effective_date: NaiveDate,
    /// Up to five members, symbols unique.
    pub members: Vec<BasketMember>,
}

impl BasketDefinition {
    pub fn new(effective_date: NaiveDate, members: Vec<BasketMember>) -> Self {
        Self {
            effective_date,
            members,
        }
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.symbol.as_str()).collect()
    }

    /// Σ(price_i × quantity_i); prices are positional, missing slots count as zero.
    pub fn value_of(&self, prices: &[f64]) -> f64 {
        self.members
            .iter()
            .enumerate()
            .map(|(i, m)| prices.get(i).copied().unwrap_or(0.0) * m.quantity)
            .sum()
    }

    pub fn same_members(&self, other: &BasketDefinition) -> bool {
        self.members == other.members
    }

    /// The definition governing `date`: the latest one with `effective_date <= date`.
    ///
    /// `definitions` must be sorted by `effective_date`. Returns `None` when
    /// `date` precedes every definition.
    pub fn active_at(definitions: &[BasketDefinition], date: NaiveDate) -> Option<&BasketDefinition> {
        let idx = definitions.partition_point(|d| d.effective_date <= date);
        idx.checked_sub(1).map(|i| &definitions[i])
    }
}

/// Where a block's effective date is read from, relative to its `Stocks` marker.
///
/// One convention applies per ledger: if any `Stocks` row is followed by a
/// `Quantities` row the whole sheet uses [`DateConvention::TwoRowsBelow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateConvention {
    /// `Stocks` alone; the date comes from the row just above the marker.
    PrecedingRow,
    /// `Stocks` + `Quantities`; the date comes from the first row after them.
    TwoRowsBelow,
}

/// A parsed basket block: its definition and where it sits in the sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketBlock {
    pub definition: BasketDefinition,
    pub convention: DateConvention,
    /// Index of the `Stocks` row.
    pub marker_row: usize,
    /// Index of the block's last row (the row before the next marker, or the last row).
    pub last_row: usize,
    /// Dates of the first and last dated valuation rows inside the block, if any.
    pub date_span: Option<(NaiveDate, NaiveDate)>,
}

impl BasketBlock {
    pub fn effective_date(&self) -> NaiveDate {
        self.definition.effective_date
    }
}
