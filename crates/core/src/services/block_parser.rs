use chrono::NaiveDate;
use log::{debug, info, warn};

use crate::errors::CoreError;
use crate::models::basket::{BasketBlock, BasketDefinition, BasketMember, DateConvention};
use crate::models::sheet::{Cell, MarkerKind, RawRow, Row, FIRST_SLOT_COL};

/// Recovers the ordered basket definitions from a ledger's raw rows.
///
/// A `Stocks` row in the marker column opens a block; its Stock1..Stock5
/// cells name the members. The block runs until the row before the next
/// `Stocks` row (or the end of the sheet). Pure logic, single pass.
pub struct BlockParser {
    default_quantity: f64,
}

impl BlockParser {
    /// `default_quantity` is used for every member of a block without a `Quantities` row.
    pub fn new(default_quantity: f64) -> Self {
        Self { default_quantity }
    }

    /// Basket definitions sorted by effective date.
    pub fn parse(&self, rows: &[RawRow]) -> Result<Vec<BasketDefinition>, CoreError> {
        Ok(self
            .parse_blocks(rows)?
            .into_iter()
            .map(|b| b.definition)
            .collect())
    }

    /// Parsed blocks sorted by effective date.
    ///
    /// A sheet without any `Stocks` marker yields an empty list. Blocks that
    /// cannot be resolved are skipped with a warning. Two blocks taking effect
    /// on the same date with different members fail the whole parse.
    pub fn parse_blocks(&self, rows: &[RawRow]) -> Result<Vec<BasketBlock>, CoreError> {
        let markers: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_marker(MarkerKind::Stocks))
            .map(|(idx, _)| idx)
            .collect();

        if markers.is_empty() {
            info!("No 'Stocks' marker found; sheet has no basket data");
            return Ok(Vec::new());
        }

        let convention = Self::detect_convention(rows, &markers);
        debug!("Basket blocks use the {convention:?} date convention");

        let mut blocks = Vec::with_capacity(markers.len());
        for (n, &marker_row) in markers.iter().enumerate() {
            let last_row = markers
                .get(n + 1)
                .map(|next| next - 1)
                .unwrap_or(rows.len() - 1);

            match self.parse_block(rows, marker_row, last_row, convention) {
                Ok(block) => blocks.push(block),
                Err(e) => warn!("Skipping basket block: {e}"),
            }
        }

        blocks.sort_by_key(|b| b.effective_date());
        Self::dedupe(blocks)
    }

    /// Members of a trailing `Stocks` + `Quantities` pair that has no row
    /// after it yet.
    ///
    /// Such a block has no effective date, so `parse_blocks` skips it; it
    /// takes effect on the first valuation row appended below it.
    pub fn pending_members(&self, rows: &[RawRow]) -> Option<Vec<BasketMember>> {
        let marker_row = rows
            .iter()
            .rposition(|r| r.is_marker(MarkerKind::Stocks))?;
        let quantity_row = rows
            .get(marker_row + 1)
            .filter(|r| r.is_marker(MarkerKind::Quantities))?;
        if marker_row + 2 != rows.len() {
            return None;
        }

        let symbols = Self::symbols(&rows[marker_row], marker_row);
        if symbols.is_empty() {
            return None;
        }
        Some(Self::members_with_quantities(symbols, quantity_row))
    }

    /// One convention per ledger: `Quantities` rows anywhere switch the whole
    /// sheet to the two-rows-below layout.
    fn detect_convention(rows: &[RawRow], markers: &[usize]) -> DateConvention {
        let has_quantities = markers.iter().any(|&idx| {
            rows.get(idx + 1)
                .is_some_and(|r| r.is_marker(MarkerKind::Quantities))
        });
        if has_quantities {
            DateConvention::TwoRowsBelow
        } else {
            DateConvention::PrecedingRow
        }
    }

    fn parse_block(
        &self,
        rows: &[RawRow],
        marker_row: usize,
        last_row: usize,
        convention: DateConvention,
    ) -> Result<BasketBlock, CoreError> {
        let malformed = |reason: String| CoreError::MalformedBlock {
            row: marker_row,
            reason,
        };

        let symbols = Self::symbols(&rows[marker_row], marker_row);
        if symbols.is_empty() {
            return Err(malformed("no usable symbol names".into()));
        }

        let (members, effective_date) = match convention {
            DateConvention::PrecedingRow => {
                let date = marker_row
                    .checked_sub(1)
                    .and_then(|idx| rows[idx].date().ok())
                    .ok_or_else(|| {
                        malformed("the row above the marker has no readable date".into())
                    })?;
                let members = symbols
                    .into_iter()
                    .map(|(_, symbol)| BasketMember::new(symbol, self.default_quantity))
                    .collect::<Vec<_>>();
                (members, date)
            }
            DateConvention::TwoRowsBelow => {
                let quantity_row = (marker_row + 1 <= last_row)
                    .then(|| &rows[marker_row + 1])
                    .filter(|r| r.is_marker(MarkerKind::Quantities))
                    .ok_or_else(|| malformed("missing its 'Quantities' row".into()))?;
                let date = (marker_row + 2 <= last_row)
                    .then(|| rows[marker_row + 2].date().ok())
                    .flatten()
                    .ok_or_else(|| {
                        malformed("the first row after 'Quantities' has no readable date".into())
                    })?;
                (Self::members_with_quantities(symbols, quantity_row), date)
            }
        };

        Ok(BasketBlock {
            definition: BasketDefinition::new(effective_date, members),
            convention,
            marker_row,
            last_row,
            date_span: Self::date_span(&rows[marker_row + 1..=last_row]),
        })
    }

    /// Text cells of the marker row with their slot index, order preserved,
    /// blanks and numbers dropped, repeated symbols kept once.
    fn symbols(marker: &RawRow, marker_row: usize) -> Vec<(usize, String)> {
        let mut symbols: Vec<(usize, String)> = Vec::new();
        for (slot, cell) in marker.slots().enumerate() {
            let Some(symbol) = cell.as_text() else {
                continue;
            };
            if symbols.iter().any(|(_, s)| s == symbol) {
                warn!("Row {marker_row}: symbol {symbol} listed twice; keeping the first");
                continue;
            }
            symbols.push((slot, symbol.to_string()));
        }
        symbols
    }

    fn members_with_quantities(
        symbols: Vec<(usize, String)>,
        quantity_row: &RawRow,
    ) -> Vec<BasketMember> {
        symbols
            .into_iter()
            .map(|(slot, symbol)| BasketMember::new(symbol, Self::quantity(quantity_row, slot)))
            .collect()
    }

    /// Quantity under the given slot of the `Quantities` row; anything but a
    /// non-negative number counts as 0.
    fn quantity(quantity_row: &RawRow, slot: usize) -> f64 {
        match quantity_row.cell(FIRST_SLOT_COL + slot) {
            Cell::Number(q) if *q >= 0.0 => *q,
            Cell::Number(q) => {
                warn!("Quantity {q} for Stock{} is negative; using 0", slot + 1);
                0.0
            }
            _ => 0.0,
        }
    }

    fn date_span(rows: &[RawRow]) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = rows.iter().filter_map(|r| match r.classify() {
            Row::Valuation(v) => Some(v.date),
            _ => None,
        });
        let first = dates.next()?;
        let last = dates.last().unwrap_or(first);
        Some((first, last))
    }

    fn dedupe(blocks: Vec<BasketBlock>) -> Result<Vec<BasketBlock>, CoreError> {
        let mut out: Vec<BasketBlock> = Vec::with_capacity(blocks.len());
        for block in blocks {
            if let Some(prev) = out.last() {
                if prev.effective_date() == block.effective_date() {
                    if !prev.definition.same_members(&block.definition) {
                        return Err(CoreError::AmbiguousBasket {
                            date: block.effective_date(),
                        });
                    }
                    debug!(
                        "Row {}: repeats the basket of row {}; ignored",
                        block.marker_row, prev.marker_row
                    );
                    continue;
                }
            }
            out.push(block);
        }
        Ok(out)
    }
}

impl Default for BlockParser {
    fn default() -> Self {
        Self::new(1.0)
    }
}
