use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

use super::valuation::ValuationRow;

// ── Fixed ledger layout (10 logical columns) ────────────────────────

pub const DATE_COL: usize = 0;
pub const MARKER_COL: usize = 1;
/// First of the five positionally overloaded Stock1..Stock5 columns.
pub const FIRST_SLOT_COL: usize = 2;
pub const MAX_MEMBERS: usize = 5;
pub const BASKET_VALUE_COL: usize = 7;
pub const RETURN_COL: usize = 8;
pub const NAV_COL: usize = 9;
pub const COLUMN_COUNT: usize = 10;

/// Text formats accepted in the date column, tried in order.
/// Month-first is tried before day-first for slash dates.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Largest serial day number a spreadsheet can hold (9999-12-31).
const MAX_SERIAL_DAY: f64 = 2_958_465.0;

static EMPTY_CELL: Cell = Cell::Empty;

/// A loosely-typed sheet cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Interpret a raw text field: blank → `Empty`, numeric → `Number`, otherwise `Text`.
    pub fn parse(field: &str) -> Self {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Cell::Number(n),
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Render the cell back to its text form for persistence.
    pub fn render(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
        }
    }

    /// Interpret the cell as a calendar date.
    ///
    /// Numbers are spreadsheet serial days (epoch 1899-12-30, fraction = time of day).
    pub fn to_date(&self) -> Result<NaiveDate, CoreError> {
        match self {
            Cell::Empty => Err(CoreError::DateParse("empty date cell".into())),
            Cell::Number(n) => serial_to_date(*n),
            Cell::Text(s) => parse_date_text(s),
        }
    }
}

fn serial_to_date(serial: f64) -> Result<NaiveDate, CoreError> {
    if !(1.0..=MAX_SERIAL_DAY).contains(&serial) {
        return Err(CoreError::DateParse(format!("serial day {serial} out of range")));
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
        .ok_or_else(|| CoreError::DateParse("invalid serial epoch".into()))?;
    epoch
        .checked_add_signed(Duration::days(serial.trunc() as i64))
        .ok_or_else(|| CoreError::DateParse(format!("serial day {serial} out of range")))
}

fn parse_date_text(text: &str) -> Result<NaiveDate, CoreError> {
    let text = text.trim();
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return Ok(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(dt.date());
        }
    }
    Err(CoreError::DateParse(format!("unrecognised date '{text}'")))
}

/// One raw row of the ledger sheet, exactly as persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawRow {
    pub cells: Vec<Cell>,
}

impl RawRow {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// Build a row from text fields, parsing each into a [`Cell`].
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            cells: fields.into_iter().map(Cell::parse).collect(),
        }
    }

    /// Cell at `col`, `Cell::Empty` past the end of a short row.
    pub fn cell(&self, col: usize) -> &Cell {
        self.cells.get(col).unwrap_or(&EMPTY_CELL)
    }

    /// The five Stock1..Stock5 cells (padded with empties on short rows).
    pub fn slots(&self) -> impl Iterator<Item = &Cell> {
        (FIRST_SLOT_COL..FIRST_SLOT_COL + MAX_MEMBERS).map(|col| self.cell(col))
    }

    pub fn date(&self) -> Result<NaiveDate, CoreError> {
        self.cell(DATE_COL).to_date()
    }

    pub fn marker(&self) -> Option<MarkerKind> {
        self.cell(MARKER_COL).as_text().and_then(MarkerKind::from_token)
    }

    pub fn is_marker(&self, kind: MarkerKind) -> bool {
        self.marker() == Some(kind)
    }

    /// Decide once what this row means.
    pub fn classify(&self) -> Row {
        if let Some(kind) = self.marker() {
            return Row::Marker(MarkerRow {
                kind,
                payload: self.slots().cloned().collect(),
            });
        }

        let date = match self.date() {
            Ok(date) => date,
            Err(e) => return Row::Unparsed(e.to_string()),
        };

        // Prices occupy the leading numeric slots; the first gap ends the list.
        let prices = self.slots().map_while(Cell::as_number).collect();

        Row::Valuation(ValuationRow {
            date,
            prices,
            basket_value: self.cell(BASKET_VALUE_COL).as_number().unwrap_or(0.0),
            daily_return: self.cell(RETURN_COL).as_number().unwrap_or(0.0),
            nav: self.cell(NAV_COL).as_number().unwrap_or(0.0),
        })
    }
}

/// Literal tokens that may appear in the marker column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerKind {
    /// Opens a basket block; Stock1..Stock5 hold the symbol names.
    Stocks,
    /// Follows a `Stocks` row; Stock1..Stock5 hold the matching quantities.
    Quantities,
}

impl MarkerKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim() {
            "Stocks" => Some(MarkerKind::Stocks),
            "Quantities" => Some(MarkerKind::Quantities),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            MarkerKind::Stocks => "Stocks",
            MarkerKind::Quantities => "Quantities",
        }
    }
}

impl std::fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// A basket-redefinition row and its Stock1..Stock5 payload.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerRow {
    pub kind: MarkerKind,
    pub payload: Vec<Cell>,
}

/// A raw row after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Marker(MarkerRow),
    Valuation(ValuationRow),
    /// Not a marker and the date cell could not be read (headers, notes, blanks).
    Unparsed(String),
}
