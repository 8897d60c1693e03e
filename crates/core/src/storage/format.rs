use std::io::{Read, Write};

use crate::errors::CoreError;
use crate::models::sheet::{Cell, RawRow, COLUMN_COUNT};

/// Canonical header written above the data rows.
pub const HEADER: [&str; COLUMN_COUNT] = [
    "Date",
    "Marker",
    "Stock1",
    "Stock2",
    "Stock3",
    "Stock4",
    "Stock5",
    "Basket Value",
    "Return",
    "NAV",
];

/// How many leading records may precede the data: a title row, then the header.
pub const HEADER_SEARCH_DEPTH: usize = 2;

/// Read raw ledger rows from CSV.
///
/// The header is the first record (of the first `HEADER_SEARCH_DEPTH`) whose
/// first field is `Date`; everything after it is data. Short records are
/// padded to the fixed 10-column layout, extra trailing fields dropped.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<RawRow>, CoreError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut header_found = false;
    let mut rows = Vec::new();

    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        if !header_found {
            let is_header = record
                .get(0)
                .is_some_and(|f| f.trim().eq_ignore_ascii_case("date"));
            if is_header {
                header_found = true;
                continue;
            }
            if idx + 1 >= HEADER_SEARCH_DEPTH {
                break;
            }
            continue;
        }

        let mut row = RawRow::from_fields(record.iter().take(COLUMN_COUNT));
        row.cells.resize(COLUMN_COUNT, Cell::Empty);
        rows.push(row);
    }

    if !header_found {
        return Err(CoreError::InvalidSheet(format!(
            "no 'Date' column header in the first {HEADER_SEARCH_DEPTH} rows"
        )));
    }
    Ok(rows)
}

/// Write the canonical header followed by all rows.
pub fn write_rows<W: Write>(writer: W, rows: &[RawRow]) -> Result<(), CoreError> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    wtr.write_record(HEADER)?;
    for row in rows {
        let mut fields: Vec<String> = row.cells.iter().map(Cell::render).collect();
        fields.resize(COLUMN_COUNT, String::new());
        wtr.write_record(&fields)?;
    }
    wtr.flush()?;
    Ok(())
}
