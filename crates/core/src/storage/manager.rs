use std::path::Path;

use crate::errors::CoreError;
use crate::models::sheet::RawRow;

use super::format;

/// High-level storage operations: load/save ledger sheets to/from bytes or files.
pub struct SheetStorage;

impl SheetStorage {
    /// Parse raw rows from CSV bytes.
    pub fn load_from_bytes(data: &[u8]) -> Result<Vec<RawRow>, CoreError> {
        format::read_rows(data)
    }

    /// Render rows to CSV bytes.
    pub fn save_to_bytes(rows: &[RawRow]) -> Result<Vec<u8>, CoreError> {
        let mut buf = Vec::new();
        format::write_rows(&mut buf, rows)?;
        Ok(buf)
    }

    pub fn load_rows(path: impl AsRef<Path>) -> Result<Vec<RawRow>, CoreError> {
        let bytes = std::fs::read(path)?;
        Self::load_from_bytes(&bytes)
    }

    /// Write the whole sheet. The file is replaced in one rename so a failed
    /// save leaves the previous sheet intact.
    pub fn save_rows(path: impl AsRef<Path>, rows: &[RawRow]) -> Result<(), CoreError> {
        let path = path.as_ref();
        let bytes = Self::save_to_bytes(rows)?;
        let tmp = path.with_extension("csv.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}
