pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use chrono::NaiveDate;
use log::info;
use std::path::Path;

use errors::CoreError;
use models::{
    basket::{BasketBlock, BasketDefinition},
    ledger::Ledger,
    range::DateRangeSpec,
    settings::LedgerSettings,
    sheet::RawRow,
    valuation::{RebasedRow, ValuationRow},
};
use providers::traits::PriceSource;
use services::{
    block_parser::BlockParser,
    nav_service::NavService,
    query_service::{BasketView, QueryService},
};
use storage::manager::SheetStorage;

/// Main entry point for one NAV ledger.
///
/// Owns the sheet's raw rows, the basket blocks parsed from them, the typed
/// ledger and the services that operate on it. Each instance is independent,
/// so separate ledgers can be refreshed concurrently; a single instance must
/// have one writer at a time (`refresh` takes `&mut self`).
#[must_use]
pub struct NavLedger {
    rows: Vec<RawRow>,
    blocks: Vec<BasketBlock>,
    ledger: Ledger,
    parser: BlockParser,
    settings: LedgerSettings,
    nav_service: NavService,
    query_service: QueryService,
    /// Tracks whether any rows were appended since the last save/load.
    dirty: bool,
}

impl std::fmt::Debug for NavLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavLedger")
            .field("raw_rows", &self.rows.len())
            .field("baskets", &self.blocks.len())
            .field("valuation_rows", &self.ledger.len())
            .field("last_date", &self.ledger.last_date())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl NavLedger {
    /// Build a ledger from raw sheet rows.
    ///
    /// Bad blocks and undated rows are skipped with a warning. Fails only on
    /// settings validation or ambiguous basket definitions.
    pub fn from_rows(rows: Vec<RawRow>, settings: LedgerSettings) -> Result<Self, CoreError> {
        settings.validate()?;
        let parser = BlockParser::new(settings.default_quantity);
        let blocks = parser.parse_blocks(&rows)?;
        let ledger = Ledger::load(&rows);
        info!(
            "Loaded ledger: {} rows, {} baskets, {} valuation rows",
            rows.len(),
            blocks.len(),
            ledger.len()
        );

        Ok(Self {
            rows,
            blocks,
            ledger,
            parser,
            nav_service: NavService::from_settings(&settings),
            query_service: QueryService::new(),
            settings,
            dirty: false,
        })
    }

    /// Load a ledger sheet from a CSV file.
    pub fn load_from_file(
        path: impl AsRef<Path>,
        settings: LedgerSettings,
    ) -> Result<Self, CoreError> {
        let rows = SheetStorage::load_rows(path)?;
        Self::from_rows(rows, settings)
    }

    /// Write the sheet, appended rows included, to a CSV file.
    /// Clears the unsaved-changes flag on success.
    pub fn save_to_file(&mut self, path: impl AsRef<Path>) -> Result<(), CoreError> {
        SheetStorage::save_rows(path, &self.rows)?;
        self.dirty = false;
        Ok(())
    }

    /// Render the sheet to CSV bytes.
    /// Clears the unsaved-changes flag on success.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, CoreError> {
        let bytes = SheetStorage::save_to_bytes(&self.rows)?;
        self.dirty = false;
        Ok(bytes)
    }

    // ── Baskets ─────────────────────────────────────────────────────

    /// Basket definitions sorted by effective date.
    #[must_use]
    pub fn baskets(&self) -> Vec<&BasketDefinition> {
        self.blocks.iter().map(|b| &b.definition).collect()
    }

    #[must_use]
    pub fn blocks(&self) -> &[BasketBlock] {
        &self.blocks
    }

    /// The basket in force on `date`.
    pub fn active_basket(&self, date: NaiveDate) -> Result<&BasketDefinition, CoreError> {
        if self.blocks.is_empty() {
            return Err(CoreError::NoBasketData);
        }
        let idx = self.blocks.partition_point(|b| b.effective_date() <= date);
        idx.checked_sub(1)
            .map(|i| &self.blocks[i].definition)
            .ok_or(CoreError::NoActiveBasket(date))
    }

    // ── Extension ───────────────────────────────────────────────────

    /// Fetch missing prices and append new valuation rows up to `today`.
    ///
    /// Returns the rows appended (possibly none). They are added to both the
    /// typed ledger and the raw sheet; nothing is persisted until `save_*`.
    /// A new basket declared at the end of the sheet without a dated row yet
    /// governs the appended rows, and takes effect on the first of them.
    pub async fn refresh(
        &mut self,
        source: &dyn PriceSource,
        today: NaiveDate,
    ) -> Result<Vec<ValuationRow>, CoreError> {
        let basket = match self.parser.pending_members(&self.rows) {
            Some(members) => {
                let start = self.nav_service.start_date(&self.ledger, today);
                info!(
                    "Basket {:?} has no dated row yet; pricing from {start}",
                    members.iter().map(|m| m.symbol.as_str()).collect::<Vec<_>>()
                );
                BasketDefinition::new(start, members)
            }
            None => self.active_basket(today)?.clone(),
        };

        let appended = self
            .nav_service
            .extend(&mut self.ledger, &basket, source, today)
            .await?;

        if !appended.is_empty() {
            self.rows.extend(appended.iter().map(ValuationRow::to_raw));
            self.dirty = true;
            self.blocks = self.parser.parse_blocks(&self.rows)?;
        }
        Ok(appended)
    }

    // ── Queries ─────────────────────────────────────────────────────

    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[must_use]
    pub fn raw_rows(&self) -> &[RawRow] {
        &self.rows
    }

    #[must_use]
    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    #[must_use]
    pub fn window(&self, spec: DateRangeSpec) -> Vec<ValuationRow> {
        self.query_service.window_for(self.ledger.rows(), spec)
    }

    /// Window with NAV rebased to 100 at the window's first row.
    pub fn rebased_window(&self, spec: DateRangeSpec) -> Result<Vec<RebasedRow>, CoreError> {
        self.query_service.rebased_window(self.ledger.rows(), spec)
    }

    /// Valuation rows grouped under the basket that was in force.
    #[must_use]
    pub fn basket_views(&self) -> Vec<BasketView> {
        self.query_service.basket_views(&self.ledger, &self.blocks)
    }

    /// Export the rebased window as JSON for chart renderers.
    pub fn export_window_to_json(&self, spec: DateRangeSpec) -> Result<String, CoreError> {
        let rows = self.rebased_window(spec)?;
        self.query_service.to_json(&rows)
    }

    /// Check if there are unsaved changes since the last save/load.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }
}

/// Refresh several independent ledgers concurrently.
///
/// Every ledger is borrowed mutably exactly once, so each has a single
/// writer. Results are returned in input order.
pub async fn refresh_all(
    ledgers: &mut [NavLedger],
    source: &dyn PriceSource,
    today: NaiveDate,
) -> Vec<Result<Vec<ValuationRow>, CoreError>> {
    let tasks = ledgers
        .iter_mut()
        .map(|ledger| ledger.refresh(source, today));
    futures::future::join_all(tasks).await
}
