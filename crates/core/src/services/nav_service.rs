use chrono::{Duration, NaiveDate};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};

use crate::errors::CoreError;
use crate::models::basket::BasketDefinition;
use crate::models::ledger::Ledger;
use crate::models::price::PricePoint;
use crate::models::settings::LedgerSettings;
use crate::models::valuation::ValuationRow;
use crate::providers::traits::PriceSource;
use crate::services::price_service::PriceService;

/// Last accepted state that the next valuation row chains from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavSeed {
    pub basket_value: f64,
    pub nav: f64,
}

/// Incrementally extends a ledger's valuation series.
///
/// Each run fetches prices for the dates after the ledger's last row up to
/// `today`, computes basket value, return and NAV for every date not yet in
/// the ledger, and appends them. Re-running with the same prices adds nothing.
pub struct NavService {
    price_service: PriceService,
    lookback_days: i64,
    seed_nav: f64,
}

impl NavService {
    pub fn new(price_service: PriceService, lookback_days: i64, seed_nav: f64) -> Self {
        Self {
            price_service,
            lookback_days,
            seed_nav,
        }
    }

    pub fn from_settings(settings: &LedgerSettings) -> Self {
        Self::new(
            PriceService::new(settings.retry.clone()),
            settings.lookback_days,
            settings.seed_nav,
        )
    }

    /// The day after the ledger's last row, or `today - lookback_days` for an empty ledger.
    pub fn start_date(&self, ledger: &Ledger, today: NaiveDate) -> NaiveDate {
        ledger
            .last_date()
            .and_then(|d| d.succ_opt())
            .unwrap_or_else(|| {
                Duration::try_days(self.lookback_days)
                    .and_then(|span| today.checked_sub_signed(span))
                    .unwrap_or(NaiveDate::MIN)
            })
    }

    /// Last non-zero basket value (default 0) and last non-zero NAV (default the seed NAV).
    pub fn seed(&self, ledger: &Ledger) -> NavSeed {
        NavSeed {
            basket_value: ledger.last_nonzero_basket_value().unwrap_or(0.0),
            nav: ledger.last_nonzero_nav().unwrap_or(self.seed_nav),
        }
    }

    /// Fetch missing prices for `basket`, compute the new rows and append them.
    ///
    /// Returns exactly the rows appended, possibly none. The batch is built in
    /// memory and appended as a whole.
    pub async fn extend(
        &self,
        ledger: &mut Ledger,
        basket: &BasketDefinition,
        source: &dyn PriceSource,
        today: NaiveDate,
    ) -> Result<Vec<ValuationRow>, CoreError> {
        let start = self.start_date(ledger, today);
        if start > today {
            debug!("Ledger is up to date (last row {:?})", ledger.last_date());
            return Ok(Vec::new());
        }

        let mut histories = Vec::with_capacity(basket.members.len());
        for member in &basket.members {
            let points = self
                .price_service
                .history(source, &member.symbol, start, today)
                .await;
            histories.push(points);
        }

        if histories.iter().all(Vec::is_empty) {
            info!("No prices for any of {:?} in {start}..={today}; nothing to add", basket.symbols());
            return Ok(Vec::new());
        }

        let rows = self.compute_rows(ledger, basket, &histories, start, today);
        ledger.append_all(&rows)?;

        if let (Some(first), Some(last)) = (rows.first(), rows.last()) {
            info!(
                "Appended {} valuation rows ({} to {}), NAV {:.4}",
                rows.len(),
                first.date,
                last.date,
                last.nav
            );
        }
        Ok(rows)
    }

    /// Build valuation rows from per-member price histories without touching the ledger.
    ///
    /// `histories` is positional with `basket.members`. Candidate dates are the
    /// union of all returned dates inside `[start, today]`, minus dates the
    /// ledger already holds. A member with no history at all is priced at zero;
    /// a member missing a single date carries its last known price forward.
    pub fn compute_rows(
        &self,
        ledger: &Ledger,
        basket: &BasketDefinition,
        histories: &[Vec<PricePoint>],
        start: NaiveDate,
        today: NaiveDate,
    ) -> Vec<ValuationRow> {
        let by_date: Vec<BTreeMap<NaiveDate, f64>> = histories
            .iter()
            .map(|points| points.iter().map(|p| (p.date, p.price)).collect())
            .collect();

        let candidates: BTreeSet<NaiveDate> = by_date
            .iter()
            .flat_map(|m| m.keys().copied())
            .filter(|d| *d >= start && *d <= today)
            .collect();

        for (member, prices) in basket.members.iter().zip(&by_date) {
            if prices.is_empty() {
                warn!(
                    "{}: no price data in {start}..={today}; valued at zero for this extension",
                    member.symbol
                );
            }
        }

        let mut last_known = Self::carried_prices(ledger, basket);
        let mut prev = self.seed(ledger);
        let mut rows = Vec::new();

        for date in candidates {
            if ledger.contains(date) {
                continue;
            }

            let mut prices = Vec::with_capacity(basket.members.len());
            for (i, member) in basket.members.iter().enumerate() {
                let series = by_date.get(i);
                let price = match series.and_then(|s| s.get(&date)) {
                    Some(p) => {
                        last_known[i] = Some(*p);
                        *p
                    }
                    None if series.is_some_and(|s| !s.is_empty()) => {
                        let carried = last_known[i].unwrap_or(0.0);
                        debug!("{}: no price on {date}; carrying {carried}", member.symbol);
                        carried
                    }
                    None => 0.0,
                };
                prices.push(price);
            }

            let basket_value = basket.value_of(&prices);
            let daily_return = if prev.basket_value != 0.0 {
                (basket_value - prev.basket_value) / prev.basket_value
            } else {
                0.0
            };
            let nav = prev.nav * (1.0 + daily_return);

            rows.push(ValuationRow {
                date,
                prices,
                basket_value,
                daily_return,
                nav,
            });
            prev = NavSeed { basket_value, nav };
        }

        rows
    }

    /// Per-member prices to carry forward, taken from the ledger's last row when
    /// that row already belongs to `basket` (dated on or after its effective date).
    fn carried_prices(ledger: &Ledger, basket: &BasketDefinition) -> Vec<Option<f64>> {
        let last = ledger
            .last_row()
            .filter(|row| row.date >= basket.effective_date);
        (0..basket.members.len())
            .map(|i| {
                last.and_then(|row| row.prices.get(i).copied())
                    .filter(|p| *p > 0.0)
            })
            .collect()
    }
}

impl Default for NavService {
    fn default() -> Self {
        Self::from_settings(&LedgerSettings::default())
    }
}
