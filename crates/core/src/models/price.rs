use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single closing price (date → price).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }

    /// Finite and non-negative.
    pub fn is_valid(&self) -> bool {
        self.price.is_finite() && self.price >= 0.0
    }
}
