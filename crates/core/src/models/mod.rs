pub mod basket;
pub mod ledger;
pub mod price;
pub mod range;
pub mod settings;
pub mod sheet;
pub mod valuation;
