pub mod registry;
pub mod traits;

// Price source implementations
pub mod alphavantage;
pub mod yahoo_finance;
