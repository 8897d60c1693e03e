use chrono::NaiveDate;
use thiserror::Error;

/// Unified error type for the entire nav-ledger-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Sheet structure ─────────────────────────────────────────────
    /// The sheet cannot be interpreted at all (e.g. no `Date` column).
    /// This is the only load failure that is fatal to a ledger.
    #[error("Invalid sheet: {0}")]
    InvalidSheet(String),

    #[error("Malformed basket block at row {row}: {reason}")]
    MalformedBlock { row: usize, reason: String },

    #[error("Ambiguous basket definitions: two blocks take effect on {date} with different members")]
    AmbiguousBasket { date: NaiveDate },

    #[error("Cannot parse date: {0}")]
    DateParse(String),

    #[error("No basket data found in the sheet")]
    NoBasketData,

    #[error("No basket is in force on {0}")]
    NoActiveBasket(NaiveDate),

    // ── Ledger ──────────────────────────────────────────────────────
    #[error("Ledger already contains a row for {0}")]
    DuplicateDate(NaiveDate),

    #[error("Cannot rebase an empty window")]
    EmptyWindow,

    // ── Prices ──────────────────────────────────────────────────────
    #[error("No price data for {symbol} between {from} and {to}")]
    PriceUnavailable {
        symbol: String,
        from: NaiveDate,
        to: NaiveDate,
    },

    #[error("Transient price source failure ({provider}): {message}")]
    PriceSourceTransient { provider: String, message: String },

    #[error("API error ({provider}): {message}")]
    Api { provider: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    // ── File I/O ────────────────────────────────────────────────────
    #[error("File I/O error: {0}")]
    FileIO(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── Business Logic ──────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl CoreError {
    /// Whether the price retry loop should try the same request again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::PriceSourceTransient { .. } | CoreError::Network(_)
        )
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<csv::Error> for CoreError {
    fn from(e: csv::Error) -> Self {
        CoreError::Csv(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors often carry the full URL, api key included.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
