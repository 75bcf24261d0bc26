//! Data provider trait, raw payload table and structured error types.
//!
//! The DataProvider trait abstracts over data sources (Eastmoney, Sina, SGE,
//! Yahoo, FMP, synthetic) so the chain can swap implementations and tests can script them.

use super::normalize::parse_date;
use crate::domain::{Candle, DateWindow, ErrorKind, ProviderId};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Provider payload in its native column vocabulary.
///
/// Cells stay untyped; reconciling names, dates and numbers is the
/// normalizer's job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RawTable {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with nulls, long rows truncated.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Canonical-schema table for an already normalized series.
    pub fn from_candles(candles: &[Candle]) -> Self {
        let mut table = RawTable::new([
            "date",
            "open",
            "high",
            "low",
            "close",
            "volume",
            "amount",
            "volume_ratio",
        ]);
        for c in candles {
            table.push_row(vec![
                Value::from(c.date.format("%Y-%m-%d").to_string()),
                Value::from(c.open),
                Value::from(c.high),
                Value::from(c.low),
                Value::from(c.close),
                Value::from(c.volume),
                Value::from(c.amount),
                Value::from(c.volume_ratio),
            ]);
        }
        table
    }

    /// Drop rows whose `date_col` cell parses to a date outside `window`.
    /// Rows with unreadable dates stay for the normalizer to count.
    pub fn retain_window(&mut self, date_col: usize, window: DateWindow) {
        self.rows.retain(|row| {
            row.get(date_col)
                .and_then(parse_date)
                .map_or(true, |d| window.contains(d))
        });
    }
}

/// Endpoint family a request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    EastmoneyKline,
    EastmoneyFundNav,
    SinaFuturesDaily,
    SgeSpotDaily,
    YahooChart,
    FmpHistorical,
    Synthetic,
}

/// A fully shaped provider call: transformed symbol, endpoint and the date
/// range already rendered in the provider's own format.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub symbol: String,
    pub endpoint: Endpoint,
    pub window: DateWindow,
    pub start: String,
    pub end: String,
}

/// Structured error types for data acquisition.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("{provider} unavailable: {reason}")]
    ProviderUnavailable { provider: ProviderId, reason: String },

    #[error("rate limited by {provider} (retry after {retry_after_secs}s)")]
    RateLimited {
        provider: ProviderId,
        retry_after_secs: u64,
    },

    #[error("{provider} denied access (HTTP {status})")]
    AccessDenied { provider: ProviderId, status: u16 },

    #[error("{provider} response format changed: {detail}")]
    ResponseFormatChanged { provider: ProviderId, detail: String },

    #[error("symbol not found on {provider}: {symbol}")]
    SymbolNotFound { provider: ProviderId, symbol: String },

    #[error("{provider} returned no data")]
    EmptyResult { provider: ProviderId },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("task timeout after {secs}s")]
    Timeout { secs: f64 },

    #[error("cancelled")]
    Cancelled,

    #[error("no eligible provider for '{instrument}'")]
    NoEligibleProvider { instrument: String },
}

impl DataError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DataError::ProviderUnavailable { .. }
            | DataError::RateLimited { .. }
            | DataError::AccessDenied { .. }
            | DataError::NoEligibleProvider { .. } => ErrorKind::ProviderUnavailable,
            DataError::ResponseFormatChanged { .. } | DataError::Parse(_) => ErrorKind::ParseError,
            DataError::SymbolNotFound { .. } | DataError::EmptyResult { .. } => {
                ErrorKind::EmptyResult
            }
            DataError::Timeout { .. } | DataError::Cancelled => ErrorKind::Timeout,
        }
    }

    /// Whether another attempt against the same provider may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DataError::ProviderUnavailable { .. }
                | DataError::RateLimited { .. }
                | DataError::ResponseFormatChanged { .. }
        )
    }

    pub fn timeout(limit: Duration) -> Self {
        DataError::Timeout {
            secs: limit.as_secs_f64(),
        }
    }
}

/// Trait for market-data providers.
///
/// One `fetch` call is one attempt: a single request, or one pass over a
/// paginated endpoint. Retrying and fallback live above this trait.
pub trait DataProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Fetch the daily history described by `request`.
    fn fetch(&self, request: &ProviderRequest) -> Result<RawTable, DataError>;

    /// False when the provider cannot be used this run (e.g. missing API key).
    fn is_available(&self) -> bool {
        true
    }
}

/// Build the blocking HTTP client a provider keeps for the whole run.
pub(crate) fn http_client(
    provider: ProviderId,
    timeout: Duration,
) -> Result<reqwest::blocking::Client, DataError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
        .build()
        .map_err(|e| DataError::ProviderUnavailable {
            provider,
            reason: format!("failed to build HTTP client: {e}"),
        })
}

/// Send a GET and map transport failures and non-success statuses.
pub(crate) fn send_checked(
    provider: ProviderId,
    request: reqwest::blocking::RequestBuilder,
) -> Result<reqwest::blocking::Response, DataError> {
    let resp = request.send().map_err(|e| DataError::ProviderUnavailable {
        provider,
        reason: e.to_string(),
    })?;

    let status = resp.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(DataError::RateLimited {
            provider,
            retry_after_secs: retry_after,
        });
    }
    if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(DataError::AccessDenied {
            provider,
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        return Err(DataError::ProviderUnavailable {
            provider,
            reason: format!("HTTP {status}"),
        });
    }
    Ok(resp)
}
