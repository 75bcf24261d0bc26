//! Yahoo Finance data provider.
//!
//! Fetches daily bars from Yahoo's v8 chart API. Yahoo has no official API
//! and changes its payload without notice, so every structural surprise maps
//! to `ResponseFormatChanged` and the chain moves on.

use super::provider::{http_client, send_checked, DataError, DataProvider, ProviderRequest, RawTable};
use crate::domain::ProviderId;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds.
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

pub struct YahooProvider {
    client: reqwest::blocking::Client,
}

impl YahooProvider {
    pub fn new(timeout: Duration) -> Result<Self, DataError> {
        Ok(Self {
            client: http_client(ProviderId::Yahoo, timeout)?,
        })
    }

    fn chart_url(request: &ProviderRequest) -> String {
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{}\
             ?period1={}&period2={}&interval=1d&events=history",
            request.symbol, request.start, request.end
        )
    }
}

fn format_changed(detail: impl Into<String>) -> DataError {
    DataError::ResponseFormatChanged {
        provider: ProviderId::Yahoo,
        detail: detail.into(),
    }
}

/// Parse a chart payload into a table with exchange-local dates.
///
/// Rows where every quote field is null (holidays) are dropped.
pub fn parse_chart(symbol: &str, body: &str) -> Result<RawTable, DataError> {
    let resp: ChartResponse = serde_json::from_str(body)
        .map_err(|e| format_changed(format!("failed to parse response for {symbol}: {e}")))?;

    let result = match (resp.chart.result, resp.chart.error) {
        (Some(result), _) => result,
        (None, Some(err)) if err.code == "Not Found" => {
            return Err(DataError::SymbolNotFound {
                provider: ProviderId::Yahoo,
                symbol: symbol.to_string(),
            })
        }
        (None, Some(err)) => return Err(format_changed(format!("{}: {}", err.code, err.description))),
        (None, None) => return Err(format_changed("empty result with no error")),
    };

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| format_changed("result array is empty"))?;

    let mut table = RawTable::new(["date", "open", "high", "low", "close", "volume"]);
    // A range with no sessions comes back without timestamps.
    let Some(timestamps) = data.timestamp else {
        return Ok(table);
    };
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| format_changed("no quote data"))?;
    let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);

    fn at(v: &[Option<f64>], i: usize) -> Option<f64> {
        v.get(i).copied().flatten()
    }
    for (i, &ts) in timestamps.iter().enumerate() {
        let fields = [
            at(&quote.open, i),
            at(&quote.high, i),
            at(&quote.low, i),
            at(&quote.close, i),
            at(&quote.volume, i),
        ];
        if fields.iter().all(Option::is_none) {
            continue;
        }
        let date = chrono::DateTime::from_timestamp(ts + offset, 0)
            .map(|dt| dt.naive_utc().date())
            .ok_or_else(|| format_changed(format!("invalid timestamp: {ts}")))?;

        let mut row = vec![Value::from(date.format("%Y-%m-%d").to_string())];
        row.extend(fields.iter().map(|f| f.map(Value::from).unwrap_or(Value::Null)));
        table.push_row(row);
    }

    Ok(table)
}

impl DataProvider for YahooProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn fetch(&self, request: &ProviderRequest) -> Result<RawTable, DataError> {
        let url = Self::chart_url(request);
        let resp = send_checked(ProviderId::Yahoo, self.client.get(&url))?;
        let body = resp.text().map_err(|e| DataError::ProviderUnavailable {
            provider: ProviderId::Yahoo,
            reason: e.to_string(),
        })?;
        parse_chart(&request.symbol, &body)
    }
}
