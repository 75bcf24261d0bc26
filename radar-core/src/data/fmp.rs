//! Financial Modeling Prep data provider (`historical-price-full`).
//!
//! Requires an API key. Without one the provider reports itself unavailable
//! and the chain skips it.

use super::provider::{http_client, send_checked, DataError, DataProvider, ProviderRequest, RawTable};
use crate::domain::ProviderId;
use serde_json::Value;
use std::time::Duration;

const BASE_URL: &str = "https://financialmodelingprep.com/api/v3/historical-price-full";
const FIELDS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

pub struct FmpProvider {
    client: reqwest::blocking::Client,
    api_key: Option<String>,
}

impl FmpProvider {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, DataError> {
        Ok(Self {
            client: http_client(ProviderId::Fmp, timeout)?,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }
}

/// Parse a `historical-price-full` payload.
///
/// FMP answers an unknown symbol with `{}` and a bad key with an
/// `"Error Message"` object.
pub fn parse_historical(symbol: &str, body: &str) -> Result<RawTable, DataError> {
    let root: Value = serde_json::from_str(body).map_err(|e| DataError::ResponseFormatChanged {
        provider: ProviderId::Fmp,
        detail: format!("response for {symbol}: {e}"),
    })?;

    if let Some(msg) = root.get("Error Message").and_then(Value::as_str) {
        if msg.to_ascii_lowercase().contains("api key") {
            return Err(DataError::AccessDenied {
                provider: ProviderId::Fmp,
                status: 401,
            });
        }
        return Err(DataError::ProviderUnavailable {
            provider: ProviderId::Fmp,
            reason: msg.to_string(),
        });
    }

    let mut table = RawTable::new(FIELDS);
    let Some(rows) = root.get("historical").and_then(Value::as_array) else {
        return Ok(table);
    };
    for row in rows {
        table.push_row(
            FIELDS
                .iter()
                .map(|f| row.get(*f).cloned().unwrap_or(Value::Null))
                .collect(),
        );
    }
    Ok(table)
}

impl DataProvider for FmpProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Fmp
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn fetch(&self, request: &ProviderRequest) -> Result<RawTable, DataError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(DataError::AccessDenied {
                provider: ProviderId::Fmp,
                status: 401,
            });
        };
        let url = format!("{BASE_URL}/{}", request.symbol);
        let query = [
            ("from", request.start.as_str()),
            ("to", request.end.as_str()),
            ("apikey", key),
        ];
        let body = send_checked(ProviderId::Fmp, self.client.get(&url).query(&query))?
            .text()
            .map_err(|e| DataError::ProviderUnavailable {
                provider: ProviderId::Fmp,
                reason: e.to_string(),
            })?;
        parse_historical(&request.symbol, &body)
    }
}
