//! Shanghai Gold Exchange spot provider.
//!
//! Serves SGE spot contracts (`Au99.99`, `Au(T+D)`, ...) from the exchange's
//! daily quote graph. Each row is `[date, open, close, low, high]`; there is
//! no volume, so the normalizer zero-fills it.

use super::provider::{
    http_client, send_checked, DataError, DataProvider, Endpoint, ProviderRequest, RawTable,
};
use crate::domain::ProviderId;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const DAILY_URL: &str = "https://www.sge.com.cn/graph/Dailyhq";
const REFERER: &str = "https://www.sge.com.cn/sjzx/mrhq";

#[derive(Debug, Deserialize)]
struct DailyResponse {
    time: Option<Vec<Vec<Value>>>,
}

fn format_changed(detail: impl Into<String>) -> DataError {
    DataError::ResponseFormatChanged {
        provider: ProviderId::Sge,
        detail: detail.into(),
    }
}

/// Parse a daily quote payload.
pub fn parse_daily(instid: &str, body: &str) -> Result<RawTable, DataError> {
    let resp: DailyResponse = serde_json::from_str(body)
        .map_err(|e| format_changed(format!("daily response for {instid}: {e}")))?;
    let rows = resp.time.ok_or_else(|| DataError::SymbolNotFound {
        provider: ProviderId::Sge,
        symbol: instid.to_string(),
    })?;

    let mut table = RawTable::new(["date", "open", "close", "low", "high"]);
    for row in rows {
        if row.len() < 5 {
            return Err(format_changed(format!("short daily row: {row:?}")));
        }
        table.push_row(row);
    }
    Ok(table)
}

pub struct SgeProvider {
    client: reqwest::blocking::Client,
}

impl SgeProvider {
    pub fn new(timeout: Duration) -> Result<Self, DataError> {
        Ok(Self {
            client: http_client(ProviderId::Sge, timeout)?,
        })
    }
}

impl DataProvider for SgeProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Sge
    }

    fn fetch(&self, request: &ProviderRequest) -> Result<RawTable, DataError> {
        if request.endpoint != Endpoint::SgeSpotDaily {
            return Err(DataError::ProviderUnavailable {
                provider: ProviderId::Sge,
                reason: format!("endpoint {:?} not served", request.endpoint),
            });
        }
        let form = [("instid", request.symbol.as_str())];
        let body = send_checked(
            ProviderId::Sge,
            self.client.post(DAILY_URL).header("Referer", REFERER).form(&form),
        )?
        .text()
        .map_err(|e| DataError::ProviderUnavailable {
            provider: ProviderId::Sge,
            reason: e.to_string(),
        })?;
        let mut table = parse_daily(&request.symbol, &body)?;
        table.retain_window(0, request.window);
        Ok(table)
    }
}
