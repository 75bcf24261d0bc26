//! Sina Finance futures provider.
//!
//! Serves domestic futures main contracts (`RB0`, `AU0`, `M0`, ...) from
//! Sina's daily kline service. The payload is JSONP wrapping an array of
//! `{d, o, h, l, c, v, p, s}` objects with string-encoded numbers, covering
//! the contract's whole history; rows outside the fetch window are dropped.

use super::provider::{
    http_client, send_checked, DataError, DataProvider, Endpoint, ProviderRequest, RawTable,
};
use crate::domain::ProviderId;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const KLINE_BASE: &str = "https://stock2.finance.sina.com.cn/futures/api/jsonp.php";

#[derive(Debug, Deserialize)]
struct DailyBar {
    d: String,
    o: Value,
    h: Value,
    l: Value,
    c: Value,
    #[serde(default)]
    v: Value,
    /// Open interest.
    #[serde(default)]
    p: Value,
}

fn format_changed(detail: impl Into<String>) -> DataError {
    DataError::ResponseFormatChanged {
        provider: ProviderId::Sina,
        detail: detail.into(),
    }
}

/// The JSON inside `var _X=( ... );`, or `None` if the callback is missing.
fn jsonp_payload(body: &str) -> Option<&str> {
    let open = body.find('(')?;
    let close = body.rfind(')')?;
    (open < close).then(|| body[open + 1..close].trim())
}

/// Parse a daily kline JSONP payload.
pub fn parse_daily_kline(symbol: &str, body: &str) -> Result<RawTable, DataError> {
    let payload = jsonp_payload(body)
        .ok_or_else(|| format_changed(format!("no JSONP callback for {symbol}")))?;
    // Unknown contracts come back as `null`.
    if payload.is_empty() || payload == "null" {
        return Err(DataError::SymbolNotFound {
            provider: ProviderId::Sina,
            symbol: symbol.to_string(),
        });
    }
    let bars: Vec<DailyBar> = serde_json::from_str(payload)
        .map_err(|e| format_changed(format!("kline payload for {symbol}: {e}")))?;

    let mut table = RawTable::new(["date", "open", "high", "low", "close", "volume", "open_interest"]);
    for bar in bars {
        table.push_row(vec![Value::from(bar.d), bar.o, bar.h, bar.l, bar.c, bar.v, bar.p]);
    }
    Ok(table)
}

pub struct SinaProvider {
    client: reqwest::blocking::Client,
}

impl SinaProvider {
    pub fn new(timeout: Duration) -> Result<Self, DataError> {
        Ok(Self {
            client: http_client(ProviderId::Sina, timeout)?,
        })
    }

    fn kline_url(request: &ProviderRequest) -> String {
        // The callback name only has to be unique per request.
        let tag = request.window.end.format("%Y_%-m_%-d");
        format!(
            "{KLINE_BASE}/var%20_{sym}{tag}=/InnerFuturesNewService.getDailyKLine?symbol={sym}&type={tag}",
            sym = request.symbol
        )
    }
}

impl DataProvider for SinaProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Sina
    }

    fn fetch(&self, request: &ProviderRequest) -> Result<RawTable, DataError> {
        if request.endpoint != Endpoint::SinaFuturesDaily {
            return Err(DataError::ProviderUnavailable {
                provider: ProviderId::Sina,
                reason: format!("endpoint {:?} not served", request.endpoint),
            });
        }
        let url = Self::kline_url(request);
        let body = send_checked(ProviderId::Sina, self.client.get(&url))?
            .text()
            .map_err(|e| DataError::ProviderUnavailable {
                provider: ProviderId::Sina,
                reason: e.to_string(),
            })?;
        let mut table = parse_daily_kline(&request.symbol, &body)?;
        table.retain_window(0, request.window);
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::normalize::normalize;
    use crate::domain::DateWindow;
    use chrono::NaiveDate;

    const BODY: &str = r#"/*<script>location.href='//sina.com';</script>*/
var _RB02024_3_5=([{"d":"2024-03-01","o":"3850.000","h":"3880.000","l":"3831.000","c":"3866.000","v":"1520334","p":"1789012","s":"3858.000"},{"d":"2024-03-04","o":"3862.000","h":"3870.000","l":"3790.000","c":"3801.000","v":"2011456","p":"1801234","s":"3822.000"},{"d":"2024-03-05","o":"3800.000","h":"3815.000","l":"3772.000","c":"3779.000","v":"1876543","p":"1795678","s":"3790.000"}]);"#;

    #[test]
    fn kline_rows_normalize() {
        let table = parse_daily_kline("RB0", BODY).unwrap();
        assert_eq!(table.len(), 3);

        let series = normalize(&table).unwrap();
        assert_eq!(series[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(series[0].open, 3850.0);
        assert_eq!(series[1].low, 3790.0);
        assert_eq!(series[2].close, 3779.0);
        assert_eq!(series[2].volume, 1_876_543.0);
    }

    #[test]
    fn fetch_window_trims_full_history() {
        let mut table = parse_daily_kline("RB0", BODY).unwrap();
        let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        table.retain_window(0, DateWindow::new(d(4), d(5)));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn null_payload_is_symbol_not_found() {
        let err = parse_daily_kline("XX0", "var _XX02024_3_5=(null);").unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
    }

    #[test]
    fn missing_callback_is_format_change() {
        let err = parse_daily_kline("RB0", "<html>blocked</html>").unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn empty_array_is_empty_table() {
        assert!(parse_daily_kline("RB0", "var _RB0=([]);").unwrap().is_empty());
    }
}
