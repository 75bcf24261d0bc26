//! Eastmoney data provider.
//!
//! Two endpoints: the daily kline API (exchange-traded securities, addressed
//! by `market.code` secid) and the fund NAV history API for off-exchange
//! funds. Rows are emitted under Eastmoney's own localized headers; the
//! normalizer maps them.

use super::provider::{
    http_client, send_checked, DataError, DataProvider, Endpoint, ProviderRequest, RawTable,
};
use crate::domain::ProviderId;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";
const FUND_NAV_URL: &str = "https://api.fund.eastmoney.com/f10/lsjz";
const FUND_REFERER: &str = "https://fundf10.eastmoney.com/";
const KLINE_COLUMNS: [&str; 7] = ["日期", "开盘", "收盘", "最高", "最低", "成交量", "成交额"];
const FUND_PAGE_SIZE: usize = 20;
const FUND_MAX_PAGES: usize = 60;

#[derive(Debug, Deserialize)]
struct KlineResponse {
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    #[serde(default)]
    klines: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FundResponse {
    data: Option<FundData>,
    #[serde(default)]
    total_count: usize,
    err_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FundData {
    #[serde(rename = "LSJZList", default)]
    rows: Vec<FundRow>,
}

#[derive(Debug, Deserialize)]
struct FundRow {
    #[serde(rename = "FSRQ")]
    date: String,
    #[serde(rename = "DWJZ")]
    nav: String,
}

fn format_changed(detail: impl Into<String>) -> DataError {
    DataError::ResponseFormatChanged {
        provider: ProviderId::Eastmoney,
        detail: detail.into(),
    }
}

/// Parse a kline payload. Each line is `date,open,close,high,low,volume,amount`.
pub fn parse_kline(secid: &str, body: &str) -> Result<RawTable, DataError> {
    let resp: KlineResponse = serde_json::from_str(body)
        .map_err(|e| format_changed(format!("kline response for {secid}: {e}")))?;
    let data = resp.data.ok_or_else(|| DataError::SymbolNotFound {
        provider: ProviderId::Eastmoney,
        symbol: secid.to_string(),
    })?;

    let mut table = RawTable::new(KLINE_COLUMNS);
    for line in &data.klines {
        let cells: Vec<Value> = line
            .split(',')
            .take(KLINE_COLUMNS.len())
            .map(|c| Value::from(c.trim()))
            .collect();
        if cells.len() < 3 {
            return Err(format_changed(format!("short kline row: {line}")));
        }
        table.push_row(cells);
    }
    Ok(table)
}

/// Parse one NAV history page. Returns the rows plus the server's total count.
pub fn parse_fund_page(code: &str, body: &str) -> Result<(Vec<Vec<Value>>, usize), DataError> {
    let resp: FundResponse = serde_json::from_str(body)
        .map_err(|e| format_changed(format!("fund response for {code}: {e}")))?;
    let Some(data) = resp.data else {
        let detail = resp.err_msg.unwrap_or_else(|| "missing Data".into());
        return Err(format_changed(detail));
    };
    let rows = data
        .rows
        .into_iter()
        .map(|r| vec![Value::from(r.date), Value::from(r.nav)])
        .collect();
    Ok((rows, resp.total_count))
}

pub struct EastmoneyProvider {
    client: reqwest::blocking::Client,
}

impl EastmoneyProvider {
    pub fn new(timeout: Duration) -> Result<Self, DataError> {
        Ok(Self {
            client: http_client(ProviderId::Eastmoney, timeout)?,
        })
    }

    fn get_text(&self, request: reqwest::blocking::RequestBuilder) -> Result<String, DataError> {
        send_checked(ProviderId::Eastmoney, request)?
            .text()
            .map_err(|e| DataError::ProviderUnavailable {
                provider: ProviderId::Eastmoney,
                reason: e.to_string(),
            })
    }

    fn fetch_kline(&self, request: &ProviderRequest) -> Result<RawTable, DataError> {
        let query = [
            ("secid", request.symbol.as_str()),
            ("fields1", "f1,f2,f3,f4,f5,f6"),
            ("fields2", "f51,f52,f53,f54,f55,f56,f57"),
            ("klt", "101"),
            ("fqt", "1"),
            ("beg", request.start.as_str()),
            ("end", request.end.as_str()),
        ];
        let body = self.get_text(self.client.get(KLINE_URL).query(&query))?;
        parse_kline(&request.symbol, &body)
    }

    fn fetch_fund_nav(&self, request: &ProviderRequest) -> Result<RawTable, DataError> {
        let mut table = RawTable::new(["净值日期", "单位净值"]);
        let page_size = FUND_PAGE_SIZE.to_string();
        for page in 1..=FUND_MAX_PAGES {
            let page_index = page.to_string();
            let query = [
                ("fundCode", request.symbol.as_str()),
                ("pageIndex", page_index.as_str()),
                ("pageSize", page_size.as_str()),
                ("startDate", request.start.as_str()),
                ("endDate", request.end.as_str()),
            ];
            let body = self.get_text(
                self.client
                    .get(FUND_NAV_URL)
                    .header("Referer", FUND_REFERER)
                    .query(&query),
            )?;
            let (rows, total) = parse_fund_page(&request.symbol, &body)?;
            if rows.is_empty() {
                break;
            }
            for row in rows {
                table.push_row(row);
            }
            if table.len() >= total {
                break;
            }
        }
        Ok(table)
    }
}

impl DataProvider for EastmoneyProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Eastmoney
    }

    fn fetch(&self, request: &ProviderRequest) -> Result<RawTable, DataError> {
        match request.endpoint {
            Endpoint::EastmoneyKline => self.fetch_kline(request),
            Endpoint::EastmoneyFundNav => self.fetch_fund_nav(request),
            other => Err(DataError::ProviderUnavailable {
                provider: ProviderId::Eastmoney,
                reason: format!("endpoint {other:?} not served"),
            }),
        }
    }
}
