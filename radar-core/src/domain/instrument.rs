use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// External data source identifier.
///
/// Ordering is used only for deterministic map iteration; the fetch order is
/// always taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    Eastmoney,
    /// Sina Finance futures, main (continuous) contracts.
    Sina,
    /// Shanghai Gold Exchange spot quotes.
    Sge,
    Yahoo,
    Fmp,
    Synthetic,
}

impl ProviderId {
    pub const ALL: [ProviderId; 6] = [
        ProviderId::Eastmoney,
        ProviderId::Sina,
        ProviderId::Sge,
        ProviderId::Yahoo,
        ProviderId::Fmp,
        ProviderId::Synthetic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Eastmoney => "eastmoney",
            ProviderId::Sina => "sina",
            ProviderId::Sge => "sge",
            ProviderId::Yahoo => "yahoo",
            ProviderId::Fmp => "fmp",
            ProviderId::Synthetic => "synthetic",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderId::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown provider '{s}'"))
    }
}

/// Asset-type tag used to pick a provider endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    IndexUs,
    IndexHk,
    StockUs,
    StockHk,
    StockVn,
    StockCnA,
    EtfCn,
    /// Off-exchange mutual fund, published as a daily NAV only.
    FundOpen,
    FutureForeign,
    FutureCn,
    GoldCn,
}

impl AssetType {
    pub const ALL: [AssetType; 11] = [
        AssetType::IndexUs,
        AssetType::IndexHk,
        AssetType::StockUs,
        AssetType::StockHk,
        AssetType::StockVn,
        AssetType::StockCnA,
        AssetType::EtfCn,
        AssetType::FundOpen,
        AssetType::FutureForeign,
        AssetType::FutureCn,
        AssetType::GoldCn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::IndexUs => "index_us",
            AssetType::IndexHk => "index_hk",
            AssetType::StockUs => "stock_us",
            AssetType::StockHk => "stock_hk",
            AssetType::StockVn => "stock_vn",
            AssetType::StockCnA => "stock_cn_a",
            AssetType::EtfCn => "etf_cn",
            AssetType::FundOpen => "fund_open",
            AssetType::FutureForeign => "future_foreign",
            AssetType::FutureCn => "future_cn",
            AssetType::GoldCn => "gold_cn",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive calendar-day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Window of `days` calendar days ending at `end` (inclusive).
    ///
    /// Saturates at the earliest representable date; negative `days` gives a
    /// single-day window.
    pub fn trailing(end: NaiveDate, days: i64) -> Self {
        let back = Days::new(days.max(0).unsigned_abs());
        Self {
            start: end.checked_sub_days(back).unwrap_or(NaiveDate::MIN),
            end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }
}

/// One tracked financial symbol with its provider-specific identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Display name; unique within a run.
    pub name: String,
    pub asset_type: AssetType,
    /// Symbol per provider. A provider without an entry is skipped.
    pub symbols: BTreeMap<ProviderId, String>,
    /// Full-history fetch range (must cover the longest indicator window).
    pub window: DateWindow,
}

impl Instrument {
    pub fn new(name: impl Into<String>, asset_type: AssetType, window: DateWindow) -> Self {
        Self {
            name: name.into(),
            asset_type,
            symbols: BTreeMap::new(),
            window,
        }
    }

    /// Builder-style helper for attaching a provider symbol.
    pub fn with_symbol(mut self, provider: ProviderId, symbol: impl Into<String>) -> Self {
        self.symbols.insert(provider, symbol.into());
        self
    }

    /// Provider symbol, ignoring blank entries.
    pub fn symbol_for(&self, provider: ProviderId) -> Option<&str> {
        self.symbols
            .get(&provider)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}
