//! Static capability table: which provider serves which asset type, and how.
//!
//! Each entry pairs `(provider, asset type)` with a request-shaping function
//! that transforms the catalog symbol and renders the date range in the
//! provider's format. Adding coverage is a new row here, not a new branch at
//! every call site.

use super::provider::{Endpoint, ProviderRequest};
use crate::domain::{AssetType, DateWindow, ProviderId};
use chrono::{NaiveDate, NaiveTime};

/// Shapes a catalog symbol plus fetch window into a concrete request.
pub type RequestShaper = fn(&str, DateWindow) -> ProviderRequest;

#[derive(Debug, Clone, Copy)]
pub struct Capability {
    pub provider: ProviderId,
    pub asset_type: AssetType,
    pub shape: RequestShaper,
}

const fn cap(provider: ProviderId, asset_type: AssetType, shape: RequestShaper) -> Capability {
    Capability {
        provider,
        asset_type,
        shape,
    }
}

use AssetType as A;
use ProviderId as P;

static CAPABILITIES: &[Capability] = &[
    // Eastmoney
    cap(P::Eastmoney, A::EtfCn, eastmoney_cn),
    cap(P::Eastmoney, A::StockCnA, eastmoney_cn),
    cap(P::Eastmoney, A::StockHk, eastmoney_hk),
    cap(P::Eastmoney, A::StockUs, eastmoney_us),
    cap(P::Eastmoney, A::IndexHk, eastmoney_index_hk),
    cap(P::Eastmoney, A::FundOpen, eastmoney_fund),
    // Domestic futures main contracts and SGE spot
    cap(P::Sina, A::FutureCn, sina_futures),
    cap(P::Sge, A::GoldCn, sge_spot),
    // Yahoo: every exchange-traded type
    cap(P::Yahoo, A::IndexUs, yahoo_chart),
    cap(P::Yahoo, A::IndexHk, yahoo_chart),
    cap(P::Yahoo, A::StockUs, yahoo_chart),
    cap(P::Yahoo, A::StockHk, yahoo_chart),
    cap(P::Yahoo, A::StockVn, yahoo_chart),
    cap(P::Yahoo, A::StockCnA, yahoo_chart),
    cap(P::Yahoo, A::EtfCn, yahoo_chart),
    cap(P::Yahoo, A::FutureForeign, yahoo_chart),
    cap(P::Yahoo, A::FutureCn, yahoo_chart),
    cap(P::Yahoo, A::GoldCn, yahoo_chart),
    // Financial Modeling Prep
    cap(P::Fmp, A::IndexUs, fmp_historical),
    cap(P::Fmp, A::StockUs, fmp_historical),
    cap(P::Fmp, A::FutureForeign, fmp_historical),
    cap(P::Fmp, A::StockVn, fmp_historical),
    cap(P::Fmp, A::EtfCn, fmp_historical),
    // Synthetic: everything
    cap(P::Synthetic, A::IndexUs, synthetic),
    cap(P::Synthetic, A::IndexHk, synthetic),
    cap(P::Synthetic, A::StockUs, synthetic),
    cap(P::Synthetic, A::StockHk, synthetic),
    cap(P::Synthetic, A::StockVn, synthetic),
    cap(P::Synthetic, A::StockCnA, synthetic),
    cap(P::Synthetic, A::EtfCn, synthetic),
    cap(P::Synthetic, A::FundOpen, synthetic),
    cap(P::Synthetic, A::FutureForeign, synthetic),
    cap(P::Synthetic, A::FutureCn, synthetic),
    cap(P::Synthetic, A::GoldCn, synthetic),
];

/// The whole table, in declaration order.
pub fn all() -> &'static [Capability] {
    CAPABILITIES
}

pub fn resolve(provider: ProviderId, asset_type: AssetType) -> Option<RequestShaper> {
    CAPABILITIES
        .iter()
        .find(|c| c.provider == provider && c.asset_type == asset_type)
        .map(|c| c.shape)
}

/// Shape a request, or `None` if the provider does not cover the asset type.
pub fn shape_request(
    provider: ProviderId,
    asset_type: AssetType,
    symbol: &str,
    window: DateWindow,
) -> Option<ProviderRequest> {
    resolve(provider, asset_type).map(|shape| shape(symbol, window))
}

pub fn supported_assets(provider: ProviderId) -> Vec<AssetType> {
    CAPABILITIES
        .iter()
        .filter(|c| c.provider == provider)
        .map(|c| c.asset_type)
        .collect()
}

fn compact(d: NaiveDate) -> String {
    d.format("%Y%m%d").to_string()
}

fn iso(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn request(
    symbol: String,
    endpoint: Endpoint,
    window: DateWindow,
    start: String,
    end: String,
) -> ProviderRequest {
    ProviderRequest {
        symbol,
        endpoint,
        window,
        start,
        end,
    }
}

/// Eastmoney addresses securities as `market.code`; an explicit market
/// prefix in the catalog wins.
fn secid(symbol: &str, market: &str) -> String {
    if symbol.contains('.') {
        symbol.to_string()
    } else {
        format!("{market}.{symbol}")
    }
}

fn eastmoney_kline(symbol: String, window: DateWindow) -> ProviderRequest {
    request(
        symbol,
        Endpoint::EastmoneyKline,
        window,
        compact(window.start),
        compact(window.end),
    )
}

fn eastmoney_cn(symbol: &str, window: DateWindow) -> ProviderRequest {
    // Shanghai listings start with 5 (funds) or 6 (shares); the rest are Shenzhen.
    let market = if symbol.starts_with('5') || symbol.starts_with('6') {
        "1"
    } else {
        "0"
    };
    eastmoney_kline(secid(symbol, market), window)
}

fn eastmoney_hk(symbol: &str, window: DateWindow) -> ProviderRequest {
    eastmoney_kline(secid(symbol, "116"), window)
}

fn eastmoney_us(symbol: &str, window: DateWindow) -> ProviderRequest {
    eastmoney_kline(secid(symbol, "105"), window)
}

fn eastmoney_index_hk(symbol: &str, window: DateWindow) -> ProviderRequest {
    eastmoney_kline(secid(symbol, "100"), window)
}

fn eastmoney_fund(symbol: &str, window: DateWindow) -> ProviderRequest {
    request(
        symbol.to_string(),
        Endpoint::EastmoneyFundNav,
        window,
        iso(window.start),
        iso(window.end),
    )
}

/// Sina main-contract codes are upper case (`rb0` becomes `RB0`).
fn sina_futures(symbol: &str, window: DateWindow) -> ProviderRequest {
    request(
        symbol.trim().to_ascii_uppercase(),
        Endpoint::SinaFuturesDaily,
        window,
        iso(window.start),
        iso(window.end),
    )
}

fn sge_spot(symbol: &str, window: DateWindow) -> ProviderRequest {
    request(
        symbol.trim().to_string(),
        Endpoint::SgeSpotDaily,
        window,
        iso(window.start),
        iso(window.end),
    )
}

fn yahoo_chart(symbol: &str, window: DateWindow) -> ProviderRequest {
    let start_ts = window.start.and_time(NaiveTime::MIN).and_utc().timestamp();
    let end_ts = window.end.and_time(NaiveTime::MIN).and_utc().timestamp() + 86_399;
    request(
        symbol.to_string(),
        Endpoint::YahooChart,
        window,
        start_ts.to_string(),
        end_ts.to_string(),
    )
}

fn fmp_historical(symbol: &str, window: DateWindow) -> ProviderRequest {
    request(
        symbol.to_string(),
        Endpoint::FmpHistorical,
        window,
        iso(window.start),
        iso(window.end),
    )
}

fn synthetic(symbol: &str, window: DateWindow) -> ProviderRequest {
    request(
        symbol.to_string(),
        Endpoint::Synthetic,
        window,
        iso(window.start),
        iso(window.end),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> DateWindow {
        DateWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 29).unwrap(),
        )
    }

    #[test]
    fn table_has_no_duplicate_keys() {
        let mut seen = std::collections::HashSet::new();
        for c in all() {
            assert!(seen.insert((c.provider, c.asset_type)), "duplicate {c:?}");
        }
    }

    #[test]
    fn synthetic_covers_every_asset_type() {
        assert_eq!(supported_assets(ProviderId::Synthetic).len(), AssetType::ALL.len());
    }

    #[test]
    fn yahoo_does_not_serve_open_funds() {
        assert!(resolve(ProviderId::Yahoo, AssetType::FundOpen).is_none());
        assert!(resolve(ProviderId::Eastmoney, AssetType::FundOpen).is_some());
    }

    #[test]
    fn eastmoney_prefixes_market_code() {
        let req = shape_request(ProviderId::Eastmoney, AssetType::EtfCn, "513500", window()).unwrap();
        assert_eq!(req.symbol, "1.513500");
        assert_eq!(req.endpoint, Endpoint::EastmoneyKline);
        assert_eq!(req.start, "20240102");
        assert_eq!(req.end, "20240329");

        let req = shape_request(ProviderId::Eastmoney, AssetType::StockCnA, "000001", window()).unwrap();
        assert_eq!(req.symbol, "0.000001");

        let req = shape_request(ProviderId::Eastmoney, AssetType::StockHk, "00700", window()).unwrap();
        assert_eq!(req.symbol, "116.00700");
    }

    #[test]
    fn explicit_secid_is_kept() {
        let req = shape_request(ProviderId::Eastmoney, AssetType::IndexHk, "124.HSTECH", window()).unwrap();
        assert_eq!(req.symbol, "124.HSTECH");
    }

    #[test]
    fn yahoo_range_is_epoch_seconds_covering_last_day() {
        let req = shape_request(ProviderId::Yahoo, AssetType::IndexUs, "^GSPC", window()).unwrap();
        assert_eq!(req.start, "1704153600");
        assert_eq!(req.end, (1711670400 + 86_399).to_string());
    }

    #[test]
    fn domestic_gold_and_futures_have_a_domestic_source() {
        let req = shape_request(ProviderId::Sina, AssetType::FutureCn, " rb0", window()).unwrap();
        assert_eq!(req.symbol, "RB0");
        assert_eq!(req.endpoint, Endpoint::SinaFuturesDaily);

        let req = shape_request(ProviderId::Sge, AssetType::GoldCn, "Au99.99", window()).unwrap();
        assert_eq!(req.symbol, "Au99.99");
        assert_eq!(req.endpoint, Endpoint::SgeSpotDaily);
        assert_eq!(req.window, window());

        assert_eq!(supported_assets(ProviderId::Sina), vec![AssetType::FutureCn]);
        assert_eq!(supported_assets(ProviderId::Sge), vec![AssetType::GoldCn]);
    }

    #[test]
    fn fund_nav_uses_iso_dates() {
        let req = shape_request(ProviderId::Eastmoney, AssetType::FundOpen, "017641", window()).unwrap();
        assert_eq!(req.endpoint, Endpoint::EastmoneyFundNav);
        assert_eq!(req.start, "2024-01-02");
        assert_eq!(req.symbol, "017641");
    }
}
