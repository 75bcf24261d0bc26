//! Canonical daily candle and its report-row form.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Canonical daily OHLCV record for one instrument.
///
/// Every field is finite once the normalizer has produced it. Missing source
/// values are zero-filled rather than carried as NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub amount: f64,
    pub volume_ratio: f64,
}

impl Candle {
    /// Candle where open/high/low equal close and volume is zero (NAV-style row).
    pub fn flat(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
            amount: 0.0,
            volume_ratio: 0.0,
        }
    }

    /// True if every numeric field is finite.
    pub fn is_finite(&self) -> bool {
        [
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.amount,
            self.volume_ratio,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// A candle tagged with the instrument's display name.
///
/// This is the row shape of the per-group report output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleRecord {
    pub name: String,
    #[serde(flatten)]
    pub candle: Candle,
}

impl CandleRecord {
    pub fn new(name: impl Into<String>, candle: Candle) -> Self {
        Self {
            name: name.into(),
            candle,
        }
    }
}

/// True if `series` is strictly ascending by date (which also rules out duplicates).
pub fn is_canonical_order(series: &[Candle]) -> bool {
    series.windows(2).all(|w| w[0].date < w[1].date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn flat_candle_copies_close() {
        let c = Candle::flat(day(1), 1.234);
        assert_eq!(c.open, 1.234);
        assert_eq!(c.high, 1.234);
        assert_eq!(c.low, 1.234);
        assert!(c.is_finite());
    }

    #[test]
    fn nan_field_is_not_finite() {
        let mut c = Candle::flat(day(1), 10.0);
        c.volume_ratio = f64::NAN;
        assert!(!c.is_finite());
    }

    #[test]
    fn canonical_order_rejects_duplicates() {
        let series = vec![Candle::flat(day(1), 1.0), Candle::flat(day(1), 2.0)];
        assert!(!is_canonical_order(&series));
        let series = vec![Candle::flat(day(1), 1.0), Candle::flat(day(2), 2.0)];
        assert!(is_canonical_order(&series));
    }

    #[test]
    fn record_serializes_flat() {
        let rec = CandleRecord::new("Gold", Candle::flat(day(4), 2000.0));
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["name"], "Gold");
        assert_eq!(json["date"], "2024-03-04");
        assert_eq!(json["close"], 2000.0);
    }
}
