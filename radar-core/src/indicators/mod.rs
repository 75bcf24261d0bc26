//! Rolling indicators over a canonical candle series.
//!
//! Every single-line indicator implements [`Indicator`]: full series in,
//! same-length `Vec<f64>` out, `NaN` during warm-up. MACD and KDJ produce
//! several lines at once and expose them through their own `lines` methods.

pub mod ema;
pub mod engine;
pub mod kdj;
pub mod macd;
pub mod rsi;
pub mod signals;
pub mod sma;

pub use ema::{ema_of_series, Ema};
pub use engine::{change_pct, round2, IndicatorConfig, IndicatorEngine};
pub use kdj::{Kdj, KdjLines};
pub use macd::{Macd, MacdLines};
pub use rsi::{rsi_of_series, Rsi};
pub use signals::{detect_signals, SignalInputs, NO_PATTERN};
pub use sma::{sma_of_series, Sma};

use crate::domain::Candle;

/// A single-line indicator.
///
/// No value at index t may depend on candles after t.
pub trait Indicator: Send + Sync {
    /// e.g. "sma_20", "rsi_6".
    fn name(&self) -> &str;

    /// Candles needed before the first defined value.
    fn lookback(&self) -> usize;

    /// Output has the same length as `candles`; the first `lookback()` are NaN.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

pub(crate) fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Last value as `Some` if defined.
pub(crate) fn last_defined(values: &[f64]) -> Option<f64> {
    values.last().copied().filter(|v| v.is_finite())
}

/// Candles from close prices for tests.
///
/// open = previous close (or close for the first candle),
/// high = max(open, close) + 1, low = min(open, close) - 1, volume = 1000.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
                amount: close * 1000.0,
                volume_ratio: 1.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
