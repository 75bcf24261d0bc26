//! Exponential Moving Average (EMA).
//!
//! EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1).
//! Seeded with the SMA of the first `period` values. Lookback: period - 1.

use super::{closes, Indicator};
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        ema_of_series(&closes(candles), self.period)
    }
}

/// EMA of an arbitrary series.
///
/// Leading NaNs are skipped: the seed window starts at the first defined
/// value, so an EMA of another indicator's output (MACD's signal line) lines
/// up with that output. A NaN after the seed taints everything after it.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 {
        return result;
    }
    let Some(first) = values.iter().position(|v| !v.is_nan()) else {
        return result;
    };
    if n - first < period {
        return result;
    }

    let seed_window = &values[first..first + period];
    if seed_window.iter().any(|v| v.is_nan()) {
        return result;
    }
    let seed_idx = first + period - 1;
    let mut prev = seed_window.iter().sum::<f64>() / period as f64;
    result[seed_idx] = prev;

    let alpha = 2.0 / (period as f64 + 1.0);
    for i in seed_idx + 1..n {
        if values[i].is_nan() {
            return result;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }
    result
}
