//! MACD (12/26/9).
//!
//! DIF = EMA(fast) - EMA(slow) of close, DEA = EMA(signal) of DIF,
//! histogram = 2 * (DIF - DEA). DIF is defined from index slow-1, DEA and
//! the histogram from slow+signal-2.

use super::{closes, ema_of_series};
use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Macd {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for Macd {
    fn default() -> Self {
        Self::new(12, 26, 9)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacdLines {
    pub dif: Vec<f64>,
    pub dea: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast >= 1 && slow > fast && signal >= 1, "MACD needs 1 <= fast < slow, signal >= 1");
        Self { fast, slow, signal }
    }

    pub fn lookback(&self) -> usize {
        self.slow + self.signal - 2
    }

    pub fn lines(&self, candles: &[Candle]) -> MacdLines {
        let closes = closes(candles);
        let fast = ema_of_series(&closes, self.fast);
        let slow = ema_of_series(&closes, self.slow);
        let dif: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let dea = ema_of_series(&dif, self.signal);
        let histogram = dif.iter().zip(&dea).map(|(d, e)| 2.0 * (d - e)).collect();
        MacdLines {
            dif,
            dea,
            histogram,
        }
    }
}
