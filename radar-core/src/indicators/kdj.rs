//! KDJ stochastic oscillator (9, 3, 3).
//!
//! RSV[t] = (close - LLV(low, n)) / (HHV(high, n) - LLV(low, n)) * 100,
//! K = (1 - 1/m1) * K[t-1] + RSV / m1, D = (1 - 1/m2) * D[t-1] + K / m2,
//! J = 3K - 2D. K and D start from 50. A flat range gives RSV = 50.

use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kdj {
    pub period: usize,
    pub k_smoothing: usize,
    pub d_smoothing: usize,
}

impl Default for Kdj {
    fn default() -> Self {
        Self::new(9, 3, 3)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KdjLines {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
    pub j: Vec<f64>,
}

const SEED: f64 = 50.0;

impl Kdj {
    pub fn new(period: usize, k_smoothing: usize, d_smoothing: usize) -> Self {
        assert!(
            period >= 1 && k_smoothing >= 1 && d_smoothing >= 1,
            "KDJ parameters must be >= 1"
        );
        Self {
            period,
            k_smoothing,
            d_smoothing,
        }
    }

    pub fn lookback(&self) -> usize {
        self.period - 1
    }

    pub fn lines(&self, candles: &[Candle]) -> KdjLines {
        let n = candles.len();
        let mut lines = KdjLines {
            k: vec![f64::NAN; n],
            d: vec![f64::NAN; n],
            j: vec![f64::NAN; n],
        };

        let wk = 1.0 / self.k_smoothing as f64;
        let wd = 1.0 / self.d_smoothing as f64;
        let (mut k, mut d) = (SEED, SEED);
        for i in self.lookback()..n {
            let window = &candles[i + 1 - self.period..=i];
            let llv = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            let hhv = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
            let range = hhv - llv;
            let rsv = if range > 0.0 {
                (candles[i].close - llv) / range * 100.0
            } else {
                SEED
            };
            k = (1.0 - wk) * k + wk * rsv;
            d = (1.0 - wd) * d + wd * k;
            lines.k[i] = k;
            lines.d[i] = d;
            lines.j[i] = 3.0 * k - 2.0 * d;
        }
        lines
    }
}
