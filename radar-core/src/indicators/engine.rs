//! Indicator snapshot for one instrument's full history.

use super::signals::{detect_signals, SignalInputs};
use super::{last_defined, Indicator, Kdj, Macd, Rsi, Sma};
use crate::domain::{Candle, IndicatorSnapshot, KdjValues, MacdValues};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub ma_windows: Vec<usize>,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub kdj_period: usize,
    pub kdj_k: usize,
    pub kdj_d: usize,
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ma_windows: vec![5, 10, 20, 60, 120, 250],
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            kdj_period: 9,
            kdj_k: 3,
            kdj_d: 3,
            rsi_period: 6,
            rsi_overbought: 80.0,
            rsi_oversold: 20.0,
        }
    }
}

impl IndicatorConfig {
    /// Candles needed for every configured line to be defined.
    pub fn longest_lookback(&self) -> usize {
        let ma = self.ma_windows.iter().copied().max().unwrap_or(1);
        let macd = self.macd_slow.saturating_add(self.macd_signal) - 1;
        ma.max(macd).max(self.kdj_period).max(self.rsi_period.saturating_add(1))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.ma_windows.iter().any(|&w| w == 0) {
            return Err("ma_windows must be >= 1".into());
        }
        if self.macd_fast == 0 || self.macd_slow <= self.macd_fast || self.macd_signal == 0 {
            return Err("MACD needs 1 <= fast < slow and signal >= 1".into());
        }
        if self.kdj_period == 0 || self.kdj_k == 0 || self.kdj_d == 0 || self.rsi_period == 0 {
            return Err("KDJ and RSI periods must be >= 1".into());
        }
        if self.rsi_oversold >= self.rsi_overbought {
            return Err("rsi_oversold must be below rsi_overbought".into());
        }
        Ok(())
    }
}

/// Round half away from zero to 2 decimals.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Percent change of the last close against the one before, 2 decimals.
///
/// 0 when there is no previous close or it is zero.
pub fn change_pct(candles: &[Candle]) -> f64 {
    match candles {
        [.., prev, last] if prev.close != 0.0 => {
            let pct = (last.close - prev.close) / prev.close * 100.0;
            if pct.is_finite() {
                round2(pct)
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

fn rounded(values: &[f64]) -> Option<f64> {
    last_defined(values).map(round2)
}

pub struct IndicatorEngine {
    config: IndicatorConfig,
    mas: Vec<Sma>,
    macd: Macd,
    kdj: Kdj,
    rsi: Rsi,
}

impl IndicatorEngine {
    /// Panics on parameters `IndicatorConfig::validate` rejects.
    pub fn new(config: IndicatorConfig) -> Self {
        let mas = config.ma_windows.iter().map(|&w| Sma::new(w)).collect();
        let macd = Macd::new(config.macd_fast, config.macd_slow, config.macd_signal);
        let kdj = Kdj::new(config.kdj_period, config.kdj_k, config.kdj_d);
        let rsi = Rsi::new(config.rsi_period);
        Self {
            config,
            mas,
            macd,
            kdj,
            rsi,
        }
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    /// Full MA lines keyed by window, each as long as `candles`.
    pub fn moving_averages(&self, candles: &[Candle]) -> BTreeMap<usize, Vec<f64>> {
        self.mas
            .iter()
            .map(|sma| (sma.period(), sma.compute(candles)))
            .collect()
    }

    /// Snapshot as of the last candle. `None` for an empty series.
    ///
    /// `candles` must be ascending with unique dates.
    pub fn snapshot(&self, name: &str, candles: &[Candle]) -> Option<IndicatorSnapshot> {
        let last = candles.last()?;
        debug_assert!(crate::domain::is_canonical_order(candles));

        let ma = self
            .moving_averages(candles)
            .into_iter()
            .map(|(w, line)| (w, rounded(&line)))
            .collect();
        let macd = self.macd.lines(candles);
        let kdj = self.kdj.lines(candles);
        let rsi = self.rsi.compute(candles);

        let signals = detect_signals(&SignalInputs {
            dif: &macd.dif,
            dea: &macd.dea,
            k: &kdj.k,
            d: &kdj.d,
            rsi: &rsi,
            overbought: self.config.rsi_overbought,
            oversold: self.config.rsi_oversold,
        });

        Some(IndicatorSnapshot {
            name: name.to_string(),
            date: last.date,
            close: round2(last.close),
            change_pct: change_pct(candles),
            ma,
            macd: MacdValues {
                dif: rounded(&macd.dif),
                dea: rounded(&macd.dea),
                histogram: rounded(&macd.histogram),
            },
            kdj: KdjValues {
                k: rounded(&kdj.k),
                d: rounded(&kdj.d),
                j: rounded(&kdj.j),
            },
            rsi6: rounded(&rsi),
            signals,
        })
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new(IndicatorConfig::default())
    }
}
