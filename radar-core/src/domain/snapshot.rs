use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MacdValues {
    pub dif: Option<f64>,
    pub dea: Option<f64>,
    pub histogram: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KdjValues {
    pub k: Option<f64>,
    pub d: Option<f64>,
    pub j: Option<f64>,
}

/// Latest indicator values and pattern signals for one instrument.
///
/// `None` means the indicator had too little history to be defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub name: String,
    pub date: NaiveDate,
    pub close: f64,
    pub change_pct: f64,
    /// Keyed by window length.
    pub ma: BTreeMap<usize, Option<f64>>,
    pub macd: MacdValues,
    pub kdj: KdjValues,
    pub rsi6: Option<f64>,
    /// Never empty; holds a placeholder when nothing fired.
    pub signals: Vec<String>,
}

impl IndicatorSnapshot {
    pub fn ma_value(&self, window: usize) -> Option<f64> {
        self.ma.get(&window).copied().flatten()
    }
}
