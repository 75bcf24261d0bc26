//! Pattern signals evaluated on the last two values of each oscillator.

pub const MACD_GOLDEN_CROSS: &str = "MACD golden cross";
pub const MACD_DEATH_CROSS: &str = "MACD death cross";
pub const KDJ_GOLDEN_CROSS: &str = "KDJ golden cross";
pub const RSI_OVERBOUGHT: &str = "RSI overbought";
pub const RSI_OVERSOLD: &str = "RSI oversold";
/// Emitted alone when no rule fired, so "nothing found" differs from "not evaluated".
pub const NO_PATTERN: &str = "no notable pattern";

/// Oscillator lines plus RSI thresholds.
#[derive(Debug, Clone, Copy)]
pub struct SignalInputs<'a> {
    pub dif: &'a [f64],
    pub dea: &'a [f64],
    pub k: &'a [f64],
    pub d: &'a [f64],
    pub rsi: &'a [f64],
    pub overbought: f64,
    pub oversold: f64,
}

fn last_two(values: &[f64]) -> Option<(f64, f64)> {
    match values {
        [.., prev, cur] if prev.is_finite() && cur.is_finite() => Some((*prev, *cur)),
        _ => None,
    }
}

/// `a` moved from at-or-below `b` to strictly above it.
fn crossed_above(a: &[f64], b: &[f64]) -> bool {
    match (last_two(a), last_two(b)) {
        (Some((pa, ca)), Some((pb, cb))) => pa <= pb && ca > cb,
        _ => false,
    }
}

/// Never empty. Rules are checked in a fixed order; undefined values never fire.
pub fn detect_signals(inputs: &SignalInputs<'_>) -> Vec<String> {
    let mut signals = Vec::new();

    if crossed_above(inputs.dif, inputs.dea) {
        signals.push(MACD_GOLDEN_CROSS);
    } else if crossed_above(inputs.dea, inputs.dif) {
        signals.push(MACD_DEATH_CROSS);
    }
    if crossed_above(inputs.k, inputs.d) {
        signals.push(KDJ_GOLDEN_CROSS);
    }
    if let Some(rsi) = inputs.rsi.last().copied().filter(|v| v.is_finite()) {
        if rsi > inputs.overbought {
            signals.push(RSI_OVERBOUGHT);
        } else if rsi < inputs.oversold {
            signals.push(RSI_OVERSOLD);
        }
    }

    if signals.is_empty() {
        signals.push(NO_PATTERN);
    }
    signals.into_iter().map(String::from).collect()
}
