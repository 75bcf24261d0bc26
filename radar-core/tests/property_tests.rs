//! Property tests for normalization and indicator invariants.
//!
//! Uses proptest to verify:
//! 1. Normalizer idempotence: re-normalizing a canonical series changes nothing
//! 2. Canonical order: output is strictly ascending by date, every field finite
//! 3. MA warm-up shape: same length as input, first `w - 1` undefined
//! 4. No lookahead: a value at index t only depends on candles up to t
//! 5. Volume ratio is always finite

use chrono::NaiveDate;
use proptest::prelude::*;
use radar_core::data::normalize::volume_ratios;
use radar_core::data::{normalize, RawTable};
use radar_core::domain::is_canonical_order;
use radar_core::indicators::{rsi_of_series, sma_of_series, IndicatorConfig, IndicatorEngine};
use serde_json::{json, Value};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..1000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_volume() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        1 => Just(None),
        1 => Just(Some(0.0)),
        6 => (0.0..1e9_f64).prop_map(|v| Some(v.round())),
    ]
}

/// Unsorted provider rows with possible duplicate dates and gaps.
fn arb_raw_table() -> impl Strategy<Value = RawTable> {
    prop::collection::vec((0i64..90, arb_price(), arb_volume()), 1..80).prop_map(|rows| {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut table = RawTable::new(["date", "close", "volume"]);
        for (offset, close, volume) in rows {
            let date = base + chrono::Duration::days(offset);
            table.push_row(vec![
                json!(date.format("%Y-%m-%d").to_string()),
                json!(close),
                volume.map(Value::from).unwrap_or(Value::Null),
            ]);
        }
        table
    })
}

fn arb_closes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_price(), 1..120)
}

// ── 1. Normalizer Idempotence ────────────────────────────────────────

proptest! {
    #[test]
    fn normalize_is_idempotent(table in arb_raw_table()) {
        let once = normalize(&table).unwrap();
        let twice = normalize(&RawTable::from_candles(&once)).unwrap();
        prop_assert_eq!(once, twice);
    }
}

// ── 2. Canonical Order ───────────────────────────────────────────────

proptest! {
    #[test]
    fn normalized_series_is_canonical(table in arb_raw_table()) {
        let series = normalize(&table).unwrap();
        prop_assert!(!series.is_empty());
        prop_assert!(is_canonical_order(&series));
        prop_assert!(series.iter().all(|c| c.is_finite()));
    }
}

// ── 3. MA Warm-up Shape ──────────────────────────────────────────────

proptest! {
    #[test]
    fn sma_has_warmup_then_values(closes in arb_closes(), window in 1usize..40) {
        let ma = sma_of_series(&closes, window);
        prop_assert_eq!(ma.len(), closes.len());
        for (i, v) in ma.iter().enumerate() {
            if i + 1 < window {
                prop_assert!(v.is_nan(), "index {} should be undefined", i);
            } else {
                prop_assert!(v.is_finite(), "index {} should be defined", i);
            }
        }
    }

    #[test]
    fn snapshot_ma_undefined_when_history_short(closes in arb_closes()) {
        let engine = IndicatorEngine::new(IndicatorConfig {
            ma_windows: vec![5, 60],
            ..IndicatorConfig::default()
        });
        let candles = normalize(&closes_table(&closes)).unwrap();
        let snap = engine.snapshot("P", &candles).unwrap();
        prop_assert_eq!(snap.ma_value(5).is_some(), candles.len() >= 5);
        prop_assert_eq!(snap.ma_value(60).is_some(), candles.len() >= 60);
    }
}

fn closes_table(closes: &[f64]) -> RawTable {
    let base = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let mut table = RawTable::new(["date", "close"]);
    for (i, c) in closes.iter().enumerate() {
        let date = base + chrono::Duration::days(i as i64);
        table.push_row(vec![json!(date.format("%Y-%m-%d").to_string()), json!(c)]);
    }
    table
}

// ── 4. No Lookahead ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn indicators_ignore_future_values(closes in arb_closes(), cut in 0usize..120) {
        let cut = cut.min(closes.len() - 1);
        let prefix = &closes[..=cut];

        let full_ma = sma_of_series(&closes, 5);
        let prefix_ma = sma_of_series(prefix, 5);
        let full_rsi = rsi_of_series(&closes, 6);
        let prefix_rsi = rsi_of_series(prefix, 6);

        for t in 0..=cut {
            prop_assert!(same(full_ma[t], prefix_ma[t]), "MA diverges at {}", t);
            prop_assert!(same(full_rsi[t], prefix_rsi[t]), "RSI diverges at {}", t);
        }
    }
}

fn same(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b
}

// ── 5. Volume Ratio Finite ───────────────────────────────────────────

proptest! {
    #[test]
    fn volume_ratio_is_finite(volumes in prop::collection::vec(arb_volume(), 0..60)) {
        let ratios = volume_ratios(&volumes, 5);
        prop_assert_eq!(ratios.len(), volumes.len());
        prop_assert!(ratios.iter().all(|r| r.is_finite() && *r >= 0.0));
    }
}
