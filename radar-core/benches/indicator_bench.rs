//! Criterion benchmarks for the per-instrument hot paths.
//!
//! Benchmarks:
//! 1. Normalization of a raw provider table
//! 2. Single moving average over a close series
//! 3. Full indicator snapshot (MA set, MACD, KDJ, RSI, signals)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use radar_core::data::{normalize, RawTable};
use radar_core::domain::Candle;
use radar_core::indicators::{Indicator, IndicatorEngine, Sma};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_candles(n: usize) -> Vec<Candle> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            Candle {
                date: base_date + chrono::Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000_000.0 + (i % 7) as f64 * 50_000.0,
                amount: close * 1_000_000.0,
                volume_ratio: 1.0,
            }
        })
        .collect()
}

// ── 1. Normalization ─────────────────────────────────────────────────

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    for &rows in &[250, 500, 2500] {
        let table = RawTable::from_candles(&make_candles(rows));
        group.bench_with_input(BenchmarkId::new("canonical_table", rows), &rows, |b, _| {
            b.iter(|| normalize(black_box(&table)));
        });
    }

    group.finish();
}

// ── 2–3. Indicators ──────────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");
    let engine = IndicatorEngine::default();
    let sma = Sma::new(20);

    for &bar_count in &[250, 500, 2500] {
        let candles = make_candles(bar_count);

        group.bench_with_input(BenchmarkId::new("sma_20", bar_count), &bar_count, |b, _| {
            b.iter(|| sma.compute(black_box(&candles)));
        });

        group.bench_with_input(
            BenchmarkId::new("full_snapshot", bar_count),
            &bar_count,
            |b, _| {
                b.iter(|| engine.snapshot(black_box("BENCH"), black_box(&candles)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_normalize, bench_indicators);
criterion_main!(benches);
