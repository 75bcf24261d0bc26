//! Scheduler behaviour under slow, panicking and failing tasks.

use chrono::NaiveDate;
use radar_core::data::{DataError, DataProvider, ProviderChain, RawTable, RetryPolicy, ScriptedProvider};
use radar_core::domain::{AssetType, DateWindow, ErrorKind, Instrument, ProviderId};
use radar_core::indicators::IndicatorEngine;
use radar_runner::{ConcurrentScheduler, StatusAggregator};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn fetch_window() -> DateWindow {
    DateWindow::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
    )
}

fn report_window() -> DateWindow {
    DateWindow::new(
        NaiveDate::from_ymd_opt(2024, 3, 18).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
    )
}

/// Forty consecutive days of closes ending 2024-03-30.
fn rows() -> RawTable {
    let start = NaiveDate::from_ymd_opt(2024, 2, 20).unwrap();
    let mut t = RawTable::new(["date", "close", "volume"]);
    for i in 0..40 {
        let date = start + chrono::Duration::days(i);
        t.push_row(vec![
            json!(date.format("%Y-%m-%d").to_string()),
            json!(100.0 + (i as f64 * 0.7).sin() * 5.0),
            json!(1000 + i * 10),
        ]);
    }
    t
}

/// Yahoo stand-in whose behaviour depends on the requested symbol.
fn scripted_yahoo() -> Arc<dyn DataProvider> {
    Arc::new(ScriptedProvider::new(ProviderId::Yahoo, |_, req| {
        match req.symbol.as_str() {
            "SLOW" => {
                std::thread::sleep(Duration::from_secs(3));
                Ok(rows())
            }
            "BOOM" => panic!("parser exploded"),
            "DOWN" => Err(DataError::ProviderUnavailable {
                provider: ProviderId::Yahoo,
                reason: "503".into(),
            }),
            _ => Ok(rows()),
        }
    }))
}

fn instrument(name: &str, symbol: &str) -> Instrument {
    Instrument::new(name, AssetType::StockUs, fetch_window()).with_symbol(ProviderId::Yahoo, symbol)
}

fn scheduler(workers: usize, timeout: Duration) -> ConcurrentScheduler {
    let chain = ProviderChain::new(vec![scripted_yahoo()], RetryPolicy::once());
    ConcurrentScheduler::new(Arc::new(chain), Arc::new(IndicatorEngine::default()), workers, timeout)
}

#[test]
fn slow_task_times_out_while_siblings_succeed() {
    let instruments = vec![
        instrument("Fast A", "A"),
        instrument("Slow", "SLOW"),
        instrument("Fast B", "B"),
    ];
    let started = Instant::now();
    let out = scheduler(4, Duration::from_millis(400)).run_group("G", &instruments, report_window());

    assert!(started.elapsed() < Duration::from_secs(3), "collector waited for the slow task");
    assert_eq!(out.statuses.len(), 3);

    let slow = &out.statuses[1];
    assert_eq!(slow.name, "Slow");
    assert!(!slow.success);
    assert_eq!(slow.error_kind, Some(ErrorKind::Timeout));
    assert!(slow.error.as_deref().unwrap().contains("timeout"));

    assert!(out.statuses[0].success);
    assert!(out.statuses[2].success);
    assert_eq!(out.snapshots.len(), 2);
}

#[test]
fn panicking_task_is_isolated() {
    let instruments = vec![instrument("Boom", "BOOM"), instrument("Fine", "OK")];
    let out = scheduler(2, Duration::from_secs(10)).run_group("G", &instruments, report_window());

    assert!(!out.statuses[0].success);
    assert!(out.statuses[0].error.as_deref().unwrap().contains("parser exploded"));
    assert!(out.statuses[1].success);
    assert_eq!(out.statuses[1].provider, Some(ProviderId::Yahoo));
}

#[test]
fn one_status_per_instrument_in_catalog_order() {
    let names = ["E", "D", "C", "B", "A", "Down", "Nobody"];
    let instruments: Vec<Instrument> = names
        .iter()
        .map(|&n| match n {
            "Down" => instrument(n, "DOWN"),
            // No Yahoo symbol at all.
            "Nobody" => Instrument::new(n, AssetType::StockUs, fetch_window()),
            _ => instrument(n, n),
        })
        .collect();

    // One worker forces queueing.
    let out = scheduler(1, Duration::from_secs(10)).run_group("G", &instruments, report_window());

    let got: Vec<&str> = out.statuses.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(got, names);
    let snaps: Vec<&str> = out.snapshots.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(snaps, vec!["E", "D", "C", "B", "A"]);

    let mut agg = StatusAggregator::new();
    agg.extend(out.statuses.iter().cloned());
    let summary = agg.summary();
    assert_eq!((summary.succeeded, summary.failed), (5, 2));
    assert_eq!(out.statuses[5].error_kind, Some(ErrorKind::ProviderUnavailable));
    assert!(out.statuses[6].error.as_deref().unwrap().contains("no eligible provider"));
}

#[test]
fn candles_are_report_window_only_and_sorted() {
    let instruments = vec![instrument("B", "B"), instrument("A", "A")];
    let out = scheduler(2, Duration::from_secs(10)).run_group("G", &instruments, report_window());

    let window = report_window();
    assert!(out.candles.iter().all(|r| window.contains(r.candle.date)));
    // 2024-03-18 ..= 2024-03-30 for each instrument.
    assert_eq!(out.candles.len(), 2 * 13);

    assert_eq!(out.candles[0].name, "A");
    assert_eq!(out.candles[1].name, "B");
    assert_eq!(out.candles[0].candle.date, NaiveDate::from_ymd_opt(2024, 3, 30).unwrap());
    for pair in out.candles.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.candle.date > b.candle.date || (a.candle.date == b.candle.date && a.name < b.name));
    }

    // Indicators saw the full history, not just the slice.
    let snap = &out.snapshots[0];
    assert!(snap.ma_value(20).is_some());
}

#[test]
fn empty_group_is_empty_output() {
    let out = scheduler(4, Duration::from_secs(1)).run_group("Empty", &[], report_window());
    assert!(out.statuses.is_empty());
    assert!(out.candles.is_empty());
    assert_eq!(out.group, "Empty");
}
