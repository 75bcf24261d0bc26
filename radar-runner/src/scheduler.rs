//! Concurrent per-instrument scheduling.
//!
//! Each group runs on a private `rayon::ThreadPool` (not the global pool).
//! One task per instrument runs the provider chain, the indicator engine and
//! the report slice, all blocking. Workers report `Started`/`Finished` over an
//! `mpsc` channel; the calling thread is the only one that writes results.
//!
//! The timeout clock starts when a worker picks the task up, so queueing
//! behind a full pool does not count against it. On expiry the task's
//! `CancelToken` is set and its eventual result is ignored.

use radar_core::data::{slice_window, CancelToken, DataError, ProviderChain};
use radar_core::domain::{
    Candle, CandleRecord, DateWindow, ErrorKind, FetchStatus, IndicatorSnapshot, Instrument,
};
use radar_core::indicators::IndicatorEngine;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::status::StatusAggregator;

/// Everything one group produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupOutput {
    pub group: String,
    /// Report-window candles, date descending then name ascending.
    pub candles: Vec<CandleRecord>,
    /// One per successfully fetched instrument, catalog order.
    pub snapshots: Vec<IndicatorSnapshot>,
    /// Exactly one per submitted instrument, catalog order.
    pub statuses: Vec<FetchStatus>,
}

/// Result of one task.
#[derive(Debug)]
struct TaskOutput {
    candles: Vec<Candle>,
    snapshot: Option<IndicatorSnapshot>,
    status: FetchStatus,
}

impl TaskOutput {
    fn failed(status: FetchStatus) -> Self {
        Self {
            candles: Vec::new(),
            snapshot: None,
            status,
        }
    }
}

enum TaskEvent {
    Started(usize),
    Finished(usize, TaskOutput),
}

pub struct ConcurrentScheduler {
    chain: Arc<ProviderChain>,
    engine: Arc<IndicatorEngine>,
    max_workers: usize,
    task_timeout: Duration,
}

impl ConcurrentScheduler {
    pub fn new(
        chain: Arc<ProviderChain>,
        engine: Arc<IndicatorEngine>,
        max_workers: usize,
        task_timeout: Duration,
    ) -> Self {
        Self {
            chain,
            engine,
            max_workers: max_workers.max(1),
            task_timeout,
        }
    }

    /// Run every instrument of one group. Never fails: each instrument gets
    /// exactly one status whatever happens to its task.
    pub fn run_group(&self, group: &str, instruments: &[Instrument], report: DateWindow) -> GroupOutput {
        let started_at = Instant::now();
        let n = instruments.len();
        let mut slots: Vec<Option<TaskOutput>> = (0..n).map(|_| None).collect();

        if n > 0 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.max_workers.min(n))
                .thread_name(|i| format!("radar-worker-{i}"))
                .build()
            {
                Ok(pool) => self.collect(&pool, instruments, report, &mut slots),
                Err(e) => {
                    warn!(group, error = %e, "failed to build worker pool");
                    for (slot, instrument) in slots.iter_mut().zip(instruments) {
                        *slot = Some(TaskOutput::failed(FetchStatus::failed(
                            &instrument.name,
                            ErrorKind::ProviderUnavailable,
                            format!("worker pool unavailable: {e}"),
                        )));
                    }
                }
            }
        }

        let output = assemble(group, instruments, slots);
        let mut agg = StatusAggregator::new();
        agg.extend(output.statuses.iter().cloned());
        info!(
            group,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            summary = %agg.summary(),
            "group finished"
        );
        output
    }

    fn collect(
        &self,
        pool: &rayon::ThreadPool,
        instruments: &[Instrument],
        report: DateWindow,
        slots: &mut [Option<TaskOutput>],
    ) {
        let n = instruments.len();
        let (tx, rx) = mpsc::channel::<TaskEvent>();
        let tokens: Vec<CancelToken> = (0..n).map(|_| CancelToken::new()).collect();

        for (idx, instrument) in instruments.iter().enumerate() {
            let tx = tx.clone();
            let chain = Arc::clone(&self.chain);
            let engine = Arc::clone(&self.engine);
            let cancel = tokens[idx].clone();
            let instrument = instrument.clone();
            pool.spawn(move || {
                if tx.send(TaskEvent::Started(idx)).is_err() {
                    return;
                }
                let output = catch_unwind(AssertUnwindSafe(|| {
                    run_task(&chain, &engine, &instrument, report, &cancel)
                }))
                .unwrap_or_else(|payload| {
                    let msg = panic_message(payload.as_ref());
                    warn!(instrument = %instrument.name, panic = %msg, "task panicked");
                    TaskOutput::failed(FetchStatus::failed(
                        &instrument.name,
                        ErrorKind::ProviderUnavailable,
                        format!("task panicked: {msg}"),
                    ))
                });
                let _ = tx.send(TaskEvent::Finished(idx, output));
            });
        }
        drop(tx);

        let mut deadlines: Vec<Option<Instant>> = vec![None; n];
        let mut remaining = n;

        while remaining > 0 {
            let now = Instant::now();
            for idx in 0..n {
                match deadlines[idx] {
                    Some(deadline) if slots[idx].is_none() && now >= deadline => {
                        let name = &instruments[idx].name;
                        let err = DataError::timeout(self.task_timeout);
                        warn!(instrument = %name, error = %err, "task abandoned");
                        tokens[idx].cancel();
                        slots[idx] = Some(TaskOutput::failed(FetchStatus::failed(
                            name,
                            err.kind(),
                            err.to_string(),
                        )));
                        remaining -= 1;
                    }
                    _ => {}
                }
            }
            if remaining == 0 {
                break;
            }

            // Wait until the nearest running task's deadline; with nothing
            // running yet, wait for the next event.
            let next_deadline = deadlines
                .iter()
                .zip(slots.iter())
                .filter(|(_, slot)| slot.is_none())
                .filter_map(|(deadline, _)| *deadline)
                .min();
            let event = match next_deadline {
                Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(now)),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match event {
                Ok(TaskEvent::Started(idx)) => {
                    debug!(instrument = %instruments[idx].name, "task started");
                    deadlines[idx] = Some(Instant::now() + self.task_timeout);
                }
                Ok(TaskEvent::Finished(idx, output)) => {
                    if slots[idx].is_none() {
                        slots[idx] = Some(output);
                        remaining -= 1;
                    } else {
                        debug!(instrument = %instruments[idx].name, "late result discarded");
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    for (slot, instrument) in slots.iter_mut().zip(instruments) {
                        if slot.is_none() {
                            *slot = Some(TaskOutput::failed(FetchStatus::failed(
                                &instrument.name,
                                ErrorKind::ProviderUnavailable,
                                "worker exited without a result",
                            )));
                        }
                    }
                    break;
                }
            }
        }
    }
}

/// One instrument: chain, indicators on the full history, report slice.
fn run_task(
    chain: &ProviderChain,
    engine: &IndicatorEngine,
    instrument: &Instrument,
    report: DateWindow,
    cancel: &CancelToken,
) -> TaskOutput {
    let outcome = chain.fetch(instrument, cancel);
    let Some(provider) = outcome.provider else {
        let err = outcome.last_error.unwrap_or_else(|| DataError::NoEligibleProvider {
            instrument: instrument.name.clone(),
        });
        warn!(
            instrument = %instrument.name,
            chain = %outcome.diagnostics.summary(),
            "all providers exhausted"
        );
        return TaskOutput::failed(FetchStatus::failed(&instrument.name, err.kind(), err.to_string()));
    };

    let snapshot = engine.snapshot(&instrument.name, &outcome.series);
    let candles = slice_window(&outcome.series, report);
    if candles.is_empty() {
        debug!(instrument = %instrument.name, "no candles inside the report window");
    }
    TaskOutput {
        candles,
        snapshot,
        status: FetchStatus::succeeded(&instrument.name, provider),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Flatten slots into catalog-ordered output.
fn assemble(group: &str, instruments: &[Instrument], slots: Vec<Option<TaskOutput>>) -> GroupOutput {
    let mut output = GroupOutput {
        group: group.to_string(),
        ..GroupOutput::default()
    };
    for (instrument, slot) in instruments.iter().zip(slots) {
        let task = slot.unwrap_or_else(|| {
            TaskOutput::failed(FetchStatus::failed(
                &instrument.name,
                ErrorKind::ProviderUnavailable,
                "task never ran",
            ))
        });
        output.statuses.push(task.status);
        output.snapshots.extend(task.snapshot);
        output.candles.extend(
            task.candles
                .into_iter()
                .map(|c| CandleRecord::new(&instrument.name, c)),
        );
    }
    output.candles.sort_by(|a, b| {
        b.candle
            .date
            .cmp(&a.candle.date)
            .then_with(|| a.name.cmp(&b.name))
    });
    output
}
