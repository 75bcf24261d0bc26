//! Whole-catalog runs and the report handed to output collaborators.

use chrono::NaiveDate;
use radar_core::data::ProviderChain;
use radar_core::domain::{CandleRecord, FetchStatus, IndicatorSnapshot};
use radar_core::indicators::{IndicatorEngine, NO_PATTERN};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::catalog::{CatalogError, TargetCatalog};
use crate::config::{ConfigError, RunConfig, RunWindows};
use crate::scheduler::{ConcurrentScheduler, GroupOutput};
use crate::status::{StatusAggregator, StatusSummary};

/// Errors that stop a run before any instrument is scheduled.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub windows: RunWindows,
    pub groups: Vec<GroupOutput>,
    pub summary: StatusSummary,
}

impl RunReport {
    pub fn statuses(&self) -> impl Iterator<Item = &FetchStatus> {
        self.groups.iter().flat_map(|g| g.statuses.iter())
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &IndicatorSnapshot> {
        self.groups.iter().flat_map(|g| g.snapshots.iter())
    }

    /// Every group's candles, tagged with the group name.
    pub fn candle_rows(&self) -> impl Iterator<Item = (&str, &CandleRecord)> {
        self.groups
            .iter()
            .flat_map(|g| g.candles.iter().map(move |c| (g.group.as_str(), c)))
    }

    /// Instruments with at least one real signal, and those signals.
    pub fn signal_summary(&self) -> Vec<(&str, Vec<&str>)> {
        self.snapshots()
            .filter_map(|s| {
                let fired: Vec<&str> = s
                    .signals
                    .iter()
                    .map(String::as_str)
                    .filter(|sig| *sig != NO_PATTERN)
                    .collect();
                (!fired.is_empty()).then_some((s.name.as_str(), fired))
            })
            .collect()
    }
}

/// Run every group of `catalog` in order, one scheduler batch per group.
///
/// Only config and catalog resolution can fail; fetch failures land in the
/// statuses.
pub fn run_catalog(
    catalog: &TargetCatalog,
    config: &RunConfig,
    chain: ProviderChain,
    today: NaiveDate,
) -> Result<RunReport, RunError> {
    config.validate()?;
    catalog.validate()?;
    let windows = config.windows(today);
    let scheduler = ConcurrentScheduler::new(
        Arc::new(chain),
        Arc::new(IndicatorEngine::new(config.indicators.clone())),
        config.max_workers,
        config.task_timeout,
    );

    let mut summary = StatusSummary::default();
    let mut groups = Vec::with_capacity(catalog.groups.len());
    for group in &catalog.groups {
        let instruments = TargetCatalog::instruments(group, windows.fetch);
        info!(group = %group.name, instruments = instruments.len(), "starting group");
        let output = scheduler.run_group(&group.name, &instruments, windows.report);

        let mut agg = StatusAggregator::new();
        agg.extend(output.statuses.iter().cloned());
        summary.merge(&agg.summary());
        groups.push(output);
    }

    info!(summary = %summary, "run finished");
    Ok(RunReport {
        windows,
        groups,
        summary,
    })
}
