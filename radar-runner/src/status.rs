//! Per-instrument status collection and run summary.

use radar_core::domain::{ErrorKind, FetchStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Collects exactly one `FetchStatus` per instrument.
///
/// Only the collecting thread writes to it. A second status for the same
/// name replaces the first so late results cannot double-count.
#[derive(Debug, Clone, Default)]
pub struct StatusAggregator {
    statuses: Vec<FetchStatus>,
}

impl StatusAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, status: FetchStatus) {
        match self.statuses.iter_mut().find(|s| s.name == status.name) {
            Some(existing) => *existing = status,
            None => self.statuses.push(status),
        }
    }

    pub fn extend(&mut self, statuses: impl IntoIterator<Item = FetchStatus>) {
        for status in statuses {
            self.record(status);
        }
    }

    pub fn statuses(&self) -> &[FetchStatus] {
        &self.statuses
    }

    pub fn summary(&self) -> StatusSummary {
        let mut summary = StatusSummary {
            total: self.statuses.len(),
            ..StatusSummary::default()
        };
        for status in &self.statuses {
            if status.success {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
                if let Some(kind) = status.error_kind {
                    *summary.by_kind.entry(kind).or_insert(0) += 1;
                }
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Failure counts per category.
    pub by_kind: BTreeMap<ErrorKind, usize>,
}

impl StatusSummary {
    pub fn merge(&mut self, other: &StatusSummary) {
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        for (kind, n) in &other.by_kind {
            *self.by_kind.entry(*kind).or_insert(0) += n;
        }
    }
}

impl fmt::Display for StatusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} instruments: {} succeeded, {} failed",
            self.total, self.succeeded, self.failed
        )?;
        if !self.by_kind.is_empty() {
            let kinds: Vec<String> = self
                .by_kind
                .iter()
                .map(|(kind, n)| format!("{kind}: {n}"))
                .collect();
            write!(f, " ({})", kinds.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_core::domain::ProviderId;

    #[test]
    fn counts_by_outcome_and_kind() {
        let mut agg = StatusAggregator::new();
        agg.record(FetchStatus::succeeded("A", ProviderId::Yahoo));
        agg.record(FetchStatus::failed("B", ErrorKind::Timeout, "task timeout after 15s"));
        agg.record(FetchStatus::failed("C", ErrorKind::EmptyResult, "empty"));
        agg.record(FetchStatus::failed("D", ErrorKind::Timeout, "task timeout after 15s"));

        let s = agg.summary();
        assert_eq!((s.total, s.succeeded, s.failed), (4, 1, 3));
        assert_eq!(s.by_kind[&ErrorKind::Timeout], 2);
        assert_eq!(
            s.to_string(),
            "4 instruments: 1 succeeded, 3 failed (empty result: 1, timeout: 2)"
        );
    }

    #[test]
    fn same_name_is_recorded_once() {
        let mut agg = StatusAggregator::new();
        agg.record(FetchStatus::failed("A", ErrorKind::Timeout, "late"));
        agg.record(FetchStatus::succeeded("A", ProviderId::Fmp));
        assert_eq!(agg.statuses().len(), 1);
        assert!(agg.statuses()[0].success);
    }

    #[test]
    fn merge_adds_groups() {
        let mut a = StatusSummary::default();
        let mut agg = StatusAggregator::new();
        agg.extend([
            FetchStatus::succeeded("A", ProviderId::Yahoo),
            FetchStatus::failed("B", ErrorKind::ParseError, "bad"),
        ]);
        a.merge(&agg.summary());
        a.merge(&agg.summary());
        assert_eq!((a.total, a.succeeded, a.failed), (4, 2, 2));
        assert_eq!(a.by_kind[&ErrorKind::ParseError], 2);
    }
}
