//! Ordered provider fallback for one instrument.
//!
//! Per instrument: `PENDING → TRYING[i] → SUCCESS | TRYING[i+1] | EXHAUSTED`.
//! Single pass, no chain-level retry. The chain never returns `Err`; the
//! outcome carries the last error instead.

use super::cancel::CancelToken;
use super::capability;
use super::fetcher::Fetcher;
use super::normalize::{NormalizeReport, Normalizer};
use super::provider::{DataError, DataProvider};
use super::retry::{duration_secs, RetryPolicy};
use crate::domain::{AssetType, Instrument, ProviderId, Series};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Randomized pause before an instrument's first request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Jitter {
    #[serde(with = "duration_secs")]
    pub min: Duration,
    #[serde(with = "duration_secs")]
    pub max: Duration,
}

impl Default for Jitter {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(3),
        }
    }
}

impl Jitter {
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Uniform draw from `[min, max]`; `min` when the range is empty.
    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let secs = rand::thread_rng().gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs).clamp(self.min, self.max)
    }
}

/// Why a provider was not tried for an instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The catalog has no symbol for this provider.
    NoSymbol,
    /// No capability entry for the instrument's asset type.
    AssetTypeNotCovered(AssetType),
    /// Provider reports itself unusable this run (e.g. missing API key).
    Unavailable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoSymbol => f.write_str("no symbol"),
            SkipReason::AssetTypeNotCovered(a) => write!(f, "{a} not covered"),
            SkipReason::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// Record of a single provider attempt during a fetch.
#[derive(Debug, Clone)]
pub struct ProviderAttempt {
    pub provider: ProviderId,
    pub skipped: Option<SkipReason>,
    pub error: Option<String>,
    pub success: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FetchDiagnostics {
    pub attempts: Vec<ProviderAttempt>,
}

impl FetchDiagnostics {
    pub fn record_skip(&mut self, provider: ProviderId, reason: SkipReason) {
        self.attempts.push(ProviderAttempt {
            provider,
            skipped: Some(reason),
            error: None,
            success: false,
        });
    }

    pub fn record_error(&mut self, provider: ProviderId, error: String) {
        self.attempts.push(ProviderAttempt {
            provider,
            skipped: None,
            error: Some(error),
            success: false,
        });
    }

    pub fn record_success(&mut self, provider: ProviderId) {
        self.attempts.push(ProviderAttempt {
            provider,
            skipped: None,
            error: None,
            success: true,
        });
    }

    /// e.g. `eastmoney: SKIPPED (no symbol) -> yahoo: ERROR (...) -> fmp: SUCCESS`
    pub fn summary(&self) -> String {
        self.attempts
            .iter()
            .map(|a| {
                if a.success {
                    format!("{}: SUCCESS", a.provider)
                } else if let Some(skip) = &a.skipped {
                    format!("{}: SKIPPED ({skip})", a.provider)
                } else if let Some(err) = &a.error {
                    format!("{}: ERROR ({err})", a.provider)
                } else {
                    format!("{}: UNKNOWN", a.provider)
                }
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Providers that were actually called.
    pub fn tried(&self) -> usize {
        self.attempts.iter().filter(|a| a.skipped.is_none()).count()
    }
}

/// Result of running the chain for one instrument.
#[derive(Debug)]
pub struct ChainOutcome {
    /// Normalized series from the winning provider; empty on exhaustion.
    pub series: Series,
    pub provider: Option<ProviderId>,
    pub last_error: Option<DataError>,
    pub report: Option<NormalizeReport>,
    pub diagnostics: FetchDiagnostics,
}

impl ChainOutcome {
    pub fn is_success(&self) -> bool {
        self.provider.is_some()
    }

    fn failed(error: DataError, diagnostics: FetchDiagnostics) -> Self {
        Self {
            series: Vec::new(),
            provider: None,
            last_error: Some(error),
            report: None,
            diagnostics,
        }
    }
}

/// Providers in fallback order plus the shared retry/jitter settings.
pub struct ProviderChain {
    providers: Vec<Arc<dyn DataProvider>>,
    retry: RetryPolicy,
    jitter: Jitter,
    normalizer: Normalizer,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn DataProvider>>, retry: RetryPolicy) -> Self {
        Self {
            providers,
            retry,
            jitter: Jitter::none(),
            normalizer: Normalizer::default(),
        }
    }

    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    pub fn fetch(&self, instrument: &Instrument, cancel: &CancelToken) -> ChainOutcome {
        let mut diagnostics = FetchDiagnostics::default();

        if !cancel.sleep(self.jitter.sample()) {
            return ChainOutcome::failed(DataError::Cancelled, diagnostics);
        }

        let mut last_error = None;
        for provider in &self.providers {
            if cancel.is_cancelled() {
                return ChainOutcome::failed(DataError::Cancelled, diagnostics);
            }
            let id = provider.id();

            let Some(symbol) = instrument.symbol_for(id) else {
                diagnostics.record_skip(id, SkipReason::NoSymbol);
                continue;
            };
            if !provider.is_available() {
                diagnostics.record_skip(id, SkipReason::Unavailable);
                continue;
            }
            let Some(request) =
                capability::shape_request(id, instrument.asset_type, symbol, instrument.window)
            else {
                diagnostics.record_skip(id, SkipReason::AssetTypeNotCovered(instrument.asset_type));
                continue;
            };

            debug!(instrument = %instrument.name, provider = %id, symbol = %request.symbol, "trying provider");
            let result = Fetcher::new(provider.as_ref(), self.retry)
                .fetch(&request, cancel)
                .and_then(|table| self.normalizer.normalize(&table))
                .and_then(|(series, report)| {
                    if series.is_empty() {
                        Err(DataError::EmptyResult { provider: id })
                    } else {
                        Ok((series, report))
                    }
                });

            match result {
                Ok((series, report)) => {
                    diagnostics.record_success(id);
                    debug!(instrument = %instrument.name, provider = %id, rows = series.len(), "provider succeeded");
                    return ChainOutcome {
                        series,
                        provider: Some(id),
                        last_error: None,
                        report: Some(report),
                        diagnostics,
                    };
                }
                Err(DataError::Cancelled) => {
                    diagnostics.record_error(id, DataError::Cancelled.to_string());
                    return ChainOutcome::failed(DataError::Cancelled, diagnostics);
                }
                Err(e) => {
                    warn!(instrument = %instrument.name, provider = %id, error = %e, "provider failed, falling back");
                    diagnostics.record_error(id, e.to_string());
                    last_error = Some(e);
                }
            }
        }

        let error = last_error.unwrap_or_else(|| DataError::NoEligibleProvider {
            instrument: instrument.name.clone(),
        });
        ChainOutcome::failed(error, diagnostics)
    }
}
