//! Run configuration.
//!
//! One immutable `RunConfig` is built per run (from TOML or defaults),
//! validated once, and handed to the chain builder and the scheduler. Nothing
//! below this layer reads the environment.

use chrono::NaiveDate;
use radar_core::data::retry::duration_secs;
use radar_core::data::{
    build_provider, DataError, Jitter, NormalizerConfig, Normalizer, ProviderChain,
    ProviderSettings, RetryPolicy,
};
use radar_core::domain::{DateWindow, ProviderId};
use radar_core::indicators::IndicatorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Upper bound for `lookback_days` and `report_days` (about a century).
pub const MAX_HISTORY_DAYS: i64 = 36_500;

/// Upper bound for every configured pause and timeout.
pub const MAX_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Everything a run needs besides the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Calendar days of history fetched for indicator computation.
    pub lookback_days: i64,
    /// Calendar days of candles kept in the report.
    pub report_days: i64,
    /// Fixed "today" for reproducible runs; the caller's date otherwise.
    pub as_of: Option<NaiveDate>,
    /// Worker threads per group.
    pub max_workers: usize,
    /// Wall-clock budget per instrument, measured from task start.
    #[serde(with = "duration_secs")]
    pub task_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub http_timeout: Duration,
    /// Fallback order.
    pub providers: Vec<ProviderId>,
    pub retry: RetryPolicy,
    pub jitter: Jitter,
    pub normalizer: NormalizerConfig,
    pub indicators: IndicatorConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            lookback_days: 500,
            report_days: 20,
            as_of: None,
            max_workers: 4,
            task_timeout: Duration::from_secs(15),
            http_timeout: Duration::from_secs(15),
            providers: vec![
                ProviderId::Eastmoney,
                ProviderId::Sina,
                ProviderId::Sge,
                ProviderId::Yahoo,
                ProviderId::Fmp,
            ],
            retry: RetryPolicy::default(),
            jitter: Jitter::default(),
            normalizer: NormalizerConfig::default(),
            indicators: IndicatorConfig::default(),
        }
    }
}

/// Concrete date windows for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunWindows {
    pub as_of: NaiveDate,
    /// Full history used for indicators.
    pub fetch: DateWindow,
    /// Display slice.
    pub report: DateWindow,
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.report_days < 0 || self.lookback_days <= 0 {
            return invalid("lookback_days must be positive and report_days non-negative".into());
        }
        if self.lookback_days > MAX_HISTORY_DAYS {
            return invalid(format!(
                "lookback_days ({}) exceeds {MAX_HISTORY_DAYS}",
                self.lookback_days
            ));
        }
        if self.report_days > self.lookback_days {
            return invalid(format!(
                "report_days ({}) exceeds lookback_days ({})",
                self.report_days, self.lookback_days
            ));
        }
        if self.max_workers == 0 {
            return invalid("max_workers must be >= 1".into());
        }
        if self.task_timeout.is_zero() {
            return invalid("task_timeout must be positive".into());
        }
        for (field, value) in [
            ("task_timeout", self.task_timeout),
            ("http_timeout", self.http_timeout),
            ("retry.delay", self.retry.delay),
            ("jitter.max", self.jitter.max),
        ] {
            if value > MAX_WAIT {
                return invalid(format!(
                    "{field} ({}s) exceeds {}s",
                    value.as_secs_f64(),
                    MAX_WAIT.as_secs()
                ));
            }
        }
        if self.providers.is_empty() {
            return invalid("providers must list at least one provider".into());
        }
        for (i, p) in self.providers.iter().enumerate() {
            if self.providers[..i].contains(p) {
                return invalid(format!("provider '{p}' listed twice"));
            }
        }
        if self.jitter.min > self.jitter.max {
            return invalid("jitter.min exceeds jitter.max".into());
        }
        self.indicators.validate().map_err(ConfigError::Invalid)?;

        // Lookback is in calendar days, indicator windows in sessions.
        let needed = i64::try_from(self.indicators.longest_lookback()).unwrap_or(i64::MAX);
        if self.lookback_days < needed {
            return invalid(format!(
                "lookback_days ({}) cannot cover the longest indicator window ({needed} sessions)",
                self.lookback_days
            ));
        }
        if self.lookback_days < needed.saturating_mul(7) / 5 {
            warn!(
                lookback_days = self.lookback_days,
                sessions = needed,
                "lookback may not cover the longest indicator window once weekends and holidays are skipped"
            );
        }
        Ok(())
    }

    /// Resolve the fetch and report windows against `today` (or `as_of`).
    pub fn windows(&self, today: NaiveDate) -> RunWindows {
        let as_of = self.as_of.unwrap_or(today);
        RunWindows {
            as_of,
            fetch: DateWindow::trailing(as_of, self.lookback_days),
            report: DateWindow::trailing(as_of, self.report_days),
        }
    }

    /// Build the provider chain in configured order.
    pub fn build_chain(&self, fmp_api_key: Option<String>) -> Result<ProviderChain, DataError> {
        let settings = ProviderSettings {
            http_timeout: self.http_timeout,
            fmp_api_key,
        };
        let providers = self
            .providers
            .iter()
            .map(|&id| build_provider(id, &settings))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ProviderChain::new(providers, self.retry)
            .with_jitter(self.jitter)
            .with_normalizer(Normalizer::new(self.normalizer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.task_timeout, Duration::from_secs(15));
        // Domestic sources come before the overseas fallbacks.
        assert_eq!(config.providers[..3], [ProviderId::Eastmoney, ProviderId::Sina, ProviderId::Sge]);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = RunConfig::from_toml(
            r#"
            max_workers = 8
            providers = ["yahoo", "synthetic"]
            task_timeout = 2.5

            [retry]
            delay = 0

            [indicators]
            ma_windows = [5, 20]
            "#,
        )
        .unwrap();
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.providers, vec![ProviderId::Yahoo, ProviderId::Synthetic]);
        assert_eq!(config.task_timeout, Duration::from_millis(2500));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.delay, Duration::ZERO);
        assert_eq!(config.indicators.ma_windows, vec![5, 20]);
        assert_eq!(config.indicators.rsi_period, 6);
        assert_eq!(config.lookback_days, 500);
    }

    #[test]
    fn rejects_duplicate_provider() {
        let err = RunConfig::from_toml(r#"providers = ["yahoo", "yahoo"]"#).unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn rejects_unknown_provider() {
        let err = RunConfig::from_toml(r#"providers = ["bloomberg"]"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_short_lookback() {
        let config = RunConfig {
            lookback_days: 100,
            ..RunConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_negative_timeout() {
        assert!(RunConfig::from_toml("task_timeout = -1").is_err());
    }

    #[test]
    fn unrepresentable_timeout_is_parse_error() {
        let err = RunConfig::from_toml("task_timeout = 1e30").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{err}");
    }

    #[test]
    fn oversized_waits_rejected() {
        for toml in ["task_timeout = 1e12", "http_timeout = 100000", "[retry]\ndelay = 1e9"] {
            let err = RunConfig::from_toml(toml).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{toml}: {err}");
        }
    }

    #[test]
    fn oversized_history_rejected_before_windows() {
        let err = RunConfig::from_toml("lookback_days = 9000000000000000").unwrap_err();
        assert!(err.to_string().contains("lookback_days"), "{err}");

        let err = RunConfig::from_toml("lookback_days = 500\nreport_days = 9000000000000000")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn windows_resolve_from_as_of() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let pinned = NaiveDate::from_ymd_opt(2024, 3, 29).unwrap();

        let w = RunConfig::default().windows(today);
        assert_eq!(w.fetch.end, today);
        assert_eq!(w.report.start, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());

        let config = RunConfig {
            as_of: Some(pinned),
            ..RunConfig::default()
        };
        let w = config.windows(today);
        assert_eq!(w.as_of, pinned);
        assert_eq!(w.fetch.start, pinned - chrono::Duration::days(500));
    }

    #[test]
    fn chain_follows_configured_order() {
        let config = RunConfig {
            providers: vec![ProviderId::Synthetic, ProviderId::Fmp],
            ..RunConfig::default()
        };
        let chain = config.build_chain(None).unwrap();
        assert_eq!(chain.provider_ids(), vec![ProviderId::Synthetic, ProviderId::Fmp]);
    }
}
