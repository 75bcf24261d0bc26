//! Data acquisition: providers, capability table, retry, fallback chain,
//! normalization and report-window slicing.

pub mod cancel;
pub mod capability;
pub mod chain;
pub mod eastmoney;
pub mod fetcher;
pub mod fmp;
pub mod normalize;
pub mod provider;
pub mod retry;
pub mod scripted;
pub mod sge;
pub mod sina;
pub mod synthetic;
pub mod window;
pub mod yahoo;

pub use cancel::CancelToken;
pub use capability::{Capability, RequestShaper};
pub use chain::{ChainOutcome, FetchDiagnostics, Jitter, ProviderAttempt, ProviderChain, SkipReason};
pub use eastmoney::EastmoneyProvider;
pub use fetcher::Fetcher;
pub use fmp::FmpProvider;
pub use normalize::{normalize, NormalizeReport, Normalizer, NormalizerConfig};
pub use provider::{DataError, DataProvider, Endpoint, ProviderRequest, RawTable};
pub use retry::{retry_fixed, RetryPolicy};
pub use scripted::ScriptedProvider;
pub use sge::SgeProvider;
pub use sina::SinaProvider;
pub use synthetic::SyntheticProvider;
pub use window::slice_window;
pub use yahoo::YahooProvider;

use crate::domain::ProviderId;
use std::sync::Arc;
use std::time::Duration;

/// Settings needed to construct the live providers.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub http_timeout: Duration,
    pub fmp_api_key: Option<String>,
}

/// Construct the provider for `id`. Each HTTP provider owns one client.
pub fn build_provider(
    id: ProviderId,
    settings: &ProviderSettings,
) -> Result<Arc<dyn DataProvider>, DataError> {
    Ok(match id {
        ProviderId::Eastmoney => Arc::new(EastmoneyProvider::new(settings.http_timeout)?),
        ProviderId::Sina => Arc::new(SinaProvider::new(settings.http_timeout)?),
        ProviderId::Sge => Arc::new(SgeProvider::new(settings.http_timeout)?),
        ProviderId::Yahoo => Arc::new(YahooProvider::new(settings.http_timeout)?),
        ProviderId::Fmp => Arc::new(FmpProvider::new(
            settings.fmp_api_key.clone(),
            settings.http_timeout,
        )?),
        ProviderId::Synthetic => Arc::new(SyntheticProvider::new()),
    })
}
