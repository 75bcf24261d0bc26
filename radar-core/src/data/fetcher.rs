//! One provider attempt: a single shaped request under the retry policy.

use super::cancel::CancelToken;
use super::provider::{DataError, DataProvider, ProviderRequest, RawTable};
use super::retry::{retry_fixed, RetryPolicy};
use tracing::debug;

pub struct Fetcher<'a> {
    provider: &'a dyn DataProvider,
    policy: RetryPolicy,
}

impl<'a> Fetcher<'a> {
    pub fn new(provider: &'a dyn DataProvider, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    /// Fetch with retry. An error-free empty payload is returned as
    /// `EmptyResult` at once, without spending further attempts.
    pub fn fetch(
        &self,
        request: &ProviderRequest,
        cancel: &CancelToken,
    ) -> Result<RawTable, DataError> {
        let provider = self.provider.id();
        let label = format!("{provider}:{}", request.symbol);
        retry_fixed(&self.policy, cancel, &label, |attempt| {
            debug!(%provider, symbol = %request.symbol, attempt, "fetching");
            let table = self.provider.fetch(request)?;
            if table.is_empty() {
                return Err(DataError::EmptyResult { provider });
            }
            Ok(table)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::Endpoint;
    use crate::domain::{DateWindow, ProviderId};
    use chrono::NaiveDate;
    use serde_json::Value;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct Counting {
        calls: AtomicU32,
        empty: bool,
    }

    impl DataProvider for Counting {
        fn id(&self) -> ProviderId {
            ProviderId::Synthetic
        }

        fn fetch(&self, _request: &ProviderRequest) -> Result<RawTable, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut t = RawTable::new(["date", "close"]);
            if !self.empty {
                t.push_row(vec![Value::from("2024-01-02"), Value::from(1.0)]);
            }
            Ok(t)
        }
    }

    fn request() -> ProviderRequest {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        ProviderRequest {
            symbol: "X".into(),
            endpoint: Endpoint::Synthetic,
            window: DateWindow::new(d, d),
            start: "2024-01-02".into(),
            end: "2024-01-02".into(),
        }
    }

    #[test]
    fn empty_payload_is_not_retried() {
        let provider = Counting {
            calls: AtomicU32::new(0),
            empty: true,
        };
        let fetcher = Fetcher::new(&provider, RetryPolicy::new(5, Duration::ZERO));
        let err = fetcher.fetch(&request(), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, DataError::EmptyResult { .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn non_empty_payload_is_returned() {
        let provider = Counting {
            calls: AtomicU32::new(0),
            empty: false,
        };
        let fetcher = Fetcher::new(&provider, RetryPolicy::once());
        let table = fetcher.fetch(&request(), &CancelToken::new()).unwrap();
        assert_eq!(table.len(), 1);
    }
}
