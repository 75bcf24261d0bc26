//! In-memory provider driven by a closure, for tests and dry runs.

use super::provider::{DataError, DataProvider, ProviderRequest, RawTable};
use crate::domain::ProviderId;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

type Respond = dyn Fn(u32, &ProviderRequest) -> Result<RawTable, DataError> + Send + Sync;

/// Provider whose every response comes from a closure.
///
/// The closure receives the 1-based call number. An optional delay blocks
/// each call first, which is how slow upstreams are simulated.
pub struct ScriptedProvider {
    id: ProviderId,
    delay: Duration,
    calls: AtomicU32,
    respond: Box<Respond>,
}

impl ScriptedProvider {
    pub fn new<F>(id: ProviderId, respond: F) -> Self
    where
        F: Fn(u32, &ProviderRequest) -> Result<RawTable, DataError> + Send + Sync + 'static,
    {
        Self {
            id,
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
            respond: Box::new(respond),
        }
    }

    /// Always returns a clone of `table`.
    pub fn table(id: ProviderId, table: RawTable) -> Self {
        Self::new(id, move |_, _| Ok(table.clone()))
    }

    /// Always fails with the error built by `make`.
    pub fn failing<F>(id: ProviderId, make: F) -> Self
    where
        F: Fn(ProviderId) -> DataError + Send + Sync + 'static,
    {
        Self::new(id, move |_, _| Err(make(id)))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of `fetch` calls so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DataProvider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn fetch(&self, request: &ProviderRequest) -> Result<RawTable, DataError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        (self.respond)(call, request)
    }
}
