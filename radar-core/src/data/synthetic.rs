//! Deterministic offline provider.
//!
//! Generates a random-walk daily series seeded by the BLAKE3 hash of the
//! symbol, so the same symbol always yields the same history. Weekends are
//! skipped. Meant for development runs without network access.

use super::provider::{DataError, DataProvider, ProviderRequest, RawTable};
use crate::domain::ProviderId;
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticProvider;

impl SyntheticProvider {
    pub fn new() -> Self {
        Self
    }
}

/// Random-walk table for `symbol` covering weekdays in `[start, end]`.
pub fn generate_synthetic_table(symbol: &str, start: NaiveDate, end: NaiveDate) -> RawTable {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut table = RawTable::new(["date", "open", "high", "low", "close", "volume"]);
    let mut price = 100.0_f64;
    let mut current = start;

    while current <= end {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        table.push_row(vec![
            Value::from(current.format("%Y-%m-%d").to_string()),
            Value::from(open),
            Value::from(high),
            Value::from(low),
            Value::from(close),
            Value::from(volume),
        ]);

        price = close;
        current += chrono::Duration::days(1);
    }

    table
}

impl DataProvider for SyntheticProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Synthetic
    }

    fn fetch(&self, request: &ProviderRequest) -> Result<RawTable, DataError> {
        Ok(generate_synthetic_table(
            &request.symbol,
            request.window.start,
            request.window.end,
        ))
    }
}
