//! Fixed-backoff retry shared by every provider call.

use super::cancel::CancelToken;
use super::provider::DataError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Attempt count and fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(with = "duration_secs")]
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Single attempt, no pause. Useful for tests and offline sources.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, runs out of
/// attempts, or `cancel` fires.
///
/// `op` receives the 1-based attempt number. The last error is returned on
/// exhaustion. A zero `max_attempts` is treated as one.
pub fn retry_fixed<T, F>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    label: &str,
    mut op: F,
) -> Result<T, DataError>
where
    F: FnMut(u32) -> Result<T, DataError>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        if cancel.is_cancelled() {
            return Err(DataError::Cancelled);
        }
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() || attempt >= attempts => return Err(e),
            Err(e) => {
                warn!(target: "radar::retry", %label, attempt, max = attempts, error = %e, "attempt failed, retrying");
                if !cancel.sleep(policy.delay) {
                    return Err(DataError::Cancelled);
                }
            }
        }
        attempt += 1;
    }
}

/// Serde adapter storing a `Duration` as fractional seconds.
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(|e| {
            serde::de::Error::custom(format!("invalid duration {secs}s: {e}"))
        })
    }
}
