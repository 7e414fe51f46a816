//! Automatic retries for transient SQLite contention.
//!
//! Under concurrent access (4+ agents), WAL-mode SQLite produces transient
//! errors such as SQLITE_BUSY, SQLITE_LOCKED, and IOERR_SHORT_READ (522).
//! The busy_timeout pragma absorbs SQLITE_BUSY at the connection level; the
//! rest need application-level retries with backoff.
//!
//! Classification is by substring match against the driver's error message,
//! a pragmatic necessity of opaque storage drivers. The pattern list lives
//! in [`RetryConfig`] so it can be extended without code changes.

use clockmail_core::{RetryConfig, StorageError};
use rand::Rng;
use std::time::Duration;
use tracing::warn;

/// Whether an error is transient contention that a retry can resolve.
pub fn is_transient(config: &RetryConfig, err: &StorageError) -> bool {
    let msg = err.driver_message();
    if msg.is_empty() {
        return false;
    }
    config.transient_patterns.iter().any(|p| msg.contains(p))
}

/// Execute `op` with exponential backoff plus jitter on transient errors.
///
/// Returns immediately on success or on a non-transient error; after the
/// configured retries are exhausted the last error surfaces unchanged.
pub fn with_retry<T, F>(config: &RetryConfig, mut op: F) -> Result<T, StorageError>
where
    F: FnMut() -> Result<T, StorageError>,
{
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_transient(config, &err) || attempt >= config.max_retries {
                    return Err(err);
                }
                let delay = backoff_delay(config, attempt);
                warn!(attempt, ?delay, error = %err, "transient contention, retrying");
                std::thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}

/// Delay for a retry attempt: `base * 2^attempt` capped at `max_delay`,
/// plus uniform jitter in `[0, base)`.
fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exp = config
        .base_delay
        .checked_mul(1u32 << attempt.min(16))
        .unwrap_or(config.max_delay);
    let capped = exp.min(config.max_delay);
    let jitter_ns = rand::thread_rng().gen_range(0..config.base_delay.as_nanos().max(1)) as u64;
    capped + Duration::from_nanos(jitter_ns)
}
