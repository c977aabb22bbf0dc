//! Throttling retry helpers.
//!
//! Only 429 is retried. The wait comes from the server; there is no local
//! backoff curve and no attempt limit.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Parse a `Retry-After` header given in seconds.
///
/// Fractional values are accepted. Missing, negative, non-numeric or
/// unrepresentably large values yield `None`.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let secs: f64 = value.trim().parse().ok()?;
    if secs < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}
