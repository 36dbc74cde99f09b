use std::time::Duration;

/// Renew this long before the credential expires.
pub const REFRESH_MARGIN_MS: i64 = 30_000;

/// Never check more often than this, however short-lived the credential.
pub const MIN_CHECK_INTERVAL_MS: i64 = 60_000;

/// Wait after a failed check or refresh.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(30);

/// Delay until the next check, given the milliseconds the credential has left.
pub fn next_check_delay(remaining_ms: i64) -> Duration {
    let delay_ms = (remaining_ms - REFRESH_MARGIN_MS).max(MIN_CHECK_INTERVAL_MS);
    Duration::from_millis(delay_ms as u64)
}
