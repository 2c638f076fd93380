//! Rate limit header parsing.
//!
//! Feedly reports the end of a rate-limit window in the `Retry-After`
//! header as a Unix timestamp (seconds), not as a delay.

use chrono::{DateTime, Local, Utc};
use http::HeaderMap;

/// Format used when the reset time is shown to humans.
pub const RESET_TIME_FORMAT: &str = "%H:%M:%S %d %b %Y";

/// Parses the `Retry-After` header as a Unix timestamp.
///
/// Returns `None` when the header is absent, not valid text, not an
/// integer, or out of range.
///
/// # Examples
///
/// ```
/// use feedly_client::rate_limit::parse_reset_time;
/// use http::HeaderMap;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("retry-after", "1700000000".parse().unwrap());
/// let reset = parse_reset_time(&headers).unwrap();
/// assert_eq!(reset.timestamp(), 1_700_000_000);
///
/// headers.insert("retry-after", "soon".parse().unwrap());
/// assert!(parse_reset_time(&headers).is_none());
/// ```
pub fn parse_reset_time(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let header = headers.get(http::header::RETRY_AFTER)?.to_str().ok()?;
    let seconds = header.trim().parse::<i64>().ok()?;
    DateTime::from_timestamp(seconds, 0)
}

/// Formats a reset time in the local timezone.
pub fn format_reset_time(reset_at: DateTime<Utc>) -> String {
    reset_at
        .with_timezone(&Local)
        .format(RESET_TIME_FORMAT)
        .to_string()
}
