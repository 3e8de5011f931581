//! `Retry-After` header interpretation

use chrono::{DateTime, Utc};

/// Seconds to wait according to a `Retry-After` value
///
/// All-digit values are delay-seconds. Anything else is read as an
/// HTTP-date (`Wed, 21 Oct 2015 07:28:00 GMT`) and turned into the time
/// remaining from `now`, floored at zero. Returns `None` when the value is
/// neither.
///
/// # Example
///
/// ```rust
/// use chrono::Utc;
/// use fhirlink::core::bulk::retry_after_seconds;
///
/// assert_eq!(retry_after_seconds("5", Utc::now()), Some(5));
/// assert_eq!(retry_after_seconds("soon", Utc::now()), None);
/// ```
pub fn retry_after_seconds(value: &str, now: DateTime<Utc>) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.bytes().all(|b| b.is_ascii_digit()) {
        return Some(value.parse().unwrap_or(u64::MAX));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?;
    let remaining = (at.with_timezone(&Utc) - now).num_seconds();
    Some(u64::try_from(remaining).unwrap_or(0))
}
