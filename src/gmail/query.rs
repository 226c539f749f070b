//! Day-boundary search-query construction
//!
//! `gmail_count_today` needs a wall-clock midnight-to-midnight window in
//! the requested timezone, not a fixed 24h-from-now window. The window is
//! computed as: local calendar date of "now" in the zone, that date at
//! 00:00:00 resolved to an absolute instant, plus exactly 24 hours.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Absolute start and end instants of "today" in the given timezone
pub fn day_bounds(now: DateTime<Utc>, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_date = now.with_timezone(&tz).date_naive();
    let midnight = local_date.and_time(NaiveTime::MIN);

    // Earliest resolution on DST ambiguity; if local midnight does not
    // exist (spring-forward at 00:00), treat the naive timestamp as UTC.
    let start = tz
        .from_local_datetime(&midnight)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| DateTime::from_naive_utc_and_offset(midnight, Utc));

    (start, start + Duration::hours(24))
}

/// Gmail `after:`/`before:` query for "today" in the given timezone
///
/// Both bounds are formatted as `YYYY/MM/DD` in UTC, matching how the
/// service interprets date-only search operators.
pub fn day_query(tz: Tz, now: DateTime<Utc>) -> String {
    let (start, end) = day_bounds(now, tz);
    format!("after:{} before:{}", ymd(start), ymd(end))
}

fn ymd(instant: DateTime<Utc>) -> String {
    instant.format("%Y/%m/%d").to_string()
}
