//! Store-local time.
//!
//! The shop runs on Peru time (UTC-5, no daylight saving). WordPress stores
//! both a local and a GMT timestamp on posts, and reports group by the local
//! calendar day.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

/// Hours the store clock is behind UTC.
pub const STORE_UTC_OFFSET_HOURS: i64 = 5;

/// Convert a UTC timestamp to store-local wall time.
#[must_use]
pub fn to_store_local(utc: NaiveDateTime) -> NaiveDateTime {
    utc - Duration::hours(STORE_UTC_OFFSET_HOURS)
}

/// The store-local calendar day at `now`.
#[must_use]
pub fn store_today(now: DateTime<Utc>) -> NaiveDate {
    to_store_local(now.naive_utc()).date()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_store_day_lags_utc_until_five() {
        let early = DateTime::parse_from_rfc3339("2026-03-02T04:59:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(store_today(early), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());

        let later = DateTime::parse_from_rfc3339("2026-03-02T05:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(store_today(later), NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    }
}
