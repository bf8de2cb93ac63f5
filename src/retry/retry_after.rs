//! `Retry-After` header parsing.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};

/// Parse a `Retry-After` value: delta-seconds first, then an HTTP-date
/// relative to `now`. Dates in the past yield zero; garbage yields `None`.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<i64>() {
        return Some(Duration::from_secs(u64::try_from(seconds).unwrap_or(0)));
    }
    let date = parse_http_date(value)?;
    Some(
        (date.with_timezone(&Utc) - now)
            .to_std()
            .unwrap_or(Duration::ZERO),
    )
}

fn parse_http_date(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(value).ok().or_else(|| {
        // Servers sometimes send a weekday that does not match the date.
        let (_, rest) = value.split_once(',')?;
        DateTime::parse_from_rfc2822(rest.trim()).ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(1999, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn delta_seconds() {
        assert_eq!(parse_retry_after("120", now()), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after(" 7 ", now()), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after("-3", now()), Some(Duration::ZERO));
    }

    #[test]
    fn http_dates() {
        assert_eq!(
            parse_retry_after("Fri, 01 Jan 1999 12:00:10 GMT", now()),
            Some(Duration::from_secs(10))
        );
        assert_eq!(
            parse_retry_after("Sun, 21 Oct 1990 07:28:00 GMT", now()),
            Some(Duration::ZERO)
        );
        // 21 Oct 1990 was a Sunday
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 1990 07:28:00 GMT", now()),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn garbage_is_ignored() {
        assert_eq!(parse_retry_after("foo", now()), None);
        assert_eq!(parse_retry_after("", now()), None);
        assert_eq!(parse_retry_after("1.5", now()), None);
    }
}
