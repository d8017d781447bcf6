//! Calendar arithmetic for credential validity windows (UTC days).

use chrono::{DateTime, Duration, Months, NaiveTime, Utc};

use transitgate_core::{DomainError, DomainResult};

/// Midnight at the start of `t`'s day.
pub fn start_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Last millisecond of `t`'s day.
pub fn end_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(t) + Duration::days(1) - Duration::milliseconds(1)
}

pub fn same_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.date_naive() == b.date_naive()
}

/// `start + months` calendar months, minus one millisecond.
pub fn months_after(start: DateTime<Utc>, months: u32) -> DomainResult<DateTime<Utc>> {
    start
        .checked_add_months(Months::new(months))
        .map(|t| t - Duration::milliseconds(1))
        .ok_or_else(|| DomainError::validation("validity window out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn day_bounds() {
        let t = at(2026, 3, 14, 15, 30);
        assert_eq!(start_of_day(t), at(2026, 3, 14, 0, 0));
        assert_eq!(
            end_of_day(t),
            at(2026, 3, 15, 0, 0) - Duration::milliseconds(1)
        );
    }

    #[test]
    fn month_windows_follow_the_calendar() {
        let start = at(2026, 1, 31, 0, 0);
        // Jan 31 + 1 month clamps to Feb 28.
        assert_eq!(
            months_after(start, 1).unwrap(),
            at(2026, 2, 28, 0, 0) - Duration::milliseconds(1)
        );
        assert_eq!(
            months_after(at(2026, 5, 1, 0, 0), 12).unwrap(),
            at(2027, 5, 1, 0, 0) - Duration::milliseconds(1)
        );
    }
}
