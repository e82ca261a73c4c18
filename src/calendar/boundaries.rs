use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use super::shift::shift_by_unit;
use crate::TimeUnit;

/// Truncate `dt` to the start of its `unit`. Weeks start on Sunday.
pub fn start_of(unit: TimeUnit, dt: NaiveDateTime) -> NaiveDateTime {
    let midnight = NaiveTime::MIN;
    match unit {
        TimeUnit::Second | TimeUnit::TimeZone => {
            let time = dt.time().with_nanosecond(0).unwrap_or_else(|| dt.time());
            NaiveDateTime::new(dt.date(), time)
        }
        TimeUnit::Minute => {
            let time = NaiveTime::from_hms_opt(dt.hour(), dt.minute(), 0).unwrap_or_else(|| dt.time());
            NaiveDateTime::new(dt.date(), time)
        }
        TimeUnit::Hour => {
            let time = NaiveTime::from_hms_opt(dt.hour(), 0, 0).unwrap_or_else(|| dt.time());
            NaiveDateTime::new(dt.date(), time)
        }
        TimeUnit::Day => NaiveDateTime::new(dt.date(), midnight),
        TimeUnit::Week => {
            let offset = dt.date().weekday().num_days_from_sunday() as i64;
            NaiveDateTime::new(dt.date() - Duration::days(offset), midnight)
        }
        TimeUnit::Month => NaiveDateTime::new(
            NaiveDate::from_ymd_opt(dt.year(), dt.month(), 1).unwrap_or_else(|| dt.date()),
            midnight,
        ),
        TimeUnit::Year => {
            NaiveDateTime::new(NaiveDate::from_ymd_opt(dt.year(), 1, 1).unwrap_or_else(|| dt.date()), midnight)
        }
    }
}

/// Start of the `amount`-th `unit` after the one containing `dt`.
///
/// With `amount >= 1` the result is always strictly after `dt`, which is what
/// keeps the search loop moving forward.
pub fn land(dt: NaiveDateTime, amount: i64, unit: TimeUnit) -> NaiveDateTime {
    shift_by_unit(start_of(unit, dt), amount, unit)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    #[test]
    fn start_of_week_aligns_to_sunday() {
        // 2024-04-10 is a Wednesday.
        let start = start_of(TimeUnit::Week, at(2024, 4, 10, 15, 45, 12));
        assert_eq!(start, at(2024, 4, 7, 0, 0, 0));
    }

    #[test]
    fn start_of_month_drops_day_and_time() {
        assert_eq!(start_of(TimeUnit::Month, at(2024, 5, 22, 9, 30, 0)), at(2024, 5, 1, 0, 0, 0));
    }

    #[test]
    fn land_moves_to_start_of_later_unit() {
        assert_eq!(land(at(2024, 1, 1, 11, 20, 15), 3, TimeUnit::Hour), at(2024, 1, 1, 14, 0, 0));
        assert_eq!(land(at(2024, 1, 31, 11, 0, 0), 1, TimeUnit::Month), at(2024, 2, 1, 0, 0, 0));
        assert_eq!(land(at(2024, 12, 31, 23, 59, 59), 1, TimeUnit::Second), at(2025, 1, 1, 0, 0, 0));
    }
}
