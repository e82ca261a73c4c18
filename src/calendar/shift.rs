use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use super::days_in_month;
use crate::TimeUnit;

/// Shift `dt` by `amount` units. Month and year shifts clamp the day to the
/// target month's length.
pub fn shift_by_unit(dt: NaiveDateTime, amount: i64, unit: TimeUnit) -> NaiveDateTime {
    let shifted = match unit {
        TimeUnit::Second => dt.checked_add_signed(Duration::seconds(amount)),
        TimeUnit::Minute => dt.checked_add_signed(Duration::minutes(amount)),
        TimeUnit::Hour => dt.checked_add_signed(Duration::hours(amount)),
        TimeUnit::Day => dt.checked_add_signed(Duration::days(amount)),
        TimeUnit::Week => dt.checked_add_signed(Duration::weeks(amount)),
        TimeUnit::Month => add_months(dt, amount),
        TimeUnit::Year => add_months(dt, amount.saturating_mul(12)),
        TimeUnit::TimeZone => Some(dt),
    };
    shifted.unwrap_or(NaiveDateTime::MAX)
}

fn add_months(dt: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let zero_based = i64::from(dt.year()) * 12 + i64::from(dt.month0()) + months;
    let year = i32::try_from(zero_based.div_euclid(12)).ok()?;
    let month = zero_based.rem_euclid(12) as u32 + 1;
    let day = dt.day().min(days_in_month(year, month));
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(NaiveDateTime::new(date, dt.time()))
}

/// Linear count of whole `unit`s since a fixed epoch.
///
/// Two instants fall in the same unit exactly when their indexes are equal,
/// so `@every` cadence is a plain modulo over these values. Weeks are
/// Sunday-based.
pub fn linear_index(unit: TimeUnit, dt: NaiveDateTime) -> i64 {
    let seconds = dt.and_utc().timestamp();
    let days = i64::from(dt.date().num_days_from_ce());
    match unit {
        TimeUnit::Second | TimeUnit::TimeZone => seconds,
        TimeUnit::Minute => seconds.div_euclid(60),
        TimeUnit::Hour => seconds.div_euclid(3_600),
        TimeUnit::Day => days,
        // 0001-01-01 is day 1 and a Monday, so every Sunday is a multiple of 7.
        TimeUnit::Week => days.div_euclid(7),
        TimeUnit::Month => i64::from(dt.year()) * 12 + i64::from(dt.month0()),
        TimeUnit::Year => i64::from(dt.year()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(8, 0, 0).unwrap()
    }

    #[test]
    fn shift_by_month_clamps_day() {
        assert_eq!(shift_by_unit(at(2024, 1, 31), 1, TimeUnit::Month), at(2024, 2, 29));
        assert_eq!(shift_by_unit(at(2023, 11, 15), 3, TimeUnit::Month), at(2024, 2, 15));
        assert_eq!(shift_by_unit(at(2024, 2, 29), 1, TimeUnit::Year), at(2025, 2, 28));
    }

    #[test]
    fn week_index_rolls_over_on_sunday() {
        // 2024-01-06 is a Saturday, 2024-01-07 a Sunday.
        let saturday = linear_index(TimeUnit::Week, at(2024, 1, 6));
        let sunday = linear_index(TimeUnit::Week, at(2024, 1, 7));
        let next_saturday = linear_index(TimeUnit::Week, at(2024, 1, 13));
        assert_eq!(sunday, saturday + 1);
        assert_eq!(next_saturday, sunday);
    }

    #[test]
    fn month_index_counts_across_years() {
        let dec = linear_index(TimeUnit::Month, at(2023, 12, 1));
        let jan = linear_index(TimeUnit::Month, at(2024, 1, 1));
        assert_eq!(jan - dec, 1);
    }
}
