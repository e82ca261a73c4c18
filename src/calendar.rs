//! Calendar arithmetic shared by the resolver, the matcher and the search.
//!
//! Everything here works on naive, zone-local date-times: time zones are
//! applied by the search engine at its two boundary crossings only.
//!
//! - `boundaries.rs`: start-of-unit truncation and "start of the n-th next
//!   unit" landings used by advance hints.
//! - `shift.rs`: calendar-aware shifting and linear unit indexes used by
//!   `@every` cadence.

#[path = "calendar/boundaries.rs"]
mod boundaries;
#[path = "calendar/shift.rs"]
mod shift;

pub use boundaries::{land, start_of};
pub use shift::linear_index;

use crate::TimeUnit;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};

/// Number of days in `month` of `year`.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month >= 12 { (year + 1, 1) } else { (year, month + 1) };
    match (NaiveDate::from_ymd_opt(year, month, 1), NaiveDate::from_ymd_opt(next_year, next_month, 1)) {
        (Some(first), Some(first_next)) => first_next.signed_duration_since(first).num_days() as u32,
        _ => 31,
    }
}

/// Sunday-based weekday number: Sunday = 1 ... Saturday = 7.
pub fn weekday_number(weekday: Weekday) -> i32 {
    weekday.number_from_sunday() as i32
}

/// Value of `unit` at `dt`. `Week` yields the Sunday-based weekday number.
pub fn part(unit: TimeUnit, dt: NaiveDateTime) -> i32 {
    match unit {
        TimeUnit::Second => dt.second() as i32,
        TimeUnit::Minute => dt.minute() as i32,
        TimeUnit::Hour => dt.hour() as i32,
        TimeUnit::Day => dt.day() as i32,
        TimeUnit::Week => weekday_number(dt.weekday()),
        TimeUnit::Month => dt.month() as i32,
        TimeUnit::Year => dt.year(),
        TimeUnit::TimeZone => 0,
    }
}

/// Smallest valid value of `unit`.
pub fn min_value(unit: TimeUnit) -> i32 {
    match unit {
        TimeUnit::Second | TimeUnit::Minute | TimeUnit::Hour | TimeUnit::TimeZone => 0,
        TimeUnit::Day | TimeUnit::Week | TimeUnit::Month | TimeUnit::Year => 1,
    }
}

/// Largest valid value of `unit` in the given year/month.
///
/// Only `Day` depends on the context; a zero month means "no context" and
/// yields the absolute maximum.
pub fn max_value(unit: TimeUnit, year: i32, month: u32) -> i32 {
    match unit {
        TimeUnit::Day if month != 0 => days_in_month(year, month) as i32,
        _ => absolute_max(unit),
    }
}

/// Largest value `unit` can take in any context.
pub fn absolute_max(unit: TimeUnit) -> i32 {
    match unit {
        TimeUnit::Second | TimeUnit::Minute => 59,
        TimeUnit::Hour => 23,
        TimeUnit::Day => 31,
        TimeUnit::Week => 7,
        TimeUnit::Month => 12,
        TimeUnit::Year => 9999,
        TimeUnit::TimeZone => 0,
    }
}

/// A date-time split into its calendar fields.
///
/// Field order makes the derived ordering the chronological one, which lets
/// range checks compare partially overridden tuples without building a
/// (possibly invalid) `NaiveDateTime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Parts {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
}

impl Parts {
    pub fn of(dt: NaiveDateTime) -> Self {
        Parts {
            year: dt.year(),
            month: dt.month() as i32,
            day: dt.day() as i32,
            hour: dt.hour() as i32,
            minute: dt.minute() as i32,
            second: dt.second() as i32,
        }
    }

    pub fn set(&mut self, unit: TimeUnit, value: i32) {
        match unit {
            TimeUnit::Year => self.year = value,
            TimeUnit::Month => self.month = value,
            TimeUnit::Day => self.day = value,
            TimeUnit::Hour => self.hour = value,
            TimeUnit::Minute => self.minute = value,
            TimeUnit::Second => self.second = value,
            TimeUnit::Week | TimeUnit::TimeZone => {}
        }
    }

    /// Build the date-time, or `None` when the fields do not form one.
    pub fn to_datetime(self) -> Option<NaiveDateTime> {
        let month = u32::try_from(self.month).ok()?;
        let day = u32::try_from(self.day).ok()?;
        NaiveDate::from_ymd_opt(self.year, month, day)?.and_hms_opt(
            u32::try_from(self.hour).ok()?,
            u32::try_from(self.minute).ok()?,
            u32::try_from(self.second).ok()?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_in_month_handles_leap_february() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(days_in_month(2024, 4), 30);
    }

    #[test]
    fn week_part_is_sunday_based() {
        // 2024-01-07 is a Sunday.
        let sunday = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let saturday = NaiveDate::from_ymd_opt(2024, 1, 13).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(part(TimeUnit::Week, sunday), 1);
        assert_eq!(part(TimeUnit::Week, saturday), 7);
    }

    #[test]
    fn day_max_depends_on_context_only_for_days() {
        assert_eq!(max_value(TimeUnit::Day, 2023, 2), 28);
        assert_eq!(max_value(TimeUnit::Day, 0, 0), 31);
        assert_eq!(max_value(TimeUnit::Hour, 2023, 2), 23);
    }

    #[test]
    fn parts_order_chronologically_and_reject_invalid_dates() {
        let dt = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap().and_hms_opt(8, 30, 0).unwrap();
        let mut later = Parts::of(dt);
        later.set(TimeUnit::Hour, 9);
        assert!(Parts::of(dt) < later);

        let mut invalid = Parts::of(dt);
        invalid.set(TimeUnit::Day, 30);
        assert_eq!(invalid.to_datetime(), None);
    }
}
