//! Value resolution.
//!
//! Turns constraint text into a concrete calendar value for one unit and one
//! (year, month) context. Attempts run in a fixed order:
//!
//! ```text
//! "14"                 -> literal, range checked against the unit
//! "monday" / "March"   -> name lookup (Week, Month only)
//! "Last", "Last-2"     -> unit maximum for the context, offset, clamped
//! "First", "First+1"   -> unit minimum, offset, clamped
//! day-only forms       -> 3rdFriday, 2ndLastMonday, LastWeekday,
//!                         FirstWeekday, ClosestWeekdayTo 15, 21st
//! ```
//!
//! Day forms need a real month; everything else ignores the context. An
//! nth-weekday that does not exist in the month (a fifth Friday in February)
//! resolves to [`Resolution::NoMatch`]: valid, but matching no day.

use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use super::cache::{CacheKey, NoCache, ResolverCache};
use crate::TimeUnit;
use crate::calendar::{self, days_in_month, weekday_number};
use crate::syntax::vocab;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    Value(i32),
    /// Well-formed, but no such value exists in this month.
    NoMatch,
    Invalid,
}

impl Resolution {
    pub fn value(self) -> Option<i32> {
        match self {
            Resolution::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_valid(self) -> bool {
        self != Resolution::Invalid
    }
}

/// Cached front end to [`resolve`].
#[derive(Debug, Clone)]
pub struct Resolver {
    cache: Arc<dyn ResolverCache>,
}

impl Resolver {
    pub fn new(cache: Arc<dyn ResolverCache>) -> Self {
        Resolver { cache }
    }

    pub fn uncached() -> Self {
        Resolver { cache: Arc::new(NoCache) }
    }

    pub fn cache(&self) -> &Arc<dyn ResolverCache> {
        &self.cache
    }

    pub fn resolve(&self, unit: TimeUnit, year: i32, month: u32, text: &str) -> Resolution {
        let key = CacheKey::new(unit, year, month, text);
        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }
        let value = resolve(unit, year, month, text);
        self.cache.insert(key, value);
        value
    }
}

/// Uncached resolution. A zero `month` means "no context" and only matters
/// for day forms, which then resolve as invalid.
pub fn resolve(unit: TimeUnit, year: i32, month: u32, text: &str) -> Resolution {
    let text = text.trim();
    let lower = text.to_ascii_lowercase();
    if unit == TimeUnit::TimeZone || text.is_empty() {
        return Resolution::Invalid;
    }

    if text.chars().all(|c| c.is_ascii_digit()) {
        return match text.parse::<i32>() {
            Ok(n) if (calendar::min_value(unit)..=calendar::absolute_max(unit)).contains(&n) => Resolution::Value(n),
            _ => Resolution::Invalid,
        };
    }

    match unit {
        TimeUnit::Week => {
            if let Some(day) = vocab::weekday(text) {
                return Resolution::Value(weekday_number(day));
            }
        }
        TimeUnit::Month => {
            if let Some(m) = vocab::month(text) {
                return Resolution::Value(m as i32);
            }
        }
        _ => {}
    }

    if let Some(resolution) = edge(unit, year, month, &lower) {
        return resolution;
    }

    if unit == TimeUnit::Day {
        return resolve_day(year, month, &lower);
    }
    Resolution::Invalid
}

/// `Last`/`First` family with an optional `+N`/`-N` offset.
fn edge(unit: TimeUnit, year: i32, month: u32, lower: &str) -> Option<Resolution> {
    let caps = regex!(r"^(last|first)(day(?:of(?:the)?month)?)?\s*(?:([+-])\s*(\d{1,6}))?$").captures(lower)?;
    if caps.get(2).is_some() && unit != TimeUnit::Day {
        return Some(Resolution::Invalid);
    }
    if unit == TimeUnit::Day && month == 0 {
        return Some(Resolution::Invalid);
    }
    let (min, max) = (calendar::min_value(unit), calendar::max_value(unit, year, month));
    let base = if &caps[1] == "last" { max } else { min };
    let offset: i32 = caps.get(4).and_then(|n| n.as_str().parse().ok()).unwrap_or(0);
    let shifted = match caps.get(3).map(|s| s.as_str()) {
        Some("-") => base - offset,
        Some(_) => base + offset,
        None => base,
    };
    Some(Resolution::Value(shifted.clamp(min, max)))
}

fn resolve_day(year: i32, month: u32, lower: &str) -> Resolution {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Resolution::Invalid;
    };
    let last_day = days_in_month(year, month);
    let last = first + Duration::days(i64::from(last_day) - 1);

    if let Some(nth) = vocab::nth_weekday(lower) {
        return nth_weekday(first, last, nth);
    }
    match lower {
        "firstweekday" => return Resolution::Value(off_weekend(first, true).day() as i32),
        "lastweekday" => return Resolution::Value(off_weekend(last, false).day() as i32),
        _ => {}
    }
    if let Some(caps) = regex!(r"^(?:closest|nearest)weekdayto\s*(\d{1,2})$").captures(lower) {
        return match caps[1].parse::<u32>() {
            Ok(n) if (1..=31).contains(&n) => Resolution::Value(closest_weekday(year, month, n.min(last_day))),
            _ => Resolution::Invalid,
        };
    }
    if let Some(day) = vocab::ordinal_day(lower) {
        return Resolution::Value(day as i32);
    }
    Resolution::Invalid
}

fn nth_weekday(first: NaiveDate, last: NaiveDate, nth: vocab::NthWeekday) -> Resolution {
    let steps = i64::from(nth.nth) - 1;
    let gap = |from: Weekday, to: Weekday| {
        (i64::from(to.num_days_from_monday()) - i64::from(from.num_days_from_monday())).rem_euclid(7)
    };
    let found = if nth.from_end {
        last - Duration::days(gap(nth.weekday, last.weekday()) + 7 * steps)
    } else {
        first + Duration::days(gap(first.weekday(), nth.weekday) + 7 * steps)
    };
    if found.month() == first.month() && found.year() == first.year() {
        Resolution::Value(found.day() as i32)
    } else {
        Resolution::NoMatch
    }
}

/// Move a weekend date to the nearest weekday inside the month: forward from
/// the first of the month, backward from the last.
fn off_weekend(date: NaiveDate, forward: bool) -> NaiveDate {
    let shift = match (date.weekday(), forward) {
        (Weekday::Sat, true) => 2,
        (Weekday::Sun, true) => 1,
        (Weekday::Sat, false) => -1,
        (Weekday::Sun, false) => -2,
        _ => 0,
    };
    date + Duration::days(shift)
}

/// Nearest weekday to day `n`, never leaving the month: Saturday moves back
/// to Friday (or forward to Monday on the 1st), Sunday moves forward to
/// Monday (or back to Friday on the last day).
fn closest_weekday(year: i32, month: u32, n: u32) -> i32 {
    let last_day = days_in_month(year, month);
    let Some(date) = NaiveDate::from_ymd_opt(year, month, n) else {
        return n as i32;
    };
    let day = match date.weekday() {
        Weekday::Sat if n == 1 => n + 2,
        Weekday::Sat => n - 1,
        Weekday::Sun if n == last_day => n - 2,
        Weekday::Sun => n + 1,
        _ => n,
    };
    day as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cache::{CacheConfig, SweepingCache};

    fn day(year: i32, month: u32, text: &str) -> Resolution {
        resolve(TimeUnit::Day, year, month, text)
    }

    #[test]
    fn literals_are_range_checked() {
        assert_eq!(resolve(TimeUnit::Hour, 0, 0, "23"), Resolution::Value(23));
        assert_eq!(resolve(TimeUnit::Hour, 0, 0, "24"), Resolution::Invalid);
        assert_eq!(resolve(TimeUnit::Month, 0, 0, "0"), Resolution::Invalid);
        assert_eq!(resolve(TimeUnit::Week, 0, 0, "07"), Resolution::Value(7));
    }

    #[test]
    fn names_resolve_only_for_their_unit() {
        assert_eq!(resolve(TimeUnit::Week, 0, 0, "Monday"), Resolution::Value(2));
        assert_eq!(resolve(TimeUnit::Week, 0, 0, "sun"), Resolution::Value(1));
        assert_eq!(resolve(TimeUnit::Month, 0, 0, "Sept"), Resolution::Value(9));
        assert_eq!(resolve(TimeUnit::Day, 2024, 1, "monday"), Resolution::Invalid);
    }

    #[test]
    fn last_and_first_clamp_offsets() {
        assert_eq!(day(2024, 2, "Last"), Resolution::Value(29));
        assert_eq!(day(2023, 2, "LastDayOfTheMonth"), Resolution::Value(28));
        assert_eq!(day(2024, 4, "Last-3"), Resolution::Value(27));
        assert_eq!(day(2024, 4, "Last+3"), Resolution::Value(30));
        assert_eq!(resolve(TimeUnit::Minute, 0, 0, "First+5"), Resolution::Value(5));
        assert_eq!(resolve(TimeUnit::Month, 0, 0, "Last - 20"), Resolution::Value(1));
        assert_eq!(resolve(TimeUnit::Hour, 0, 0, "LastDay"), Resolution::Invalid);
    }

    #[test]
    fn nth_weekday_of_month() {
        // March 2024 starts on a Friday.
        assert_eq!(day(2024, 3, "1stFriday"), Resolution::Value(1));
        assert_eq!(day(2024, 3, "3rdFriday"), Resolution::Value(15));
        assert_eq!(day(2024, 3, "5thFriday"), Resolution::Value(29));
        assert_eq!(day(2024, 3, "LastSunday"), Resolution::Value(31));
        assert_eq!(day(2024, 3, "2ndLastSunday"), Resolution::Value(24));
        // February 2024 has four Fridays.
        assert_eq!(day(2024, 2, "5thFriday"), Resolution::NoMatch);
    }

    #[test]
    fn weekday_shifts_stay_in_month() {
        // June 2024: the 1st is a Saturday, the 30th a Sunday.
        assert_eq!(day(2024, 6, "FirstWeekday"), Resolution::Value(3));
        assert_eq!(day(2024, 6, "LastWeekday"), Resolution::Value(28));
        assert_eq!(day(2024, 6, "ClosestWeekdayTo 1"), Resolution::Value(3));
        assert_eq!(day(2024, 6, "ClosestWeekdayTo 30"), Resolution::Value(28));
        assert_eq!(day(2024, 6, "ClosestWeekdayTo 15"), Resolution::Value(14));
        assert_eq!(day(2024, 6, "ClosestWeekdayTo 16"), Resolution::Value(17));
        assert_eq!(day(2024, 6, "ClosestWeekdayTo 12"), Resolution::Value(12));
        assert_eq!(day(2024, 2, "ClosestWeekdayTo 31"), Resolution::Value(29));
    }

    #[test]
    fn day_forms_need_a_month() {
        assert_eq!(day(0, 0, "Last"), Resolution::Invalid);
        assert_eq!(day(0, 0, "3rdFriday"), Resolution::Invalid);
        assert_eq!(day(0, 0, "15"), Resolution::Value(15));
    }

    #[test]
    fn cached_resolution_is_stable() {
        let resolver = Resolver::new(SweepingCache::new(CacheConfig::default()));
        let first = resolver.resolve(TimeUnit::Day, 2024, 2, "Last");
        let second = resolver.resolve(TimeUnit::Day, 2024, 2, "Last");
        assert_eq!(first, second);
        assert_eq!(resolver.cache().len(), 1);
        assert_eq!(Resolver::uncached().resolve(TimeUnit::Day, 2024, 2, "Last"), first);
    }
}
