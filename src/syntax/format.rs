//! Canonical rendering of parsed values, in a shape the value parser reads back.

use super::vocab::{self, MONTH_NAMES};
use crate::rule::BetweenRule;
use crate::{TimeUnit, UnitSet};

/// `@at` for clock units, `@on` for days and weeks, `@in` otherwise.
pub(crate) fn keyword_for(pairs: &[(TimeUnit, &str)]) -> &'static str {
    let units: UnitSet = pairs.iter().map(|(unit, _)| *unit).collect();
    if units.intersects(UnitSet::HOUR | UnitSet::MINUTE | UnitSet::SECOND) {
        "@at"
    } else if units.intersects(UnitSet::DAY | UnitSet::WEEK) {
        "@on"
    } else {
        "@in"
    }
}

/// Render one value run: a clock time, a dashed date, an ordinal day with a
/// time, or a single `unit value` pair.
pub(crate) fn values(pairs: &[(TimeUnit, &str)]) -> String {
    if let [(unit, value)] = pairs {
        return single(*unit, value);
    }
    let get = |unit: TimeUnit| pairs.iter().find(|(u, _)| *u == unit).map(|(_, v)| *v);
    let units: UnitSet = pairs.iter().map(|(unit, _)| *unit).collect();
    let clock_units = UnitSet::HOUR | UnitSet::MINUTE | UnitSet::SECOND;
    let (year, month, day) = (get(TimeUnit::Year), get(TimeUnit::Month), get(TimeUnit::Day));

    let rendered = if units.intersects(clock_units) {
        clock(get(TimeUnit::Hour), get(TimeUnit::Minute), get(TimeUnit::Second)).and_then(|time| {
            if (units - clock_units).is_empty() {
                Some(time)
            } else if units.has(TimeUnit::Week) {
                None
            } else if month.is_some() {
                dashed_date(year, month, day).map(|date| format!("{date} {time}"))
            } else {
                day_phrase(year, month, day).map(|date| format!("{date} {time}"))
            }
        })
    } else if units.has(TimeUnit::Week) {
        None
    } else {
        dashed_date(year, month, day)
    };

    rendered.unwrap_or_else(|| {
        let parts: Vec<String> = pairs.iter().map(|(unit, value)| single(*unit, value)).collect();
        parts.join(" ")
    })
}

/// `[a, b]`, hoisting the unit in front of the bracket when every record is
/// a single value of the same unit.
pub(crate) fn list(records: &[Vec<(TimeUnit, &str)>]) -> String {
    let shared_unit = match records.first().map(Vec::as_slice) {
        Some([(unit, _)]) if records.iter().all(|r| matches!(r.as_slice(), [(u, _)] if u == unit)) => Some(*unit),
        _ => None,
    };
    match shared_unit {
        Some(unit) => {
            let items: Vec<&str> = records.iter().filter_map(|r| r.first().map(|(_, v)| *v)).collect();
            format!("{unit} [{}]", items.join(", "))
        }
        None => {
            let items: Vec<String> = records.iter().map(|r| values(r)).collect();
            format!("[{}]", items.join(", "))
        }
    }
}

pub(crate) fn range(rule: &BetweenRule) -> String {
    format!("{} and {}", values(&rule.side(false)), values(&rule.side(true)))
}

fn single(unit: TimeUnit, value: &str) -> String {
    match unit {
        TimeUnit::Week if vocab::weekday(value).is_some() => value.to_string(),
        TimeUnit::Month if vocab::month(value).is_some() => value.to_string(),
        _ => format!("{unit} {value}"),
    }
}

fn number(value: &str) -> Option<u32> {
    if value.chars().all(|c| c.is_ascii_digit()) { value.parse().ok() } else { None }
}

fn clock(hour: Option<&str>, minute: Option<&str>, second: Option<&str>) -> Option<String> {
    let (hour, minute) = (number(hour?)?, number(minute?)?);
    match second {
        Some(second) => Some(format!("{hour:02}:{minute:02}:{:02}", number(second)?)),
        None => Some(format!("{hour:02}:{minute:02}")),
    }
}

fn dashed_date(year: Option<&str>, month: Option<&str>, day: Option<&str>) -> Option<String> {
    let month = month.filter(|m| !m.contains(char::is_whitespace))?;
    let mut fields = Vec::with_capacity(3);
    if let Some(year) = year {
        fields.push(four_digit_year(year)?);
    }
    fields.push(month.to_string());
    if let Some(day) = day {
        if day.contains(char::is_whitespace) {
            return None;
        }
        fields.push(day.to_string());
    }
    Some(fields.join("-"))
}

fn day_phrase(year: Option<&str>, month: Option<&str>, day: Option<&str>) -> Option<String> {
    let day = day?;
    let mut words = vec![match number(day) {
        Some(n) => ordinal(n),
        None => day.to_string(),
    }];
    if let Some(month) = month {
        let name = match number(month) {
            Some(n) => MONTH_NAMES.get(n.checked_sub(1)? as usize)?.to_string(),
            None if vocab::month(month).is_some() => month.to_string(),
            None => return None,
        };
        words.push(name);
    }
    if let Some(year) = year {
        words.push(four_digit_year(year)?);
    }
    Some(words.join(" "))
}

fn four_digit_year(year: &str) -> Option<String> {
    number(year).filter(|y| (1000..=9999).contains(y)).map(|y| y.to_string())
}

fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
