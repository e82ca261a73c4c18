use std::collections::{HashMap, HashSet};

use chrono::Weekday;
use once_cell::sync::Lazy;

/// Rule keywords, without the optional `@` prefix.
pub(crate) static RULE_KEYWORDS: Lazy<HashSet<&'static str>> = word_set![
    "yearly", "monthly", "weekly", "daily", "hourly", "minutely", "secondly", "every", "between", "tz", "timezone",
    "at", "on", "in", "upto", "from",
];

pub(crate) static ANCHOR_KEYWORDS: Lazy<HashSet<&'static str>> =
    word_set!["anchoredon", "anchoredat", "anchoredin", "basedon", "basedat", "basedin"];

pub(crate) static AM_PM: Lazy<HashSet<&'static str>> = word_set!["am", "pm"];

pub(crate) static WEEKDAY_NAME: Lazy<HashMap<&'static str, Weekday>> = Lazy::new(|| {
    HashMap::from([
        ("sunday", Weekday::Sun),
        ("sun", Weekday::Sun),
        ("monday", Weekday::Mon),
        ("mon", Weekday::Mon),
        ("tuesday", Weekday::Tue),
        ("tue", Weekday::Tue),
        ("tues", Weekday::Tue),
        ("wednesday", Weekday::Wed),
        ("wed", Weekday::Wed),
        ("thursday", Weekday::Thu),
        ("thu", Weekday::Thu),
        ("thur", Weekday::Thu),
        ("thurs", Weekday::Thu),
        ("friday", Weekday::Fri),
        ("fri", Weekday::Fri),
        ("saturday", Weekday::Sat),
        ("sat", Weekday::Sat),
    ])
});

pub(crate) static MONTH_NAME: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    HashMap::from([
        ("january", 1),
        ("jan", 1),
        ("february", 2),
        ("feb", 2),
        ("march", 3),
        ("mar", 3),
        ("april", 4),
        ("apr", 4),
        ("may", 5),
        ("june", 6),
        ("jun", 6),
        ("july", 7),
        ("jul", 7),
        ("august", 8),
        ("aug", 8),
        ("september", 9),
        ("sept", 9),
        ("sep", 9),
        ("october", 10),
        ("oct", 10),
        ("november", 11),
        ("nov", 11),
        ("december", 12),
        ("dec", 12),
    ])
});

/// Canonical English month names, January first.
pub(crate) const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub(crate) fn weekday(word: &str) -> Option<Weekday> {
    WEEKDAY_NAME.get(word.to_ascii_lowercase().as_str()).copied()
}

pub(crate) fn month(word: &str) -> Option<u32> {
    MONTH_NAME.get(word.to_ascii_lowercase().as_str()).copied()
}

pub(crate) fn is_rule_keyword(word: &str) -> bool {
    let bare = word.strip_prefix('@').unwrap_or(word);
    RULE_KEYWORDS.contains(bare.to_ascii_lowercase().as_str())
}

/// Shape of a special day/ordinal keyword, as far as the value parser cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OrdinalClass {
    /// `Last` / `First`, valid for every unit and open to a `+N`/`-N` offset.
    Edge,
    /// `LastDay[OfTheMonth]` / `FirstDay[OfTheMonth]`, day-only, open to an offset.
    EdgeDay,
    /// `LastWeekday` / `FirstWeekday`.
    EdgeWeekday,
    /// `ClosestWeekdayTo`, which takes a day number argument.
    ClosestWeekday,
    /// `3rdFriday`, `LastFriday`, `2ndLastFriday`.
    NthWeekday,
    /// `5th`, `21st`.
    OrdinalDay,
}

impl OrdinalClass {
    pub(crate) fn of(word: &str) -> Option<OrdinalClass> {
        let lower = word.to_ascii_lowercase();
        if lower == "last" || lower == "first" {
            Some(OrdinalClass::Edge)
        } else if regex!(r"^(last|first)day(of(the)?month)?$").is_match(&lower) {
            Some(OrdinalClass::EdgeDay)
        } else if lower == "lastweekday" || lower == "firstweekday" {
            Some(OrdinalClass::EdgeWeekday)
        } else if lower == "closestweekdayto" || lower == "nearestweekdayto" {
            Some(OrdinalClass::ClosestWeekday)
        } else if nth_weekday(&lower).is_some() {
            Some(OrdinalClass::NthWeekday)
        } else if ordinal_day(&lower).is_some() {
            Some(OrdinalClass::OrdinalDay)
        } else {
            None
        }
    }

    /// Whether a trailing `+N`/`-N` offset may follow.
    pub(crate) fn takes_offset(self) -> bool {
        matches!(self, OrdinalClass::Edge | OrdinalClass::EdgeDay)
    }
}

/// Day number of an ordinal day such as `21st`.
pub(crate) fn ordinal_day(word: &str) -> Option<u32> {
    let caps = regex!(r"(?i)^(\d{1,2})(st|nd|rd|th)$").captures(word)?;
    caps[1].parse().ok().filter(|d| (1..=31).contains(d))
}

/// Position and weekday of an nth-weekday compound.
///
/// `nth` counts from the start of the month, or from its end when
/// `from_end` is set: `LastFriday` is the first Friday from the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NthWeekday {
    pub nth: u32,
    pub from_end: bool,
    pub weekday: Weekday,
}

pub(crate) fn nth_weekday(word: &str) -> Option<NthWeekday> {
    let caps = regex!(
        r"(?i)^(?:(?:([1-5])(?:st|nd|rd|th)|(first|second|third|fourth|fifth))(last)?|(last))(sunday|sun|monday|mon|tuesday|tues|tue|wednesday|wed|thursday|thurs|thur|thu|friday|fri|saturday|sat)$"
    )
    .captures(word)?;
    let weekday = weekday(&caps[5])?;
    if caps.get(4).is_some() {
        return Some(NthWeekday { nth: 1, from_end: true, weekday });
    }
    let nth = match (caps.get(1), caps.get(2)) {
        (Some(digit), _) => digit.as_str().parse().ok()?,
        (None, Some(word)) => match word.as_str().to_ascii_lowercase().as_str() {
            "first" => 1,
            "second" => 2,
            "third" => 3,
            "fourth" => 4,
            _ => 5,
        },
        (None, None) => return None,
    };
    Some(NthWeekday { nth, from_end: caps.get(3).is_some(), weekday })
}

/// Whether `candidate` is a digits-then-letters word the lexer keeps whole.
pub(crate) fn is_ordinal_compound(candidate: &str) -> bool {
    ordinal_day(candidate).is_some() || nth_weekday(candidate).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_special_day_words() {
        assert_eq!(OrdinalClass::of("Last"), Some(OrdinalClass::Edge));
        assert_eq!(OrdinalClass::of("LastDayOfTheMonth"), Some(OrdinalClass::EdgeDay));
        assert_eq!(OrdinalClass::of("firstday"), Some(OrdinalClass::EdgeDay));
        assert_eq!(OrdinalClass::of("LastWeekday"), Some(OrdinalClass::EdgeWeekday));
        assert_eq!(OrdinalClass::of("ClosestWeekdayTo"), Some(OrdinalClass::ClosestWeekday));
        assert_eq!(OrdinalClass::of("3rdFriday"), Some(OrdinalClass::NthWeekday));
        assert_eq!(OrdinalClass::of("15th"), Some(OrdinalClass::OrdinalDay));
        assert_eq!(OrdinalClass::of("Lastly"), None);
    }

    #[test]
    fn parses_nth_weekday_compounds() {
        assert_eq!(nth_weekday("3rdFriday"), Some(NthWeekday { nth: 3, from_end: false, weekday: Weekday::Fri }));
        assert_eq!(nth_weekday("LastMonday"), Some(NthWeekday { nth: 1, from_end: true, weekday: Weekday::Mon }));
        assert_eq!(nth_weekday("2ndLastSun"), Some(NthWeekday { nth: 2, from_end: true, weekday: Weekday::Sun }));
        assert_eq!(nth_weekday("SecondTuesday"), Some(NthWeekday { nth: 2, from_end: false, weekday: Weekday::Tue }));
        assert_eq!(nth_weekday("6thFriday"), None);
    }

    #[test]
    fn ordinal_days_stay_in_range() {
        assert_eq!(ordinal_day("1st"), Some(1));
        assert_eq!(ordinal_day("31ST"), Some(31));
        assert_eq!(ordinal_day("32nd"), None);
    }
}
