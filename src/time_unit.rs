use std::fmt;

/// Calendar unit a rule constrains.
///
/// Ordering by declaration is only used for map keys. Use [`TimeUnit::rank`]
/// when comparing granularity: `Week` shares the rank of `Day`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
    /// Pseudo-unit carried by `@tz` rules. It has no rank.
    TimeZone,
}

impl TimeUnit {
    /// Calendar units from the most to the least significant.
    pub const DESCENDING: [TimeUnit; 7] = [
        TimeUnit::Year,
        TimeUnit::Month,
        TimeUnit::Week,
        TimeUnit::Day,
        TimeUnit::Hour,
        TimeUnit::Minute,
        TimeUnit::Second,
    ];

    /// Granularity rank, `Second = 0` up to `Year = 5`.
    pub fn rank(self) -> Option<u8> {
        match self {
            TimeUnit::Second => Some(0),
            TimeUnit::Minute => Some(1),
            TimeUnit::Hour => Some(2),
            TimeUnit::Day | TimeUnit::Week => Some(3),
            TimeUnit::Month => Some(4),
            TimeUnit::Year => Some(5),
            TimeUnit::TimeZone => None,
        }
    }

    /// True when `self` is strictly finer than `other`.
    pub fn is_finer_than(self, other: TimeUnit) -> bool {
        match (self.rank(), other.rank()) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        }
    }

    /// The next coarser unit whose cycle contains this one.
    ///
    /// `Week` counts as days here, so its parent is `Month`.
    pub fn parent(self) -> Option<TimeUnit> {
        match self {
            TimeUnit::Second => Some(TimeUnit::Minute),
            TimeUnit::Minute => Some(TimeUnit::Hour),
            TimeUnit::Hour => Some(TimeUnit::Day),
            TimeUnit::Day | TimeUnit::Week => Some(TimeUnit::Month),
            TimeUnit::Month => Some(TimeUnit::Year),
            TimeUnit::Year | TimeUnit::TimeZone => None,
        }
    }

    /// Lowercase singular name, as accepted by the lexer.
    pub fn name(self) -> &'static str {
        match self {
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
            TimeUnit::Year => "year",
            TimeUnit::TimeZone => "timezone",
        }
    }

    /// Map a unit word ("days", "hrs", "Minute") to its unit.
    pub fn from_word(word: &str) -> Option<TimeUnit> {
        match word.to_ascii_lowercase().as_str() {
            "second" | "seconds" | "sec" | "secs" => Some(TimeUnit::Second),
            "minute" | "minutes" | "min" | "mins" => Some(TimeUnit::Minute),
            "hour" | "hours" | "hr" | "hrs" => Some(TimeUnit::Hour),
            "day" | "days" => Some(TimeUnit::Day),
            "week" | "weeks" => Some(TimeUnit::Week),
            "month" | "months" => Some(TimeUnit::Month),
            "year" | "years" => Some(TimeUnit::Year),
            _ => None,
        }
    }

    pub(crate) fn flag(self) -> UnitSet {
        match self {
            TimeUnit::Second => UnitSet::SECOND,
            TimeUnit::Minute => UnitSet::MINUTE,
            TimeUnit::Hour => UnitSet::HOUR,
            TimeUnit::Day => UnitSet::DAY,
            TimeUnit::Week => UnitSet::WEEK,
            TimeUnit::Month => UnitSet::MONTH,
            TimeUnit::Year => UnitSet::YEAR,
            TimeUnit::TimeZone => UnitSet::empty(),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags::bitflags! {
    /// Set of calendar units populated by a rule.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct UnitSet: u8 {
        const SECOND = 1 << 0;
        const MINUTE = 1 << 1;
        const HOUR   = 1 << 2;
        const DAY    = 1 << 3;
        const WEEK   = 1 << 4;
        const MONTH  = 1 << 5;
        const YEAR   = 1 << 6;
    }
}

impl UnitSet {
    pub fn has(self, unit: TimeUnit) -> bool {
        let flag = unit.flag();
        !flag.is_empty() && self.contains(flag)
    }

    /// Units in this set, most significant first.
    pub fn units(self) -> impl Iterator<Item = TimeUnit> {
        TimeUnit::DESCENDING.into_iter().filter(move |u| self.has(*u))
    }

    /// The finest unit in the set, `Week` ranking with `Day`.
    pub fn finest(self) -> Option<TimeUnit> {
        self.units().last()
    }
}

impl FromIterator<TimeUnit> for UnitSet {
    fn from_iter<I: IntoIterator<Item = TimeUnit>>(iter: I) -> Self {
        iter.into_iter().fold(UnitSet::empty(), |set, unit| set | unit.flag())
    }
}
