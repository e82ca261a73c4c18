//! Typed rules produced by the parser.
//!
//! A rule holds raw constraint text; turning that text into numbers is the
//! resolver's job and happens per calendar context at search time. Equality
//! compares constraints only, not the source text a rule was parsed from.

use std::collections::BTreeMap;
use std::fmt;

use crate::syntax::format;
use crate::{TimeUnit, UnitSet};

/// Repeat every `interval` units, optionally phase-locked to `anchor`.
#[derive(Debug, Clone)]
pub struct EveryRule {
    pub unit: TimeUnit,
    pub interval: u32,
    pub anchor: Option<String>,
    pub(crate) source: String,
}

/// The instant's `unit` value must equal `value` once resolved.
#[derive(Debug, Clone)]
pub struct AtRule {
    pub unit: TimeUnit,
    pub value: String,
    pub(crate) source: String,
}

/// OR of index-aligned records, one array per populated unit.
#[derive(Debug, Clone)]
pub struct AtMultiplesRule {
    pub values: BTreeMap<TimeUnit, Vec<String>>,
    pub(crate) source: String,
}

/// Inclusive range per populated unit.
#[derive(Debug, Clone)]
pub struct BetweenRule {
    pub bounds: BTreeMap<TimeUnit, (String, String)>,
    pub(crate) source: String,
}

/// OR of ranges sharing the same populated units.
#[derive(Debug, Clone)]
pub struct BetweenMultiplesRule {
    pub ranges: Vec<BetweenRule>,
    pub(crate) source: String,
}

#[derive(Debug, Clone)]
pub struct TimeZoneRule {
    pub id: String,
    pub(crate) source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Every(EveryRule),
    At(AtRule),
    AtMultiples(AtMultiplesRule),
    Between(BetweenRule),
    BetweenMultiples(BetweenMultiplesRule),
    TimeZone(TimeZoneRule),
}

impl AtMultiplesRule {
    pub fn units(&self) -> UnitSet {
        self.values.keys().copied().collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.values.values().next().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record `index` as (unit, value) pairs, most significant unit first.
    pub fn record(&self, index: usize) -> Vec<(TimeUnit, &str)> {
        self.units()
            .units()
            .filter_map(|unit| self.values.get(&unit).and_then(|v| v.get(index)).map(|v| (unit, v.as_str())))
            .collect()
    }
}

impl BetweenRule {
    pub fn units(&self) -> UnitSet {
        self.bounds.keys().copied().collect()
    }

    /// Start or end side as (unit, value) pairs, most significant unit first.
    pub fn side(&self, end: bool) -> Vec<(TimeUnit, &str)> {
        self.units()
            .units()
            .filter_map(|unit| {
                self.bounds.get(&unit).map(|(start, stop)| (unit, if end { stop.as_str() } else { start.as_str() }))
            })
            .collect()
    }
}

impl Rule {
    /// The unit this rule is filed under. Multi-unit rules report their
    /// finest populated unit.
    pub fn unit(&self) -> TimeUnit {
        match self {
            Rule::Every(rule) => rule.unit,
            Rule::At(rule) => rule.unit,
            Rule::AtMultiples(rule) => rule.units().finest().unwrap_or(TimeUnit::Second),
            Rule::Between(rule) => rule.units().finest().unwrap_or(TimeUnit::Second),
            Rule::BetweenMultiples(rule) => {
                rule.ranges.first().and_then(|r| r.units().finest()).unwrap_or(TimeUnit::Second)
            }
            Rule::TimeZone(_) => TimeUnit::TimeZone,
        }
    }

    /// Every unit the rule constrains.
    pub fn units(&self) -> UnitSet {
        match self {
            Rule::AtMultiples(rule) => rule.units(),
            Rule::Between(rule) => rule.units(),
            Rule::BetweenMultiples(rule) => rule.ranges.iter().fold(UnitSet::empty(), |set, r| set | r.units()),
            other => other.unit().flag(),
        }
    }

    /// The group text this rule was parsed from, e.g. `@at 10:30`.
    pub fn full_expression_text(&self) -> &str {
        match self {
            Rule::Every(rule) => &rule.source,
            Rule::At(rule) => &rule.source,
            Rule::AtMultiples(rule) => &rule.source,
            Rule::Between(rule) => &rule.source,
            Rule::BetweenMultiples(rule) => &rule.source,
            Rule::TimeZone(rule) => &rule.source,
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, Rule::Every(_) | Rule::At(_) | Rule::AtMultiples(_))
    }
}

impl PartialEq for EveryRule {
    fn eq(&self, other: &Self) -> bool {
        self.unit == other.unit && self.interval == other.interval && self.anchor == other.anchor
    }
}

impl PartialEq for AtRule {
    fn eq(&self, other: &Self) -> bool {
        self.unit == other.unit && self.value == other.value
    }
}

impl PartialEq for AtMultiplesRule {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl PartialEq for BetweenRule {
    fn eq(&self, other: &Self) -> bool {
        self.bounds == other.bounds
    }
}

impl PartialEq for BetweenMultiplesRule {
    fn eq(&self, other: &Self) -> bool {
        self.ranges == other.ranges
    }
}

impl PartialEq for TimeZoneRule {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Canonical text that parses back to an equal rule.
impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Every(rule) => {
                write!(f, "@every {} {}s", rule.interval, rule.unit)?;
                if let Some(anchor) = &rule.anchor {
                    write!(f, " AnchoredOn {anchor}")?;
                }
                Ok(())
            }
            Rule::At(rule) => {
                let values = [(rule.unit, rule.value.as_str())];
                write!(f, "{} {}", format::keyword_for(&values), format::values(&values))
            }
            Rule::AtMultiples(rule) => {
                let records: Vec<Vec<(TimeUnit, &str)>> = (0..rule.len()).map(|i| rule.record(i)).collect();
                let keyword = records.first().map_or("@at", |r| format::keyword_for(r));
                write!(f, "{keyword} {}", format::list(&records))
            }
            Rule::Between(rule) => write!(f, "@between {}", format::range(rule)),
            Rule::BetweenMultiples(rule) => {
                let ranges: Vec<String> = rule.ranges.iter().map(format::range).collect();
                write!(f, "@between [{}]", ranges.join(", "))
            }
            Rule::TimeZone(rule) => write!(f, "@tz {}", rule.id),
        }
    }
}
