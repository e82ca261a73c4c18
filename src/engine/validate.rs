//! Rule-set checks run after a clean parse.
//!
//! Checks run in a fixed order and stop at the first failure, so a rule set
//! reports at most one validation error. Values are probed against year 1,
//! January.

use std::str::FromStr;

use chrono_tz::Tz;

use super::resolve::{Resolution, Resolver};
use crate::error::ValidationError;
use crate::rule::{BetweenRule, EveryRule, Rule};
use crate::{TimeUnit, UnitSet};

const PROBE_YEAR: i32 = 1;
const PROBE_MONTH: u32 = 1;

pub(crate) fn validate(rules: &[Rule], resolver: &Resolver) -> Result<(), ValidationError> {
    if !rules.iter().any(Rule::is_primary) {
        return Err(ValidationError::MissingPrimaryRule);
    }

    let everys: Vec<&EveryRule> = rules
        .iter()
        .filter_map(|r| match r {
            Rule::Every(every) => Some(every),
            _ => None,
        })
        .collect();
    if everys.len() > 1 {
        return Err(ValidationError::MultipleEvery);
    }
    let every = everys.first().copied();

    let at_units: Vec<UnitSet> = rules
        .iter()
        .filter(|r| matches!(r, Rule::At(_) | Rule::AtMultiples(_)))
        .map(Rule::units)
        .collect();
    if let Some(every) = every {
        for unit in at_units.iter().flat_map(|set| set.units()) {
            if unit == TimeUnit::Week && every.unit == TimeUnit::Week && every.anchor.is_some() {
                return Err(ValidationError::WeekConflictsWithAnchor);
            }
            if unit == every.unit && unit != TimeUnit::Week {
                return Err(ValidationError::ConflictsWithEvery(unit));
            }
        }
    }

    let mut seen = UnitSet::empty();
    for set in &at_units {
        if seen.intersects(*set) {
            return Err(ValidationError::DuplicateAtRule);
        }
        seen |= *set;
    }

    for rule in rules {
        let ranges: Vec<&BetweenRule> = match rule {
            Rule::Between(range) => vec![range],
            Rule::BetweenMultiples(multi) => multi.ranges.iter().collect(),
            _ => continue,
        };
        if every.is_none() {
            return Err(ValidationError::BetweenWithoutEvery);
        }
        for range in ranges {
            check_range(range, resolver)?;
        }
    }

    for rule in rules {
        let values: Vec<(TimeUnit, &str)> = match rule {
            Rule::At(at) => vec![(at.unit, at.value.as_str())],
            Rule::AtMultiples(multi) => {
                multi.values.iter().flat_map(|(unit, vs)| vs.iter().map(move |v| (*unit, v.as_str()))).collect()
            }
            _ => continue,
        };
        for (unit, value) in values {
            if !resolver.resolve(unit, PROBE_YEAR, PROBE_MONTH, value).is_valid() {
                return Err(ValidationError::InvalidAtValue { unit, value: value.to_string() });
            }
        }
    }

    let zones: Vec<&str> = rules
        .iter()
        .filter_map(|r| match r {
            Rule::TimeZone(tz) => Some(tz.id.as_str()),
            _ => None,
        })
        .collect();
    if let Some(unknown) = zones.iter().find(|id| Tz::from_str(id).is_err()) {
        return Err(ValidationError::UnknownTimeZone(unknown.to_string()));
    }
    if zones.len() > 1 {
        return Err(ValidationError::MultipleTimeZones);
    }

    if let Some(every) = every {
        if every.interval == 0 {
            return Err(ValidationError::NonPositiveInterval);
        }
        if let Some(anchor) = &every.anchor {
            if resolver.resolve(every.unit, PROBE_YEAR, PROBE_MONTH, anchor).value().is_none() {
                return Err(ValidationError::InvalidAnchor { unit: every.unit, anchor: anchor.clone() });
            }
        }
    }
    Ok(())
}

/// Every bound must resolve, and the start must not come after the end
/// when compared most significant unit first.
fn check_range(range: &BetweenRule, resolver: &Resolver) -> Result<(), ValidationError> {
    let mut start_key = Vec::new();
    let mut end_key = Vec::new();
    for unit in range.units().units() {
        let Some((start, end)) = range.bounds.get(&unit) else { continue };
        let resolved = [start, end].map(|text| (text, resolver.resolve(unit, PROBE_YEAR, PROBE_MONTH, text)));
        if let Some((text, _)) = resolved.iter().find(|(_, r)| *r == Resolution::Invalid) {
            return Err(ValidationError::InvalidBetweenValue { unit, value: text.to_string() });
        }
        if let [(_, Resolution::Value(s)), (_, Resolution::Value(e))] = resolved {
            if unit == TimeUnit::Week && s > e {
                return Err(ValidationError::BetweenStartAfterEnd { start: start.clone(), end: end.clone() });
            }
            if unit != TimeUnit::Week {
                start_key.push(s);
                end_key.push(e);
            }
        }
    }
    if start_key > end_key {
        let side = |end: bool| range.side(end).into_iter().map(|(_, v)| v).collect::<Vec<_>>().join(" ");
        return Err(ValidationError::BetweenStartAfterEnd { start: side(false), end: side(true) });
    }
    Ok(())
}
