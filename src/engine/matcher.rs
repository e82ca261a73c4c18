//! Per-rule matching and advance hints.
//!
//! A [`Matcher`] answers two questions about a candidate instant: does its
//! rule accept it, and if not, how far can the search safely jump. A hint is
//! safe when no instant between the candidate and the landing point could
//! satisfy the rule; the search takes the minimum landing over all unmatched
//! rules, so one overly cautious hint only costs iterations.
//!
//! Matchers own their memo state (last queried instant, resolved multi-value
//! records for the current month), so rules themselves stay immutable and an
//! expression can be searched from several threads at once.

use chrono::{Datelike, Duration, NaiveDateTime};

use super::resolve::{Resolution, Resolver};
use crate::TimeUnit;
use crate::calendar::{Parts, land, linear_index, max_value, min_value, part};
use crate::rule::{AtMultiplesRule, BetweenMultiplesRule, BetweenRule, EveryRule};

/// Where a rule wants the search to go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Advance {
    /// Start of the `amount`-th `unit` after the current one.
    By { amount: i64, unit: TimeUnit },
    /// An exact instant.
    To(NaiveDateTime),
    /// The rule can never match again.
    Never,
}

impl Advance {
    fn by(amount: i64, unit: TimeUnit) -> Self {
        Advance::By { amount, unit }
    }

    /// Landing point from `from`, always strictly later than `from`.
    pub(crate) fn landing(self, from: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Advance::By { amount, unit } => Some(land(from, amount.max(1), unit)),
            Advance::To(at) => Some(at.max(from + Duration::seconds(1))),
            Advance::Never => None,
        }
    }
}

/// Move on to the next cycle of the unit containing `unit`.
fn wrap(unit: TimeUnit) -> Advance {
    match unit.parent() {
        Some(parent) => Advance::by(1, parent),
        None => Advance::Never,
    }
}

fn context(dt: NaiveDateTime) -> (i32, u32) {
    (dt.year(), dt.month())
}

/// Hint for a single equality constraint that does not hold at `dt`.
fn equality_advance(unit: TimeUnit, resolution: Resolution, dt: NaiveDateTime) -> Advance {
    let current = part(unit, dt);
    let target = match resolution {
        Resolution::Value(target) => target,
        Resolution::NoMatch => return wrap(unit),
        Resolution::Invalid => return Advance::Never,
    };
    match unit {
        TimeUnit::Week => {
            let days = (target - current).rem_euclid(7);
            Advance::by(if days == 0 { 7 } else { i64::from(days) }, TimeUnit::Day)
        }
        TimeUnit::Year if target > current => Advance::by(i64::from(target - current), TimeUnit::Year),
        TimeUnit::Year => Advance::Never,
        _ if target > current && target <= max_value(unit, dt.year(), dt.month()) => {
            Advance::by(i64::from(target - current), unit)
        }
        _ => wrap(unit),
    }
}

/// `@every` cadence, fixed relative to the search base.
#[derive(Debug, Clone)]
pub(crate) struct Cadence<'e> {
    unit: TimeUnit,
    interval: i64,
    anchor: Option<&'e str>,
    /// Linear index of the first aligned unit (unanchored, or anchored weeks).
    phase: i64,
}

impl<'e> Cadence<'e> {
    pub(crate) fn new(rule: &'e EveryRule, base: NaiveDateTime, resolver: &Resolver) -> Self {
        let anchor = rule.anchor.as_deref();
        let phase = match (rule.unit, anchor) {
            (TimeUnit::Week, Some(anchor)) => {
                let (year, month) = context(base);
                let target = resolver.resolve(TimeUnit::Week, year, month, anchor).value().unwrap_or(1);
                let ahead = (target - part(TimeUnit::Week, base)).rem_euclid(7);
                linear_index(TimeUnit::Week, base + Duration::days(i64::from(ahead)))
            }
            _ => linear_index(rule.unit, base),
        };
        Cadence { unit: rule.unit, interval: i64::from(rule.interval.max(1)), anchor, phase }
    }

    fn offset(&self, dt: NaiveDateTime) -> i64 {
        (linear_index(self.unit, dt) - self.phase).rem_euclid(self.interval)
    }

    fn anchor_value(&self, dt: NaiveDateTime, resolver: &Resolver) -> Option<Resolution> {
        let (year, month) = context(dt);
        self.anchor.map(|anchor| resolver.resolve(self.unit, year, month, anchor))
    }

    fn matches(&self, dt: NaiveDateTime, resolver: &Resolver) -> bool {
        match (self.unit, self.anchor_value(dt, resolver)) {
            (_, None) => self.offset(dt) == 0,
            (TimeUnit::Week, Some(Resolution::Value(day))) => {
                part(TimeUnit::Week, dt) == day && self.offset(dt) == 0
            }
            (unit, Some(Resolution::Value(anchor))) => {
                i64::from(part(unit, dt) - anchor).rem_euclid(self.interval) == 0
            }
            (_, Some(_)) => false,
        }
    }

    fn advance(&self, dt: NaiveDateTime, resolver: &Resolver) -> Advance {
        let offset = self.offset(dt);
        let next_aligned = if offset == 0 { self.interval } else { self.interval - offset };
        match (self.unit, self.anchor_value(dt, resolver)) {
            (unit, None) => Advance::by(next_aligned, unit),
            (TimeUnit::Week, Some(Resolution::Value(day))) => {
                let weekday = part(TimeUnit::Week, dt);
                if offset == 0 && weekday < day {
                    Advance::by(i64::from(day - weekday), TimeUnit::Day)
                } else {
                    Advance::by(next_aligned, TimeUnit::Week)
                }
            }
            (unit, Some(Resolution::Value(anchor))) => {
                let current = i64::from(part(unit, dt));
                let step = self.interval - (current - i64::from(anchor)).rem_euclid(self.interval);
                let next = current + step;
                if next <= i64::from(max_value(unit, dt.year(), dt.month())) {
                    Advance::by(step, unit)
                } else {
                    wrap(unit)
                }
            }
            (unit, Some(Resolution::NoMatch)) => wrap(unit),
            (_, Some(Resolution::Invalid)) => Advance::Never,
        }
    }
}

/// One record of a multi-value rule, resolved for a given month.
type Record = Vec<(TimeUnit, Resolution)>;

#[derive(Debug, Clone)]
struct ResolvedRecords {
    year: i32,
    month: u32,
    records: Vec<Record>,
}

#[derive(Debug, Clone)]
enum Check<'e> {
    Equals { unit: TimeUnit, value: &'e str },
    /// A fixed number, clamped to the unit's range in each month.
    Pin { unit: TimeUnit, value: i32 },
    Every(Cadence<'e>),
    Multiples { rule: &'e AtMultiplesRule, resolved: Option<ResolvedRecords> },
    Between(&'e BetweenRule),
    BetweenMultiples(&'e BetweenMultiplesRule),
}

/// A rule plus its per-search memo.
#[derive(Debug, Clone)]
pub(crate) struct Matcher<'e> {
    check: Check<'e>,
    last: Option<(NaiveDateTime, bool)>,
}

impl<'e> Matcher<'e> {
    fn with(check: Check<'e>) -> Self {
        Matcher { check, last: None }
    }

    pub(crate) fn equals(unit: TimeUnit, value: &'e str) -> Self {
        Matcher::with(Check::Equals { unit, value })
    }

    /// Holds `unit` at `value`, or at the unit's maximum in months too short
    /// for it, so a day pin of 31 lands on Feb 29 in 2024.
    pub(crate) fn pin(unit: TimeUnit, value: i32) -> Self {
        Matcher::with(Check::Pin { unit, value })
    }

    pub(crate) fn every(cadence: Cadence<'e>) -> Self {
        Matcher::with(Check::Every(cadence))
    }

    pub(crate) fn multiples(rule: &'e AtMultiplesRule) -> Self {
        Matcher::with(Check::Multiples { rule, resolved: None })
    }

    pub(crate) fn between(rule: &'e BetweenRule) -> Self {
        Matcher::with(Check::Between(rule))
    }

    pub(crate) fn between_multiples(rule: &'e BetweenMultiplesRule) -> Self {
        Matcher::with(Check::BetweenMultiples(rule))
    }

    pub(crate) fn matches(&mut self, dt: NaiveDateTime, resolver: &Resolver) -> bool {
        if let Some((at, matched)) = self.last {
            if at == dt {
                return matched;
            }
        }
        let matched = match &mut self.check {
            Check::Equals { unit, value } => {
                let (year, month) = context(dt);
                resolver.resolve(*unit, year, month, value) == Resolution::Value(part(*unit, dt))
            }
            Check::Pin { unit, value } => part(*unit, dt) == pinned(*unit, *value, dt),
            Check::Every(cadence) => cadence.matches(dt, resolver),
            Check::Multiples { rule, resolved } => {
                records(rule, resolved, dt, resolver).iter().any(|record| record_matches(record, dt))
            }
            Check::Between(range) => range_check(range, dt, resolver).is_none(),
            Check::BetweenMultiples(multi) => multi.ranges.iter().any(|r| range_check(r, dt, resolver).is_none()),
        };
        self.last = Some((dt, matched));
        matched
    }

    /// Hint for a candidate this matcher rejected.
    pub(crate) fn advance(&mut self, dt: NaiveDateTime, resolver: &Resolver) -> Advance {
        match &mut self.check {
            Check::Equals { unit, value } => {
                let (year, month) = context(dt);
                equality_advance(*unit, resolver.resolve(*unit, year, month, value), dt)
            }
            Check::Pin { unit, value } => {
                equality_advance(*unit, Resolution::Value(pinned(*unit, *value, dt)), dt)
            }
            Check::Every(cadence) => cadence.advance(dt, resolver),
            Check::Multiples { rule, resolved } => {
                let landings = records(rule, resolved, dt, resolver).iter().map(|record| record_advance(record, dt));
                earliest(landings, dt)
            }
            Check::Between(range) => range_check(range, dt, resolver).unwrap_or(Advance::by(1, TimeUnit::Second)),
            Check::BetweenMultiples(multi) => {
                let landings = multi.ranges.iter().filter_map(|r| range_check(r, dt, resolver));
                earliest(landings, dt)
            }
        }
    }
}

fn pinned(unit: TimeUnit, value: i32, dt: NaiveDateTime) -> i32 {
    value.min(max_value(unit, dt.year(), dt.month()))
}

/// Fold several alternatives into the one landing first.
fn earliest(advances: impl Iterator<Item = Advance>, dt: NaiveDateTime) -> Advance {
    advances.filter_map(|a| a.landing(dt)).min().map_or(Advance::Never, Advance::To)
}

/// Records resolved for `dt`'s month, re-resolved only when the month changes.
fn records<'r>(
    rule: &AtMultiplesRule,
    resolved: &'r mut Option<ResolvedRecords>,
    dt: NaiveDateTime,
    resolver: &Resolver,
) -> &'r [Record] {
    let (year, month) = context(dt);
    let stale = !matches!(resolved, Some(r) if r.year == year && r.month == month);
    if stale {
        let records = (0..rule.len())
            .map(|i| {
                rule.record(i)
                    .into_iter()
                    .map(|(unit, value)| (unit, resolver.resolve(unit, year, month, value)))
                    .collect()
            })
            .collect();
        *resolved = Some(ResolvedRecords { year, month, records });
    }
    resolved.as_ref().map(|r| r.records.as_slice()).unwrap_or_default()
}

fn record_matches(record: &Record, dt: NaiveDateTime) -> bool {
    record.iter().all(|(unit, resolution)| *resolution == Resolution::Value(part(*unit, dt)))
}

/// Hint from the most significant unit the record disagrees on.
fn record_advance(record: &Record, dt: NaiveDateTime) -> Advance {
    record
        .iter()
        .find(|(unit, resolution)| *resolution != Resolution::Value(part(*unit, dt)))
        .map_or(Advance::by(1, TimeUnit::Second), |(unit, resolution)| equality_advance(*unit, *resolution, dt))
}

const CLOCK_ORDER: [TimeUnit; 6] =
    [TimeUnit::Year, TimeUnit::Month, TimeUnit::Day, TimeUnit::Hour, TimeUnit::Minute, TimeUnit::Second];

/// `None` when `dt` lies inside the range, otherwise the hint to get there.
///
/// Populated units take their resolved bounds, clamped to the month. Units
/// coarser than the populated ones follow `dt`; finer ones span their full
/// range. The weekday bound is checked on its own.
fn range_check(range: &BetweenRule, dt: NaiveDateTime, resolver: &Resolver) -> Option<Advance> {
    let populated: Vec<TimeUnit> = range.units().units().filter(|u| *u != TimeUnit::Week).collect();
    if let (Some(&coarsest), Some(&finest)) = (populated.first(), populated.last()) {
        let current = Parts::of(dt);
        let (mut start, mut end) = (current, current);
        for unit in CLOCK_ORDER {
            if let Some((from, to)) = range.bounds.get(&unit) {
                let low = resolver.resolve(unit, start.year, start.month as u32, from).value();
                let high = resolver.resolve(unit, end.year, end.month as u32, to).value();
                let (Some(low), Some(high)) = (low, high) else {
                    return Some(wrap(coarsest));
                };
                start.set(unit, low.clamp(min_value(unit), max_value(unit, start.year, start.month as u32)));
                end.set(unit, high.clamp(min_value(unit), max_value(unit, end.year, end.month as u32)));
            } else if unit.is_finer_than(finest) {
                start.set(unit, min_value(unit));
                end.set(unit, max_value(unit, end.year, end.month as u32));
            }
        }
        if current < start {
            return Some(start.to_datetime().map_or(Advance::by(1, finest), Advance::To));
        }
        if current > end {
            return Some(wrap(coarsest));
        }
    }

    let (from, to) = range.bounds.get(&TimeUnit::Week)?;
    let (year, month) = context(dt);
    let low = resolver.resolve(TimeUnit::Week, year, month, from).value();
    let high = resolver.resolve(TimeUnit::Week, year, month, to).value();
    let (Some(low), Some(high)) = (low, high) else {
        return Some(Advance::Never);
    };
    let weekday = part(TimeUnit::Week, dt);
    if weekday < low {
        Some(Advance::by(i64::from(low - weekday), TimeUnit::Day))
    } else if weekday > high {
        Some(Advance::by(i64::from(7 - weekday + low), TimeUnit::Day))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::syntax::parse_rules;
    use crate::rule::Rule;

    fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    fn rules(text: &str) -> Vec<Rule> {
        let (rules, errors) = parse_rules(text);
        assert!(errors.is_empty(), "{errors:?}");
        rules
    }

    #[test]
    fn equality_hints_land_on_target_or_wrap() {
        let resolver = Resolver::uncached();
        let mut hour = Matcher::equals(TimeUnit::Hour, "14");
        let dt = at(2024, 1, 1, 10, 20, 0);
        assert!(!hour.matches(dt, &resolver));
        assert_eq!(hour.advance(dt, &resolver).landing(dt), Some(at(2024, 1, 1, 14, 0, 0)));

        let late = at(2024, 1, 1, 15, 0, 0);
        assert_eq!(hour.advance(late, &resolver).landing(late), Some(at(2024, 1, 2, 0, 0, 0)));

        let mut day = Matcher::equals(TimeUnit::Day, "31");
        let april = at(2024, 4, 10, 0, 0, 0);
        assert_eq!(day.advance(april, &resolver).landing(april), Some(at(2024, 5, 1, 0, 0, 0)));

        let mut year = Matcher::equals(TimeUnit::Year, "2020");
        assert_eq!(year.advance(april, &resolver), Advance::Never);
    }

    #[test]
    fn day_pins_clamp_to_short_months() {
        let resolver = Resolver::uncached();
        let mut day = Matcher::pin(TimeUnit::Day, 31);
        assert!(day.matches(at(2024, 2, 29, 10, 0, 0), &resolver));
        assert!(!day.matches(at(2024, 3, 29, 10, 0, 0), &resolver));
        assert!(day.matches(at(2024, 4, 30, 10, 0, 0), &resolver));
        let feb = at(2023, 2, 1, 0, 0, 0);
        assert_eq!(day.advance(feb, &resolver).landing(feb), Some(at(2023, 2, 28, 0, 0, 0)));
    }

    #[test]
    fn weekday_hint_counts_days_forward() {
        let resolver = Resolver::uncached();
        // 2024-01-05 is a Friday.
        let friday = at(2024, 1, 5, 9, 0, 0);
        let mut monday = Matcher::equals(TimeUnit::Week, "monday");
        assert_eq!(monday.advance(friday, &resolver).landing(friday), Some(at(2024, 1, 8, 0, 0, 0)));
    }

    #[test]
    fn unanchored_cadence_counts_from_base() {
        let resolver = Resolver::uncached();
        let rules = rules("@every 3 days");
        let Rule::Every(every) = &rules[0] else { panic!("expected every") };
        let base = at(2024, 1, 1, 8, 0, 0);
        let cadence = Cadence::new(every, base, &resolver);
        assert!(cadence.matches(at(2024, 1, 4, 0, 0, 0), &resolver));
        assert!(!cadence.matches(at(2024, 1, 5, 0, 0, 0), &resolver));
        let dt = at(2024, 1, 2, 0, 0, 0);
        assert_eq!(cadence.advance(dt, &resolver).landing(dt), Some(at(2024, 1, 4, 0, 0, 0)));
    }

    #[test]
    fn anchored_cadence_aligns_within_parent() {
        let resolver = Resolver::uncached();
        let rules = rules("@every 4 hours AnchoredOn 2");
        let Rule::Every(every) = &rules[0] else { panic!("expected every") };
        let cadence = Cadence::new(every, at(2024, 1, 1, 0, 0, 0), &resolver);
        assert!(cadence.matches(at(2024, 1, 1, 6, 0, 0), &resolver));
        let dt = at(2024, 1, 1, 7, 30, 0);
        assert_eq!(cadence.advance(dt, &resolver).landing(dt), Some(at(2024, 1, 1, 10, 0, 0)));
        let dt = at(2024, 1, 1, 22, 30, 0);
        assert_eq!(cadence.advance(dt, &resolver).landing(dt), Some(at(2024, 1, 2, 0, 0, 0)));
    }

    #[test]
    fn anchored_weeks_start_at_the_first_anchor_day() {
        let resolver = Resolver::uncached();
        let rules = rules("@every 2 weeks AnchoredOn wednesday");
        let Rule::Every(every) = &rules[0] else { panic!("expected every") };
        // 2024-01-05 is a Friday; the first Wednesday after it is 2024-01-10.
        let cadence = Cadence::new(every, at(2024, 1, 5, 0, 0, 0), &resolver);
        assert!(cadence.matches(at(2024, 1, 10, 12, 0, 0), &resolver));
        assert!(!cadence.matches(at(2024, 1, 17, 12, 0, 0), &resolver));
        assert!(cadence.matches(at(2024, 1, 24, 12, 0, 0), &resolver));
        let dt = at(2024, 1, 11, 0, 0, 0);
        assert_eq!(cadence.advance(dt, &resolver).landing(dt), Some(at(2024, 1, 21, 0, 0, 0)));
    }

    #[test]
    fn multiples_hint_to_the_nearest_record() {
        let resolver = Resolver::uncached();
        let rules = rules("@at [10:30, 14:15]");
        let Rule::AtMultiples(multi) = &rules[0] else { panic!("expected multiples") };
        let mut matcher = Matcher::multiples(multi);
        let dt = at(2024, 1, 1, 11, 0, 0);
        assert!(!matcher.matches(dt, &resolver));
        assert_eq!(matcher.advance(dt, &resolver).landing(dt), Some(at(2024, 1, 1, 14, 0, 0)));
        assert!(matcher.matches(at(2024, 1, 1, 14, 15, 0), &resolver));
    }

    #[test]
    fn between_jumps_to_start_or_next_cycle() {
        let resolver = Resolver::uncached();
        let rules = rules("@between 09:00 and 17:00");
        let Rule::Between(range) = &rules[0] else { panic!("expected between") };
        let mut matcher = Matcher::between(range);
        let early = at(2024, 1, 1, 7, 12, 0);
        assert_eq!(matcher.advance(early, &resolver).landing(early), Some(at(2024, 1, 1, 9, 0, 0)));
        assert!(matcher.matches(at(2024, 1, 1, 17, 0, 59), &resolver));
        let late = at(2024, 1, 1, 17, 1, 0);
        assert!(!matcher.matches(late, &resolver));
        assert_eq!(matcher.advance(late, &resolver).landing(late), Some(at(2024, 1, 2, 0, 0, 0)));
    }

    #[test]
    fn weekday_ranges_wrap_around_the_week() {
        let resolver = Resolver::uncached();
        let rules = rules("@between monday and wednesday");
        let Rule::Between(range) = &rules[0] else { panic!("expected between") };
        let mut matcher = Matcher::between(range);
        // 2024-01-05 is a Friday.
        let friday = at(2024, 1, 5, 10, 0, 0);
        assert!(!matcher.matches(friday, &resolver));
        assert_eq!(matcher.advance(friday, &resolver).landing(friday), Some(at(2024, 1, 8, 0, 0, 0)));
    }
}
