//! Next-occurrence search in zone-local time.
//!
//! The search is a constraint walk: starting one second after the base, every
//! rule that rejects the candidate proposes a safe landing point and the
//! candidate jumps to the earliest of them. A candidate every rule accepts is
//! the occurrence.
//!
//! Besides the parsed rules, a search plan carries pins for units no
//! `@at`/`@in`/`@on` rule fixes:
//!
//! - units finer than the finest `@at`/`@in`/`@on` unit sit at their minimum,
//!   so `@daily @at 14:00` fires at 14:00:00;
//! - units finer than the `@every` unit take the seed's value, so
//!   `@every 2 days` keeps the base's time of day.
//!
//! The seed is the base itself, or the next window opening when a `@between`
//! rule excludes the base: `@daily @between 09:00 and 17:00` from 08:00 fires
//! at 09:00 every day. `@between` rules only filter candidates and never stand
//! in for a pin. Day and month pins clamp to the month's length, so `@monthly`
//! from Jan 31 lands on Feb 29 and returns to Mar 31.

use chrono::{Datelike, Duration, NaiveDateTime};
use tracing::{trace, warn};

use super::matcher::{Advance, Cadence, Matcher};
use super::metrics::SearchMetrics;
use super::resolve::Resolver;
use crate::calendar::{absolute_max, min_value, part, start_of};
use crate::rule::Rule;
use crate::{TimeUnit, UnitSet};

/// Units that can be pinned, coarsest first.
const PINNABLE: [TimeUnit; 5] = [TimeUnit::Month, TimeUnit::Day, TimeUnit::Hour, TimeUnit::Minute, TimeUnit::Second];

/// Most window hops taken while looking for the seed.
const SEED_STEPS: usize = 8;

/// Rules plus pins, ready to walk from one base instant.
pub(crate) struct Plan<'e> {
    matchers: Vec<Matcher<'e>>,
    resolver: &'e Resolver,
}

impl<'e> Plan<'e> {
    /// Plan for a series starting at `base`. Pins and `@every` cadence are
    /// fixed here, so the same plan keeps its phase across a whole series.
    pub(crate) fn new(rules: &'e [Rule], resolver: &'e Resolver, base: NaiveDateTime) -> Self {
        let mut matchers = Vec::with_capacity(rules.len() + PINNABLE.len());
        let mut windows = Vec::new();
        let mut at_units = UnitSet::empty();
        let mut fixed = UnitSet::empty();
        let mut windowed = UnitSet::empty();
        let mut every = None;

        for rule in rules {
            match rule {
                Rule::Every(cadence) => every = Some(cadence),
                Rule::At(at) => matchers.push(Matcher::equals(at.unit, at.value.as_str())),
                Rule::AtMultiples(multi) => matchers.push(Matcher::multiples(multi)),
                Rule::Between(range) => windows.push(Matcher::between(range)),
                Rule::BetweenMultiples(multi) => windows.push(Matcher::between_multiples(multi)),
                Rule::TimeZone(_) => continue,
            }
            match rule {
                Rule::At(_) | Rule::AtMultiples(_) => at_units |= rule.units(),
                Rule::Between(_) | Rule::BetweenMultiples(_) => windowed |= rule.units(),
                _ => {}
            }
        }
        fixed |= at_units;

        let free = |unit: TimeUnit, taken: UnitSet| {
            !taken.has(unit) && !(unit == TimeUnit::Day && taken.has(TimeUnit::Week))
        };

        if let Some(finest) = at_units.finest() {
            if every.is_none_or(|e| !e.unit.is_finer_than(finest)) {
                for unit in PINNABLE.into_iter().filter(|u| u.is_finer_than(finest)) {
                    if free(unit, fixed | windowed) {
                        matchers.push(Matcher::pin(unit, min_value(unit)));
                        fixed |= unit.flag();
                    }
                }
            }
        }

        if let Some(every) = every {
            let seed = window_seed(&mut windows, resolver, base);
            trace!(%base, %seed, "cadence seed");
            matchers.push(Matcher::every(Cadence::new(every, seed, resolver)));
            for unit in PINNABLE.into_iter().filter(|u| u.is_finer_than(every.unit)) {
                if free(unit, fixed) {
                    matchers.push(Matcher::pin(unit, part(unit, seed)));
                    fixed |= unit.flag();
                }
            }
            let weekday_free = !fixed.intersects(TimeUnit::Day.flag() | TimeUnit::Week.flag());
            if every.unit == TimeUnit::Week && every.anchor.is_none() && weekday_free {
                matchers.push(Matcher::pin(TimeUnit::Week, part(TimeUnit::Week, seed)));
            }
        }

        matchers.append(&mut windows);
        Plan { matchers, resolver }
    }

    /// First instant strictly after `base` and strictly before `limit` that
    /// every rule accepts.
    pub(crate) fn next(
        &mut self,
        base: NaiveDateTime,
        limit: Option<NaiveDateTime>,
        max_iterations: usize,
        metrics: &mut SearchMetrics,
    ) -> Option<NaiveDateTime> {
        let mut candidate = start_of(TimeUnit::Second, base).checked_add_signed(Duration::seconds(1))?;
        let mut iterations = 0usize;

        loop {
            if limit.is_some_and(|limit| candidate >= limit) {
                trace!(%candidate, "lookahead bound reached");
                return None;
            }
            if candidate.year() > absolute_max(TimeUnit::Year) {
                trace!(%candidate, "past the last representable year");
                return None;
            }
            if iterations >= max_iterations {
                warn!(%base, iterations, "search iteration ceiling reached");
                return None;
            }
            iterations += 1;
            metrics.visit(candidate);

            match self.step(candidate) {
                Step::Found => return Some(candidate),
                Step::Jump(next) => {
                    trace!(from = %candidate, to = %next, "jump");
                    candidate = next;
                }
                Step::Exhausted => {
                    trace!(%candidate, "a rule can never match again");
                    return None;
                }
            }
        }
    }

    fn step(&mut self, candidate: NaiveDateTime) -> Step {
        let mut earliest: Option<NaiveDateTime> = None;
        for matcher in &mut self.matchers {
            if matcher.matches(candidate, self.resolver) {
                continue;
            }
            match matcher.advance(candidate, self.resolver) {
                Advance::Never => return Step::Exhausted,
                hint => {
                    let landing = hint.landing(candidate);
                    earliest = match (earliest, landing) {
                        (Some(a), Some(b)) => Some(a.min(b)),
                        (a, b) => a.or(b),
                    };
                }
            }
        }
        match earliest {
            Some(next) => Step::Jump(next),
            None => Step::Found,
        }
    }
}

enum Step {
    Found,
    Jump(NaiveDateTime),
    Exhausted,
}

/// `base` if every window holds it, otherwise the next instant they all do.
fn window_seed(windows: &mut [Matcher<'_>], resolver: &Resolver, base: NaiveDateTime) -> NaiveDateTime {
    let mut seed = base;
    for _ in 0..SEED_STEPS {
        let landing = windows
            .iter_mut()
            .filter_map(|window| {
                if window.matches(seed, resolver) { None } else { window.advance(seed, resolver).landing(seed) }
            })
            .min();
        match landing {
            Some(next) => seed = next,
            None => break,
        }
    }
    seed
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::syntax::parse_rules;

    fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    fn next(text: &str, base: NaiveDateTime) -> Option<NaiveDateTime> {
        next_before(text, base, None)
    }

    fn next_before(text: &str, base: NaiveDateTime, limit: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
        let (rules, errors) = parse_rules(text);
        assert!(errors.is_empty(), "{text}: {errors:?}");
        let resolver = Resolver::uncached();
        let mut metrics = SearchMetrics::default();
        Plan::new(&rules, &resolver, base).next(base, limit, 1_000_000, &mut metrics)
    }

    /// `count` occurrences from one plan, each search starting at the last hit.
    fn series(text: &str, base: NaiveDateTime, count: usize) -> Vec<NaiveDateTime> {
        let (rules, errors) = parse_rules(text);
        assert!(errors.is_empty(), "{text}: {errors:?}");
        let resolver = Resolver::uncached();
        let mut metrics = SearchMetrics::default();
        let mut plan = Plan::new(&rules, &resolver, base);
        let mut found = Vec::new();
        let mut from = base;
        while found.len() < count {
            let Some(next) = plan.next(from, None, 1_000_000, &mut metrics) else { break };
            found.push(next);
            from = next;
        }
        found
    }

    #[test]
    fn daily_at_pins_finer_units_to_zero() {
        assert_eq!(next("@daily @at 14:00", at(2024, 1, 1, 10, 0, 0)), Some(at(2024, 1, 1, 14, 0, 0)));
        assert_eq!(next("@daily @at 14:00", at(2024, 1, 1, 14, 0, 0)), Some(at(2024, 1, 2, 14, 0, 0)));
    }

    #[test]
    fn every_keeps_the_base_time_of_day() {
        assert_eq!(next("@every 2 days", at(2024, 1, 1, 10, 0, 0)), Some(at(2024, 1, 3, 10, 0, 0)));
        assert_eq!(next("@weekly", at(2024, 1, 3, 9, 30, 0)), Some(at(2024, 1, 10, 9, 30, 0)));
    }

    #[test]
    fn windows_filter_cadence_without_replacing_pins() {
        let base = at(2024, 1, 1, 8, 0, 0);
        assert_eq!(
            series("@daily @between 09:00 and 17:00", base, 3),
            [at(2024, 1, 1, 9, 0, 0), at(2024, 1, 2, 9, 0, 0), at(2024, 1, 3, 9, 0, 0)]
        );
        assert_eq!(
            series("@hourly @between 09:00 and 17:00", base, 3),
            [at(2024, 1, 1, 9, 0, 0), at(2024, 1, 1, 10, 0, 0), at(2024, 1, 1, 11, 0, 0)]
        );
        // Inside the window the base's minute is kept; 17:30 is past it.
        assert_eq!(
            series("@hourly @between 09:00 and 17:00", at(2024, 1, 1, 16, 30, 0), 2),
            [at(2024, 1, 2, 9, 30, 0), at(2024, 1, 2, 10, 30, 0)]
        );
    }

    #[test]
    fn open_ended_windows() {
        assert_eq!(
            series("@hourly @upto 10:30", at(2024, 1, 1, 8, 0, 0), 3),
            [at(2024, 1, 1, 9, 0, 0), at(2024, 1, 1, 10, 0, 0), at(2024, 1, 2, 0, 0, 0)]
        );
        assert_eq!(
            series("@hourly @upto 10:30", at(2024, 1, 1, 9, 45, 0), 2),
            [at(2024, 1, 2, 0, 45, 0), at(2024, 1, 2, 1, 45, 0)]
        );
        assert_eq!(
            series("@hourly @from 22:30", at(2024, 1, 1, 20, 0, 0), 3),
            [at(2024, 1, 1, 22, 30, 0), at(2024, 1, 1, 23, 30, 0), at(2024, 1, 2, 22, 30, 0)]
        );
    }

    #[test]
    fn month_end_cadence_clamps_to_short_months() {
        assert_eq!(
            series("@monthly", at(2024, 1, 31, 10, 0, 0), 4),
            [at(2024, 2, 29, 10, 0, 0), at(2024, 3, 31, 10, 0, 0), at(2024, 4, 30, 10, 0, 0), at(2024, 5, 31, 10, 0, 0)]
        );
        assert_eq!(
            series("@yearly", at(2024, 2, 29, 10, 0, 0), 4),
            [at(2025, 2, 28, 10, 0, 0), at(2026, 2, 28, 10, 0, 0), at(2027, 2, 28, 10, 0, 0), at(2028, 2, 29, 10, 0, 0)]
        );
    }

    #[test]
    fn anchored_seconds() {
        let base = at(2024, 1, 1, 0, 0, 3);
        assert_eq!(next("@every 2 seconds AnchoredOn 10", base), Some(at(2024, 1, 1, 0, 0, 4)));
    }

    #[test]
    fn nth_weekday_skips_months_without_it() {
        // February 2024 has no fifth Friday; March 29 is the next one.
        let base = at(2024, 2, 1, 0, 0, 0);
        assert_eq!(next("@monthly @on 5thFriday @at 09:00", base), Some(at(2024, 3, 29, 9, 0, 0)));
    }

    #[test]
    fn between_window_with_minute_cadence() {
        let base = at(2024, 1, 1, 16, 50, 0);
        let text = "@every 15 minutes @between 09:00 and 17:00";
        // 17:05 is past the window; the cadence resumes at 09:05 the next day.
        assert_eq!(next(text, base), Some(at(2024, 1, 2, 9, 5, 0)));
    }

    #[test]
    fn lookahead_is_exclusive() {
        let base = at(2024, 1, 1, 10, 0, 0);
        assert_eq!(next_before("@daily @at 14:00", base, Some(at(2024, 1, 1, 14, 0, 0))), None);
        assert_eq!(
            next_before("@daily @at 14:00", base, Some(at(2024, 1, 1, 14, 0, 1))),
            Some(at(2024, 1, 1, 14, 0, 0))
        );
    }

    #[test]
    fn past_year_never_matches_again() {
        assert_eq!(next("@in year 2020", at(2024, 1, 1, 0, 0, 0)), None);
        assert_eq!(next("@in year 2030", at(2024, 1, 1, 0, 0, 0)), Some(at(2030, 1, 1, 0, 0, 0)));
    }

    #[test_log::test]
    fn iteration_ceiling_stops_the_search() {
        let (rules, _) = parse_rules("@every 5 seconds");
        let resolver = Resolver::uncached();
        let base = at(2024, 1, 1, 0, 0, 0);
        let mut metrics = SearchMetrics::default();
        assert_eq!(Plan::new(&rules, &resolver, base).next(base, None, 0, &mut metrics), None);
        assert_eq!(metrics.iterations, 0);
    }
}
