//! Zone boundary crossings.
//!
//! The search runs on naive local date-times. Instants are converted into the
//! evaluation zone once on the way in and back once on the way out; nothing in
//! between knows about offsets.

use std::time::Instant;

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

use super::metrics::{SearchMetrics, SearchTrace};
use super::search::Plan;
use crate::expression::Expression;

/// Most minutes a nonexistent local time is pushed forward looking for a
/// valid one. Real zone gaps are at most a few hours.
const GAP_SEARCH_MINUTES: i64 = 24 * 60;

/// Most local passes per search. A later pass only runs when a fold maps the
/// previous local hit to an instant at or before the base.
const MAX_PASSES: usize = 4;

pub(crate) fn to_local<Z: TimeZone>(zone: &Z, at: DateTime<Utc>) -> NaiveDateTime {
    at.with_timezone(zone).naive_local()
}

/// Every UTC instant `local` denotes in `zone`, earliest first.
///
/// A local time inside a gap maps to the first valid minute after it.
pub(crate) fn to_utc<Z: TimeZone>(zone: &Z, local: NaiveDateTime) -> Vec<DateTime<Utc>> {
    match zone.from_local_datetime(&local) {
        LocalResult::Single(at) => vec![at.with_timezone(&Utc)],
        LocalResult::Ambiguous(a, b) => {
            let mut both = vec![a.with_timezone(&Utc), b.with_timezone(&Utc)];
            both.sort();
            both
        }
        LocalResult::None => (1..=GAP_SEARCH_MINUTES)
            .filter_map(|minutes| local.checked_add_signed(Duration::minutes(minutes)))
            .find_map(|shifted| zone.from_local_datetime(&shifted).earliest())
            .map(|at| vec![at.with_timezone(&Utc)])
            .unwrap_or_default(),
    }
}

/// Next occurrence of `expression` after `base`, evaluated in `zone`.
pub(crate) fn next_in<Z: TimeZone>(
    expression: &Expression,
    zone: &Z,
    base: DateTime<Utc>,
    lookahead: Option<DateTime<Utc>>,
    metrics: &mut SearchMetrics,
) -> Option<DateTime<Utc>> {
    series_in(expression, zone, base, 1, lookahead, metrics).into_iter().next()
}

/// Up to `count` consecutive occurrences after `base`, evaluated in `zone`.
///
/// One plan serves the whole series, so `@every` cadence and its pins stay
/// tied to `base` rather than drifting with each clamped hit.
pub(crate) fn series_in<Z: TimeZone>(
    expression: &Expression,
    zone: &Z,
    base: DateTime<Utc>,
    count: usize,
    lookahead: Option<DateTime<Utc>>,
    metrics: &mut SearchMetrics,
) -> Vec<DateTime<Utc>> {
    let started = Instant::now();
    let mut plan = Plan::new(expression.rules(), expression.resolver(), to_local(zone, base));
    let mut found = Vec::with_capacity(count);
    let mut from = base;
    while found.len() < count {
        let Some(next) = search(&mut plan, expression, zone, from, lookahead, metrics) else {
            break;
        };
        found.push(next);
        from = next;
    }
    metrics.total += started.elapsed();
    found
}

fn search<Z: TimeZone>(
    plan: &mut Plan<'_>,
    expression: &Expression,
    zone: &Z,
    base: DateTime<Utc>,
    lookahead: Option<DateTime<Utc>>,
    metrics: &mut SearchMetrics,
) -> Option<DateTime<Utc>> {
    let limit = lookahead.map(|at| to_local(zone, at));
    let mut local_base = to_local(zone, base);

    for _ in 0..MAX_PASSES {
        metrics.passes += 1;
        let local = plan.next(local_base, limit, expression.max_search_iterations(), metrics)?;
        if let Some(hit) = to_utc(zone, local).into_iter().find(|at| *at > base) {
            return match lookahead {
                Some(bound) if hit >= bound => None,
                _ => Some(hit),
            };
        }
        debug!(%local, "local occurrence maps to or before the base instant; searching again");
        local_base = local;
    }
    None
}

/// [`next_in`] with the metrics handed back to the caller.
pub(crate) fn trace_in<Z: TimeZone>(
    expression: &Expression,
    zone: &Z,
    base: DateTime<Utc>,
    lookahead: Option<DateTime<Utc>>,
) -> SearchTrace {
    let mut metrics = SearchMetrics::default();
    let result = next_in(expression, zone, base, lookahead, &mut metrics);
    SearchTrace { base, result, metrics }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use chrono_tz::America::New_York;

    use super::*;

    fn local(y: i32, m: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, 0).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, mi, 0).unwrap()
    }

    #[test]
    fn gap_moves_forward_to_the_first_valid_minute() {
        // 2024-03-10 02:30 does not exist in New York; 03:00 EDT is 07:00 UTC.
        assert_eq!(to_utc(&New_York, local(2024, 3, 10, 2, 30)), vec![utc(2024, 3, 10, 7, 0)]);
    }

    #[test]
    fn fold_yields_both_instants_in_order() {
        // 2024-11-03 01:30 happens twice in New York: EDT then EST.
        assert_eq!(
            to_utc(&New_York, local(2024, 11, 3, 1, 30)),
            vec![utc(2024, 11, 3, 5, 30), utc(2024, 11, 3, 6, 30)]
        );
    }

    #[test]
    fn utc_round_trips() {
        let at = utc(2024, 6, 1, 12, 0);
        assert_eq!(to_utc(&Utc, to_local(&Utc, at)), vec![at]);
    }
}
