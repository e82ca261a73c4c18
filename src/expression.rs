//! Validated expressions and their occurrence queries.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::engine::{Resolver, SearchMetrics, SearchTrace, zone};
use crate::error::{Error, Result};
use crate::rule::{EveryRule, Rule};
use crate::TimeUnit;

/// A parsed and validated recurrence expression.
///
/// Expressions are immutable. Search state lives in the query, so one
/// expression can be queried from several threads at once.
#[derive(Debug, Clone)]
pub struct Expression {
    text: String,
    rules: Vec<Rule>,
    time_zone: Option<Tz>,
    resolver: Resolver,
    max_search_iterations: usize,
}

impl Expression {
    pub(crate) fn new(
        text: &str,
        rules: Vec<Rule>,
        time_zone: Option<Tz>,
        resolver: Resolver,
        max_search_iterations: usize,
    ) -> Self {
        Expression { text: text.to_string(), rules, time_zone, resolver, max_search_iterations }
    }

    /// The raw text this expression was parsed from.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rules filed under `unit`, in source order.
    pub fn rules_for_unit(&self, unit: TimeUnit) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |rule| rule.unit() == unit)
    }

    pub fn every(&self) -> Option<&EveryRule> {
        self.rules.iter().find_map(|rule| match rule {
            Rule::Every(every) => Some(every),
            _ => None,
        })
    }

    /// Zone named by the `@tz` rule, if any.
    pub fn time_zone(&self) -> Option<Tz> {
        self.time_zone
    }

    pub(crate) fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub(crate) fn max_search_iterations(&self) -> usize {
        self.max_search_iterations
    }

    /// First occurrence strictly after `base` and strictly before
    /// `lookahead`. Without a `@tz` rule the expression is evaluated in UTC.
    pub fn next_occurrence(&self, base: DateTime<Utc>, lookahead: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        self.next_occurrence_in(&Utc, base, lookahead)
    }

    /// Like [`next_occurrence`](Self::next_occurrence), evaluating in `zone`
    /// unless the expression names its own.
    pub fn next_occurrence_in<Z: TimeZone>(
        &self,
        zone: &Z,
        base: DateTime<Utc>,
        lookahead: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        self.next_occurrences_in(zone, base, 1, lookahead).into_iter().next()
    }

    /// Up to `count` consecutive occurrences after `base`. The list is
    /// shorter when the lookahead bound cuts the series off.
    pub fn next_occurrences(
        &self,
        base: DateTime<Utc>,
        count: usize,
        lookahead: Option<DateTime<Utc>>,
    ) -> Vec<DateTime<Utc>> {
        self.next_occurrences_in(&Utc, base, count, lookahead)
    }

    pub fn next_occurrences_in<Z: TimeZone>(
        &self,
        zone: &Z,
        base: DateTime<Utc>,
        count: usize,
        lookahead: Option<DateTime<Utc>>,
    ) -> Vec<DateTime<Utc>> {
        let mut metrics = SearchMetrics::default();
        match &self.time_zone {
            Some(own) => zone::series_in(self, own, base, count, lookahead, &mut metrics),
            None => zone::series_in(self, zone, base, count, lookahead, &mut metrics),
        }
    }

    /// Zone-local form of [`next_occurrence`](Self::next_occurrence): `base`,
    /// `lookahead` and the result all carry `base`'s zone, which is also the
    /// evaluation zone when the expression has no `@tz` rule.
    pub fn next_occurrence_local<Z: TimeZone>(
        &self,
        base: DateTime<Z>,
        lookahead: Option<DateTime<Z>>,
    ) -> Option<DateTime<Z>> {
        self.next_occurrences_local(base, 1, lookahead).into_iter().next()
    }

    pub fn next_occurrences_local<Z: TimeZone>(
        &self,
        base: DateTime<Z>,
        count: usize,
        lookahead: Option<DateTime<Z>>,
    ) -> Vec<DateTime<Z>> {
        let zone = base.timezone();
        let lookahead = lookahead.map(|at| at.with_timezone(&Utc));
        self.next_occurrences_in(&zone, base.with_timezone(&Utc), count, lookahead)
            .into_iter()
            .map(|at| at.with_timezone(&zone))
            .collect()
    }

    pub fn must_next_occurrence_local<Z: TimeZone>(
        &self,
        base: DateTime<Z>,
        lookahead: Option<DateTime<Z>>,
    ) -> Result<DateTime<Z>> {
        self.next_occurrence_local(base, lookahead).ok_or(Error::NoOccurrence)
    }

    pub fn must_next_occurrences_local<Z: TimeZone>(
        &self,
        base: DateTime<Z>,
        count: usize,
        lookahead: Option<DateTime<Z>>,
    ) -> Result<Vec<DateTime<Z>>> {
        let found = self.next_occurrences_local(base, count, lookahead);
        if found.len() < count {
            return Err(Error::OccurrencesExhausted { requested: count, found: found.len() });
        }
        Ok(found)
    }

    /// [`next_occurrence`](Self::next_occurrence), failing instead of
    /// returning `None`.
    pub fn must_next_occurrence(&self, base: DateTime<Utc>, lookahead: Option<DateTime<Utc>>) -> Result<DateTime<Utc>> {
        self.next_occurrence(base, lookahead).ok_or(Error::NoOccurrence)
    }

    /// [`next_occurrences`](Self::next_occurrences), failing when fewer than
    /// `count` occurrences exist before the bound.
    pub fn must_next_occurrences(
        &self,
        base: DateTime<Utc>,
        count: usize,
        lookahead: Option<DateTime<Utc>>,
    ) -> Result<Vec<DateTime<Utc>>> {
        let found = self.next_occurrences(base, count, lookahead);
        if found.len() < count {
            return Err(Error::OccurrencesExhausted { requested: count, found: found.len() });
        }
        Ok(found)
    }

    /// [`next_occurrence`](Self::next_occurrence) with search metrics.
    pub fn trace_next_occurrence(&self, base: DateTime<Utc>, lookahead: Option<DateTime<Utc>>) -> SearchTrace {
        match &self.time_zone {
            Some(own) => zone::trace_in(self, own, base, lookahead),
            None => zone::trace_in(self, &Utc, base, lookahead),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
