//! Recurrence expressions.
//!
//! `everywhen` parses small recurrence languages such as
//! `@every 2 days @at 09:30 @tz Europe/Berlin` or
//! `@monthly @on 3rdFriday @between 09:00 and 17:00` and computes their future
//! occurrences.
//!
//! ```
//! use chrono::{TimeZone, Utc};
//!
//! let expr = everywhen::parse("@every 2 hours AnchoredOn 1 @at minute 15").unwrap();
//! let base = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
//! let next = expr.next_occurrences(base, 2, None);
//! assert_eq!(next[0], Utc.with_ymd_and_hms(2024, 1, 1, 9, 15, 0).unwrap());
//! assert_eq!(next[1], Utc.with_ymd_and_hms(2024, 1, 1, 11, 15, 0).unwrap());
//! ```
//!
//! Parsing never stops at the first problem: [`try_parse`] returns every
//! lexical, syntax and validation error it finds, and [`parse`] joins them
//! into one [`Error`].

#[macro_use]
mod macros;
mod api;
mod calendar;
mod engine;
mod error;
mod expression;
mod rule;
mod syntax;
mod time_unit;


pub use api::{DEFAULT_MAX_SEARCH_ITERATIONS, Options, ParseResult, parse, parse_with, try_parse, try_parse_with};
pub use engine::{
    CacheConfig, CacheKey, NoCache, Resolution, Resolver, ResolverCache, SearchMetrics, SearchTrace, SweepingCache,
    TRACE_LIMIT, global_cache, resolve,
};
pub use error::{Error, ExpressionError, ParseErrors, Result, ValidationError};
pub use expression::Expression;
pub use rule::{AtMultiplesRule, AtRule, BetweenMultiplesRule, BetweenRule, EveryRule, Rule, TimeZoneRule};
pub use syntax::{Token, TokenKind, tokenize};
pub use time_unit::{TimeUnit, UnitSet};
