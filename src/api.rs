use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono_tz::Tz;
use tracing::debug;

use crate::engine::{self, Resolver, ResolverCache};
use crate::error::{Error, ExpressionError, ParseErrors, Result};
use crate::expression::Expression;
use crate::rule::Rule;
use crate::syntax;

/// Default ceiling on search iterations per occurrence.
pub const DEFAULT_MAX_SEARCH_ITERATIONS: usize = 1_000_000;

/// Options that affect parsing and searching.
#[derive(Debug, Clone)]
pub struct Options {
    /// Resolver cache shared by expressions parsed with these options.
    pub cache: Arc<dyn ResolverCache>,
    /// Hard ceiling on candidates examined per search.
    pub max_search_iterations: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options { cache: engine::global_cache(), max_search_iterations: DEFAULT_MAX_SEARCH_ITERATIONS }
    }
}

/// Result from [`try_parse`] and [`try_parse_with`].
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// The parsed input text.
    pub text: String,
    /// The expression, present exactly when `errors` is empty.
    pub expression: Option<Expression>,
    /// Every lexical, syntax and validation problem found, in order.
    pub errors: ParseErrors,
    /// Total elapsed time spent lexing, parsing and validating.
    pub elapsed: Duration,
}

impl ParseResult {
    pub fn is_ok(&self) -> bool {
        self.expression.is_some()
    }

    pub fn into_result(self) -> Result<Expression> {
        self.expression.ok_or(Error::Parse(self.errors))
    }
}

/// Parse `text` with default [`Options`], failing on any error.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use everywhen::parse;
///
/// let expr = parse("@daily @at 14:00").unwrap();
/// let base = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
/// let next = expr.next_occurrence(base, None);
/// assert_eq!(next, Some(Utc.with_ymd_and_hms(2024, 1, 1, 14, 0, 0).unwrap()));
/// ```
pub fn parse(text: &str) -> Result<Expression> {
    parse_with(text, &Options::default())
}

/// Parse `text` with the provided `options`, failing on any error. The error
/// message lists every problem, one per line.
pub fn parse_with(text: &str, options: &Options) -> Result<Expression> {
    try_parse_with(text, options).into_result()
}

/// Parse `text` with default [`Options`], collecting errors instead of
/// failing.
pub fn try_parse(text: &str) -> ParseResult {
    try_parse_with(text, &Options::default())
}

pub fn try_parse_with(text: &str, options: &Options) -> ParseResult {
    let started = Instant::now();
    let (rules, mut errors) = syntax::parse_rules(text);
    let resolver = Resolver::new(options.cache.clone());

    let expression = if errors.is_empty() {
        match engine::validate(&rules, &resolver) {
            Ok(()) => {
                let time_zone = zone_of(&rules);
                Some(Expression::new(text, rules, time_zone, resolver, options.max_search_iterations))
            }
            Err(err) => {
                debug!(%text, error = %err, "expression failed validation");
                errors.push(ExpressionError::Validation(err));
                None
            }
        }
    } else {
        debug!(%text, errors = errors.len(), "expression failed to parse");
        None
    };

    ParseResult { text: text.to_string(), expression, errors: ParseErrors(errors), elapsed: started.elapsed() }
}

/// Zone named by the `@tz` rule. Validation has already rejected unknown ids.
fn zone_of(rules: &[Rule]) -> Option<Tz> {
    rules.iter().find_map(|rule| match rule {
        Rule::TimeZone(tz) => Tz::from_str(&tz.id).ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NoCache;
    use crate::error::ValidationError;

    #[test]
    fn try_parse_returns_expression_and_no_errors() {
        let res = try_parse("@every 2 days @at 09:30 @tz Europe/Berlin");

        assert_eq!(res.text, "@every 2 days @at 09:30 @tz Europe/Berlin");
        assert!(res.errors.is_empty());
        let expr = res.expression.unwrap();
        assert_eq!(expr.time_zone(), Some(chrono_tz::Europe::Berlin));
        assert_eq!(expr.every().map(|e| e.interval), Some(2));
        assert_eq!(expr.to_string(), "@every 2 days @at 09:30 @tz Europe/Berlin");
    }

    #[test]
    fn try_parse_collects_every_error() {
        let res = try_parse("@every 2 zz @between 9:00");

        assert!(!res.is_ok());
        assert_eq!(res.errors.len(), 2);
    }

    #[test]
    fn validation_runs_only_after_a_clean_parse() {
        let res = try_parse("@at 10:00 @at 11:00");
        assert_eq!(res.errors.0, vec![ExpressionError::Validation(ValidationError::DuplicateAtRule)]);
    }

    #[test]
    fn parse_error_message_joins_all_problems() {
        let err = parse("@every 2 zz @between 9:00").unwrap_err();
        let message = err.to_string();
        assert_eq!(message.lines().count(), 2);
        assert!(message.starts_with("Unrecognized token 'zz'"));
    }

    #[test]
    fn options_carry_the_cache() {
        let options = Options { cache: Arc::new(NoCache), ..Options::default() };
        let expr = parse_with("@hourly", &options).unwrap();
        assert!(expr.resolver().cache().is_empty());
        assert_eq!(expr.max_search_iterations(), DEFAULT_MAX_SEARCH_ITERATIONS);
    }
}
