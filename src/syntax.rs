//! Text to rules.
//!
//! Parsing runs in three passes over an immutable token list:
//!
//! 1. `lexer.rs` classifies characters into tokens, marking bad ones invalid
//!    instead of failing.
//! 2. `grouping.rs` folds the tokens into groups, each opened by a rule
//!    keyword (`@every`, `@at`, `@between`, ...).
//! 3. `strategies.rs` parses each group on its own, sharing the composite
//!    value parser in `values.rs` for clock times, dates and special days.
//!
//! Errors are collected rather than returned early so one parse reports
//! every problem. A group holding an invalid token is skipped after its
//! lexical errors are recorded.
//!
//! `format.rs` goes the other way and renders rules as canonical text.

#[path = "syntax/format.rs"]
pub(crate) mod format;
#[path = "syntax/grouping.rs"]
mod grouping;
#[path = "syntax/lexer.rs"]
mod lexer;
#[path = "syntax/strategies.rs"]
mod strategies;
#[path = "syntax/values.rs"]
mod values;
#[path = "syntax/vocab.rs"]
pub(crate) mod vocab;

pub use lexer::{Token, TokenKind, tokenize};

use crate::error::ExpressionError;
use crate::rule::Rule;

/// Lex, group and parse `text`. Validation is not run here.
pub(crate) fn parse_rules(text: &str) -> (Vec<Rule>, Vec<ExpressionError>) {
    let tokens = tokenize(text);
    let (groups, mut errors) = grouping::group(&tokens);
    let mut rules = Vec::new();

    for group in &groups {
        let invalid: Vec<&Token> = group.invalid_tokens().collect();
        if !invalid.is_empty() {
            tracing::debug!(group = %group.text(), count = invalid.len(), "skipping group with invalid tokens");
            errors.extend(invalid.into_iter().map(grouping::lexical_error));
            continue;
        }
        match strategies::parse_group(group) {
            Ok(parsed) => rules.extend(parsed),
            Err(message) => {
                tracing::debug!(group = %group.text(), %message, "group rejected");
                errors.push(ExpressionError::Syntax { group: group.text(), message });
            }
        }
    }

    tracing::trace!(groups = groups.len(), rules = rules.len(), errors = errors.len(), "parsed expression");
    (rules, errors)
}
