//! Error types.
//!
//! Diagnostics fall into four families: lexical (bad token, with position),
//! syntactic (malformed group, prefixed with the group's source text),
//! validation (rule-set level checks) and search (not enough occurrences
//! before the lookahead bound).

use std::fmt;

use crate::TimeUnit;

/// A single parse or validation diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    #[error("{message} '{text}' at line {line}, column {column}")]
    Lexical { text: String, line: usize, column: usize, message: String },

    #[error("{group} - {message}")]
    Syntax { group: String, message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Semantic checks run over a fully parsed rule set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("An expression must contain at least one @every, shorthand (e.g. @daily) or @at/@on/@in rule.")]
    MissingPrimaryRule,

    #[error("Only one @every rule is allowed.")]
    MultipleEvery,

    #[error("At/On/In rules cannot use the same time unit as the @every rule ({0}).")]
    ConflictsWithEvery(TimeUnit),

    #[error("At/On/In rules on the week unit are not allowed when @every is anchored on a weekday.")]
    WeekConflictsWithAnchor,

    #[error("Duplicate At/On/In rules for the same time unit are not allowed.")]
    DuplicateAtRule,

    #[error("@between rules require an @every rule.")]
    BetweenWithoutEvery,

    #[error("Invalid {unit} value '{value}' in @between range.")]
    InvalidBetweenValue { unit: TimeUnit, value: String },

    #[error("@between range start '{start}' must not be after its end '{end}'.")]
    BetweenStartAfterEnd { start: String, end: String },

    #[error("Invalid {unit} value '{value}' in At/On/In rule.")]
    InvalidAtValue { unit: TimeUnit, value: String },

    #[error("Unknown time zone '{0}'.")]
    UnknownTimeZone(String),

    #[error("Only one time zone may be specified.")]
    MultipleTimeZones,

    #[error("Every value cannot be less than or equal to 0.")]
    NonPositiveInterval,

    #[error("Invalid anchor value '{anchor}' for the {unit} unit.")]
    InvalidAnchor { unit: TimeUnit, anchor: String },
}

/// Ordered list of diagnostics produced by one parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseErrors(pub Vec<ExpressionError>);

impl ParseErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExpressionError> {
        self.0.iter()
    }

    /// Diagnostics rendered as plain strings, in order.
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join("\n"))
    }
}

impl std::error::Error for ParseErrors {}

/// Crate-level error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Parse(ParseErrors),

    #[error("No occurrence found before the lookahead bound.")]
    NoOccurrence,

    #[error("Only {found} of {requested} requested occurrences found before the lookahead bound.")]
    OccurrencesExhausted { requested: usize, found: usize },
}

impl From<ParseErrors> for Error {
    fn from(errors: ParseErrors) -> Self {
        Error::Parse(errors)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
