use super::lexer::{Token, TokenKind};
use crate::TimeUnit;
use crate::error::ExpressionError;

/// Which parse strategy handles a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GroupKind {
    Shorthand(TimeUnit),
    Every,
    AtInOn,
    Between,
    Upto,
    From,
    TimeZone,
}

impl GroupKind {
    pub(crate) fn from_keyword(word: &str) -> Option<GroupKind> {
        let bare = word.strip_prefix('@').unwrap_or(word).to_ascii_lowercase();
        let kind = match bare.as_str() {
            "yearly" => GroupKind::Shorthand(TimeUnit::Year),
            "monthly" => GroupKind::Shorthand(TimeUnit::Month),
            "weekly" => GroupKind::Shorthand(TimeUnit::Week),
            "daily" => GroupKind::Shorthand(TimeUnit::Day),
            "hourly" => GroupKind::Shorthand(TimeUnit::Hour),
            "minutely" => GroupKind::Shorthand(TimeUnit::Minute),
            "secondly" => GroupKind::Shorthand(TimeUnit::Second),
            "every" => GroupKind::Every,
            "at" | "on" | "in" => GroupKind::AtInOn,
            "between" => GroupKind::Between,
            "upto" => GroupKind::Upto,
            "from" => GroupKind::From,
            "tz" | "timezone" => GroupKind::TimeZone,
            _ => return None,
        };
        Some(kind)
    }
}

/// A starter keyword and the tokens that follow it up to the next starter.
#[derive(Debug, Clone)]
pub(crate) struct Group<'t> {
    pub kind: GroupKind,
    pub tokens: &'t [Token],
}

impl<'t> Group<'t> {
    /// Tokens after the starter keyword.
    pub fn body(&self) -> &'t [Token] {
        self.tokens.get(1..).unwrap_or_default()
    }

    /// Source text of the group, trimmed.
    pub fn text(&self) -> String {
        source_text(self.tokens)
    }

    pub fn invalid_tokens(&self) -> impl Iterator<Item = &'t Token> {
        self.tokens.iter().filter(|t| !t.valid)
    }
}

pub(crate) fn lexical_error(token: &Token) -> ExpressionError {
    ExpressionError::Lexical {
        text: token.text.clone(),
        line: token.line,
        column: token.start_col,
        message: token.error.clone().unwrap_or_else(|| "Invalid token".to_string()),
    }
}

pub(crate) fn source_text(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect::<String>().trim().to_string()
}

/// Split a token stream into groups, one per starter keyword.
///
/// Anything before the first starter is reported as a syntax error.
pub(crate) fn group(tokens: &[Token]) -> (Vec<Group<'_>>, Vec<ExpressionError>) {
    let end = tokens.iter().position(|t| t.is(TokenKind::EndOfInput)).unwrap_or(tokens.len());
    let tokens = &tokens[..end];
    let starts: Vec<(usize, GroupKind)> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is(TokenKind::RuleKeyword))
        .filter_map(|(i, t)| GroupKind::from_keyword(&t.text).map(|kind| (i, kind)))
        .collect();

    let mut errors = Vec::new();
    let lead_end = starts.first().map_or(tokens.len(), |(i, _)| *i);
    let lead = &tokens[..lead_end];
    if lead.iter().any(|t| !t.valid) {
        errors.extend(lead.iter().filter(|t| !t.valid).map(lexical_error));
    } else if lead.iter().any(|t| !t.is_trivia()) {
        errors.push(ExpressionError::Syntax {
            group: source_text(lead),
            message: "Expected a rule keyword such as @every, @at or @between".to_string(),
        });
    }

    let groups = starts
        .iter()
        .enumerate()
        .map(|(n, (start, kind))| {
            let stop = starts.get(n + 1).map_or(tokens.len(), |(next, _)| *next);
            Group { kind: *kind, tokens: &tokens[*start..stop] }
        })
        .collect();
    (groups, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::tokenize;

    #[test]
    fn each_starter_opens_a_group() {
        let tokens = tokenize("@every 2 days @at 10:00 @tz Europe/Paris");
        let (groups, errors) = group(&tokens);
        assert!(errors.is_empty());
        let kinds: Vec<GroupKind> = groups.iter().map(|g| g.kind).collect();
        assert_eq!(kinds, vec![GroupKind::Every, GroupKind::AtInOn, GroupKind::TimeZone]);
        assert_eq!(groups[1].text(), "@at 10:00");
    }

    #[test]
    fn keywords_work_without_at_sign() {
        let tokens = tokenize("daily at 14:00");
        let (groups, _) = group(&tokens);
        assert_eq!(groups[0].kind, GroupKind::Shorthand(TimeUnit::Day));
        assert_eq!(groups[1].kind, GroupKind::AtInOn);
    }

    #[test]
    fn leading_tokens_without_keyword_are_an_error() {
        let tokens = tokenize("2 days @daily");
        let (groups, errors) = group(&tokens);
        assert_eq!(groups.len(), 1);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().starts_with("2 days - "));
    }
}
