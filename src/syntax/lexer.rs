use std::str::FromStr;

use chrono_tz::Tz;

use super::vocab::{self, ANCHOR_KEYWORDS, AM_PM};
use crate::TimeUnit;

/// Lexical category of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    WholeNumber,
    RuleKeyword,
    AnchorKeyword,
    TimeUnitWord,
    MonthWord,
    WeekdayWord,
    /// Special day and ordinal words: `Last`, `LastDayOfMonth`, `3rdFriday`, `15th`, ...
    OrdinalSuffixWord,
    TimeZoneId,
    AmPm,
    AndKeyword,
    Colon,
    Comma,
    DashOrMinus,
    Plus,
    OpenBracket,
    CloseBracket,
    Whitespace,
    IgnoredPunctuation,
    EndOfInput,
    Unknown,
}

/// A classified slice of the input with its 1-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub start_col: usize,
    /// Column one past the last character.
    pub end_col: usize,
    pub valid: bool,
    pub error: Option<String>,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, line: usize, start_col: usize) -> Self {
        let text = text.into();
        let end_col = start_col + text.chars().count();
        Token { kind, text, line, start_col, end_col, valid: true, error: None }
    }

    fn invalid(mut self, message: impl Into<String>) -> Self {
        self.valid = false;
        self.error = Some(message.into());
        self
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Whitespace and ignored punctuation carry no meaning past grouping.
    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::IgnoredPunctuation | TokenKind::EndOfInput)
    }

    pub fn unit(&self) -> Option<TimeUnit> {
        if self.is(TokenKind::TimeUnitWord) { TimeUnit::from_word(&self.text) } else { None }
    }
}

/// Split `input` into classified tokens.
///
/// Never fails: unrecognised text becomes an invalid [`TokenKind::Unknown`]
/// token and the grouping pass reports it. The last token is always
/// [`TokenKind::EndOfInput`].
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).run()
}

struct Lexer {
    chars: Vec<char>,
    tokens: Vec<Token>,
    acc: String,
    acc_line: usize,
    acc_col: usize,
    line: usize,
    col: usize,
    depth: usize,
    // The word after `@tz` is taken verbatim: zone ids contain `-`, `+` and `/`.
    zone_pending: bool,
}

impl Lexer {
    fn new(input: &str) -> Self {
        let mut chars: Vec<char> = input.chars().collect();
        chars.push('\0');
        Lexer {
            chars,
            tokens: Vec::new(),
            acc: String::new(),
            acc_line: 1,
            acc_col: 1,
            line: 1,
            col: 1,
            depth: 0,
            zone_pending: false,
        }
    }

    fn run(mut self) -> Vec<Token> {
        for i in 0..self.chars.len() {
            let ch = self.chars[i];
            if self.zone_pending && !ch.is_whitespace() && ch != '\0' {
                self.push_char(ch);
            } else if is_breaking(ch) {
                self.flush();
                self.emit_break(ch);
            } else {
                if self.splits_before(i) {
                    self.flush();
                }
                self.push_char(ch);
            }
            if ch == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        self.tokens
    }

    fn push_char(&mut self, ch: char) {
        if self.acc.is_empty() {
            self.acc_line = self.line;
            self.acc_col = self.col;
        }
        self.acc.push(ch);
    }

    /// A digit/letter transition ends the word, unless the digits start an
    /// ordinal compound such as `5th` or `3rdFriday`. Every compound in the
    /// vocabulary starts with its digits, so a letter/digit transition always
    /// splits: `monday5th` is `monday` then `5th`.
    fn splits_before(&self, i: usize) -> bool {
        let Some(prev) = self.acc.chars().last() else {
            return false;
        };
        let ch = self.chars[i];
        if prev.is_ascii_digit() == ch.is_ascii_digit() {
            return false;
        }
        if !prev.is_ascii_digit() {
            return true;
        }
        let letters: String = self.chars[i..].iter().take_while(|c| c.is_alphabetic()).collect();
        !vocab::is_ordinal_compound(&format!("{}{}", self.acc, letters))
    }

    fn flush(&mut self) {
        if self.acc.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.acc);
        let token = if self.zone_pending && !vocab::is_rule_keyword(&text) {
            Token::new(TokenKind::TimeZoneId, text, self.acc_line, self.acc_col)
        } else {
            classify(text, self.acc_line, self.acc_col)
        };
        self.zone_pending = token.is(TokenKind::RuleKeyword) && is_zone_keyword(&token.text);
        self.tokens.push(token);
    }

    fn emit_break(&mut self, ch: char) {
        let (line, col) = (self.line, self.col);
        let token = match ch {
            '\0' => Token::new(TokenKind::EndOfInput, "", line, col),
            c if c.is_whitespace() => {
                if let Some(last) = self.tokens.last_mut().filter(|t| t.is(TokenKind::Whitespace)) {
                    last.text.push(c);
                    last.end_col = col + 1;
                    return;
                }
                Token::new(TokenKind::Whitespace, c.to_string(), line, col)
            }
            ',' => Token::new(TokenKind::Comma, ",", line, col),
            ':' => Token::new(TokenKind::Colon, ":", line, col),
            '-' => Token::new(TokenKind::DashOrMinus, "-", line, col),
            '+' => Token::new(TokenKind::Plus, "+", line, col),
            '[' => {
                self.depth += 1;
                Token::new(TokenKind::OpenBracket, "[", line, col)
            }
            ']' if self.depth == 0 => Token::new(TokenKind::CloseBracket, "]", line, col).invalid("Unmatched"),
            ']' => {
                self.depth -= 1;
                Token::new(TokenKind::CloseBracket, "]", line, col)
            }
            c => Token::new(TokenKind::IgnoredPunctuation, c.to_string(), line, col),
        };
        self.tokens.push(token);
    }
}

fn is_breaking(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '\0' | ',' | ':' | '-' | '+' | '[' | ']' | '.' | ';' | '!' | '?' | '(' | ')')
}

fn is_zone_keyword(text: &str) -> bool {
    let bare = text.strip_prefix('@').unwrap_or(text).to_ascii_lowercase();
    bare == "tz" || bare == "timezone"
}

fn classify(text: String, line: usize, col: usize) -> Token {
    let lower = text.to_ascii_lowercase();
    let kind = if text.chars().all(|c| c.is_ascii_digit()) {
        TokenKind::WholeNumber
    } else if vocab::is_rule_keyword(&text) {
        TokenKind::RuleKeyword
    } else if text.starts_with('@') {
        return Token::new(TokenKind::Unknown, text, line, col).invalid("Unknown rule keyword");
    } else if ANCHOR_KEYWORDS.contains(lower.as_str()) {
        TokenKind::AnchorKeyword
    } else if TimeUnit::from_word(&text).is_some() {
        TokenKind::TimeUnitWord
    } else if vocab::month(&text).is_some() {
        TokenKind::MonthWord
    } else if vocab::weekday(&text).is_some() {
        TokenKind::WeekdayWord
    } else if text.contains('/') && Tz::from_str(&text).is_ok() {
        TokenKind::TimeZoneId
    } else if vocab::OrdinalClass::of(&text).is_some() {
        TokenKind::OrdinalSuffixWord
    } else if AM_PM.contains(lower.as_str()) {
        TokenKind::AmPm
    } else if lower == "and" {
        TokenKind::AndKeyword
    } else {
        return Token::new(TokenKind::Unknown, text, line, col).invalid("Unrecognized token");
    };
    Token::new(kind, text, line, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).into_iter().filter(|t| !t.is_trivia()).map(|t| t.kind).collect()
    }

    fn texts(input: &str) -> Vec<String> {
        tokenize(input).into_iter().filter(|t| !t.is_trivia()).map(|t| t.text).collect()
    }

    #[test]
    fn splits_rule_keywords_numbers_and_units() {
        use TokenKind::*;
        assert_eq!(kinds("@every 2 days"), vec![RuleKeyword, WholeNumber, TimeUnitWord]);
        assert_eq!(kinds("@between 9:00 and 17:30"), vec![
            RuleKeyword,
            WholeNumber,
            Colon,
            WholeNumber,
            AndKeyword,
            WholeNumber,
            Colon,
            WholeNumber
        ]);
    }

    #[test]
    fn digit_letter_boundaries_keep_ordinal_compounds() {
        assert_eq!(texts("@on 15th"), vec!["@on", "15th"]);
        assert_eq!(texts("@on 3rdFriday"), vec!["@on", "3rdFriday"]);
        assert_eq!(texts("@at 10am"), vec!["@at", "10", "am"]);
        assert_eq!(texts("@every 2days"), vec!["@every", "2", "days"]);
        assert_eq!(kinds("@on 2ndLastFriday")[1], TokenKind::OrdinalSuffixWord);
    }

    #[test]
    fn letter_digit_boundaries_always_split() {
        use TokenKind::*;
        assert_eq!(texts("@on monday5th"), vec!["@on", "monday", "5th"]);
        assert_eq!(kinds("@on monday5th"), vec![RuleKeyword, WeekdayWord, OrdinalSuffixWord]);
        assert_eq!(texts("@on Last2ndFriday"), vec!["@on", "Last", "2ndFriday"]);
    }

    #[test]
    fn zone_id_after_tz_keyword_is_taken_verbatim() {
        let tokens: Vec<Token> = tokenize("@daily @tz America/Port-au-Prince").into_iter().filter(|t| !t.is_trivia()).collect();
        assert_eq!(tokens[2].kind, TokenKind::TimeZoneId);
        assert_eq!(tokens[2].text, "America/Port-au-Prince");
    }

    #[test]
    fn whitespace_runs_collapse_into_one_token() {
        let tokens = tokenize("@daily   \t @at 10:00");
        assert_eq!(tokens[1].kind, TokenKind::Whitespace);
        assert_eq!(tokens[1].text, "   \t ");
        assert_eq!(tokens[2].text, "@at");
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::EndOfInput));
    }

    #[test]
    fn unknown_words_are_invalid_with_position() {
        let tokens = tokenize("@daily\n@at 10:00 zz");
        let bad = tokens.iter().find(|t| !t.valid).unwrap();
        assert_eq!(bad.text, "zz");
        assert_eq!((bad.line, bad.start_col, bad.end_col), (2, 11, 13));
        assert_eq!(bad.error.as_deref(), Some("Unrecognized token"));
    }

    #[test]
    fn unmatched_close_bracket_is_invalid() {
        let tokens = tokenize("@at hour 10]");
        assert!(tokens.iter().any(|t| t.is(TokenKind::CloseBracket) && !t.valid));
        let balanced = tokenize("@at hour [10, 11]");
        assert!(balanced.iter().all(|t| t.valid));
    }

    #[test]
    fn special_day_words_and_names() {
        use TokenKind::*;
        assert_eq!(kinds("@on LastDayOfTheMonth"), vec![RuleKeyword, OrdinalSuffixWord]);
        assert_eq!(kinds("@on day Last-3"), vec![RuleKeyword, TimeUnitWord, OrdinalSuffixWord, DashOrMinus, WholeNumber]);
        assert_eq!(kinds("@on monday @in March"), vec![RuleKeyword, WeekdayWord, RuleKeyword, MonthWord]);
        assert_eq!(kinds("@every monday AnchoredOn 3"), vec![RuleKeyword, WeekdayWord, AnchorKeyword, WholeNumber]);
    }
}
