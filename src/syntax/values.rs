//! Composite value parser shared by the `@at`, `@between`, `@upto` and
//! `@from` strategies.
//!
//! The mix of token kinds in a run picks the format:
//!
//! | run contains                 | format        | pairs                         |
//! |------------------------------|---------------|-------------------------------|
//! | colon or am/pm, no date dash | clock         | Hour, Minute, [Second]        |
//! | date dash, no colon          | date          | [Year], Month, [Day]          |
//! | both                         | date and time | date pairs then clock pairs   |
//! | special day word and a colon | day and time  | Day, [Month], [Year], clock   |
//! | special day word only        | special day   | Day (or the unit for `Last`)  |
//! | anything else                | single value  | one pair                      |
//!
//! A dash right after `Last`/`First` and before a number is an offset
//! (`Last-3`), not a date separator.

use super::lexer::{Token, TokenKind};
use super::vocab::OrdinalClass;
use crate::TimeUnit;

pub(crate) type Pairs = Vec<(TimeUnit, String)>;

pub(crate) fn parse_values(tokens: &[Token], default: Option<TimeUnit>) -> Result<Pairs, String> {
    let tokens = trim(tokens);
    let sig = significant(tokens);
    if sig.is_empty() {
        return Err("A value is required".to_string());
    }
    let timed = sig.iter().any(|t| t.is(TokenKind::Colon) || t.is(TokenKind::AmPm));
    let dated = date_dashes(&sig) > 0;
    let special = sig.iter().any(|t| t.is(TokenKind::OrdinalSuffixWord));
    match (timed, dated) {
        (true, true) => date_time(tokens),
        (true, false) if special => day_time(tokens),
        (true, false) => clock(tokens),
        (false, true) => date(tokens),
        (false, false) if special => special_day(tokens, default),
        (false, false) => single(tokens, default),
    }
}

/// Tokens joined back into a value string, without whitespace around
/// offsets: `Last - 3` becomes `Last-3`, `ClosestWeekdayTo 15` keeps its space.
pub(crate) fn join(tokens: &[Token]) -> String {
    join_refs(&significant(tokens))
}

fn join_refs(tokens: &[&Token]) -> String {
    let glued = |t: &Token| matches!(t.kind, TokenKind::Plus | TokenKind::DashOrMinus | TokenKind::Colon);
    let mut out = String::new();
    let mut prev: Option<&Token> = None;
    for &token in tokens {
        if prev.is_some_and(|p| !glued(p) && !glued(token)) {
            out.push(' ');
        }
        out.push_str(&token.text);
        prev = Some(token);
    }
    out
}

fn trim(tokens: &[Token]) -> &[Token] {
    let start = tokens.iter().position(|t| !t.is_trivia()).unwrap_or(tokens.len());
    let end = tokens.iter().rposition(|t| !t.is_trivia()).map_or(start, |i| i + 1);
    &tokens[start..end]
}

fn significant(tokens: &[Token]) -> Vec<&Token> {
    tokens.iter().filter(|t| !t.is_trivia()).collect()
}

fn is_offset_dash(sig: &[&Token], i: usize) -> bool {
    let after_edge = i
        .checked_sub(1)
        .and_then(|p| sig.get(p))
        .and_then(|t| OrdinalClass::of(&t.text).filter(|_| t.is(TokenKind::OrdinalSuffixWord)))
        .is_some_and(OrdinalClass::takes_offset);
    after_edge && sig.get(i + 1).is_some_and(|t| t.is(TokenKind::WholeNumber))
}

fn date_dashes(sig: &[&Token]) -> usize {
    (0..sig.len()).filter(|&i| sig[i].is(TokenKind::DashOrMinus) && !is_offset_dash(sig, i)).count()
}

fn number(text: &str) -> String {
    let trimmed = text.trim_start_matches('0');
    if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() }
}

/// Half-open token index ranges of whitespace-separated runs.
fn runs(tokens: &[Token]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, token) in tokens.iter().enumerate() {
        match (token.is(TokenKind::Whitespace), start) {
            (true, Some(s)) => {
                out.push((s, i));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, tokens.len()));
    }
    out
}

fn reject_unit_word(sig: &[&Token], format: &str) -> Result<(), String> {
    match sig.iter().find(|t| t.is(TokenKind::TimeUnitWord)) {
        Some(word) => Err(format!("Time unit '{}' cannot be combined with a {format}", word.text)),
        None => Ok(()),
    }
}

/// A special day word with its argument or offset, normalised.
fn special_value(sig: &[&Token]) -> Option<(OrdinalClass, String)> {
    let (head, rest) = sig.split_first()?;
    if !head.is(TokenKind::OrdinalSuffixWord) {
        return None;
    }
    let class = OrdinalClass::of(&head.text)?;
    let value = match (class, rest) {
        (OrdinalClass::OrdinalDay, []) => number(head.text.trim_end_matches(char::is_alphabetic)),
        (OrdinalClass::ClosestWeekday, [n]) if n.is(TokenKind::WholeNumber) => {
            format!("{} {}", head.text, number(&n.text))
        }
        (OrdinalClass::ClosestWeekday, _) => return None,
        (_, []) => head.text.clone(),
        (class, [sign, n])
            if class.takes_offset()
                && matches!(sign.kind, TokenKind::Plus | TokenKind::DashOrMinus)
                && n.is(TokenKind::WholeNumber) =>
        {
            format!("{}{}{}", head.text, sign.text, number(&n.text))
        }
        _ => return None,
    };
    Some((class, value))
}

fn clock(tokens: &[Token]) -> Result<Pairs, String> {
    let tokens = trim(tokens);
    for (i, token) in tokens.iter().enumerate() {
        let spaced = |j: Option<usize>| j.and_then(|j| tokens.get(j)).is_some_and(|t| t.is(TokenKind::Whitespace));
        if token.is(TokenKind::Colon) && (spaced(i.checked_sub(1)) || spaced(Some(i + 1))) {
            return Err(format!("Unexpected whitespace around ':' in '{}'", join(tokens)));
        }
    }
    let sig = significant(tokens);
    reject_unit_word(&sig, "clock time")?;
    let (sig, meridiem) = match sig.split_last() {
        Some((last, rest)) if last.is(TokenKind::AmPm) => (rest, Some(last.text.to_ascii_lowercase())),
        _ => (sig.as_slice(), None),
    };

    let mut fields = Vec::with_capacity(3);
    for (i, token) in sig.iter().enumerate() {
        let expected = if i % 2 == 0 { TokenKind::WholeNumber } else { TokenKind::Colon };
        if !token.is(expected) {
            return Err(format!("Unexpected '{}' in clock time '{}'", token.text, join(tokens)));
        }
        if expected == TokenKind::WholeNumber {
            fields.push(token.text.as_str());
        }
    }
    if sig.len() % 2 == 0 {
        return Err(format!("Missing value after ':' in '{}'", join(tokens)));
    }
    if fields.len() > 3 {
        return Err(format!("A clock time may contain at most two colons: '{}'", join(tokens)));
    }

    let mut hour = number(fields[0]);
    if let Some(meridiem) = meridiem {
        let h: u32 = hour.parse().map_err(|_| format!("Invalid hour '{hour}'"))?;
        if !(1..=12).contains(&h) {
            return Err(format!("Hour '{h}' must be between 1 and 12 when AM/PM is given"));
        }
        let h = match (meridiem.as_str(), h) {
            ("am", 12) => 0,
            ("pm", 12) => 12,
            ("pm", h) => h + 12,
            (_, h) => h,
        };
        hour = h.to_string();
    }

    let mut pairs = vec![(TimeUnit::Hour, hour)];
    let units = [TimeUnit::Minute, TimeUnit::Second];
    pairs.extend(fields[1..].iter().zip(units).map(|(value, unit)| (unit, number(value))));
    Ok(pairs)
}

fn date(tokens: &[Token]) -> Result<Pairs, String> {
    let tokens = trim(tokens);
    if tokens.iter().any(|t| t.is(TokenKind::Whitespace)) {
        return Err(format!("Unexpected whitespace in date '{}'", join(tokens)));
    }
    let sig = significant(tokens);
    reject_unit_word(&sig, "date")?;

    let mut fields: Vec<Vec<&Token>> = vec![Vec::new()];
    for (i, token) in sig.iter().enumerate() {
        if token.is(TokenKind::DashOrMinus) && !is_offset_dash(&sig, i) {
            fields.push(Vec::new());
        } else if let Some(field) = fields.last_mut() {
            field.push(*token);
        }
    }
    if fields.len() > 3 {
        return Err(format!("A date may contain at most two dashes: '{}'", join(tokens)));
    }
    if fields.iter().any(Vec::is_empty) {
        return Err(format!("Missing value around '-' in '{}'", join(tokens)));
    }

    let leading_year = matches!(fields[0].as_slice(), [t] if t.is(TokenKind::WholeNumber) && t.text.len() == 4);
    let units: &[TimeUnit] = if leading_year {
        &[TimeUnit::Year, TimeUnit::Month, TimeUnit::Day]
    } else {
        &[TimeUnit::Month, TimeUnit::Day]
    };
    if fields.len() > units.len() {
        return Err(format!("A date without a year may only contain a month and a day: '{}'", join(tokens)));
    }
    fields.iter().zip(units).map(|(field, unit)| date_field(*unit, field).map(|value| (*unit, value))).collect()
}

fn date_field(unit: TimeUnit, field: &[&Token]) -> Result<String, String> {
    let invalid = || format!("Invalid {unit} value '{}' in date", join_refs(field));
    match (unit, field) {
        (_, [t]) if t.is(TokenKind::WholeNumber) => Ok(number(&t.text)),
        (TimeUnit::Month, [t]) if t.is(TokenKind::MonthWord) => Ok(t.text.clone()),
        (TimeUnit::Month, _) => match special_value(field) {
            Some((OrdinalClass::Edge, value)) => Ok(value),
            _ => Err(invalid()),
        },
        (TimeUnit::Day, _) => match special_value(field) {
            Some((class, value)) if class != OrdinalClass::ClosestWeekday => Ok(value),
            _ => Err(invalid()),
        },
        _ => Err(invalid()),
    }
}

/// Run indexes `(first, last)` holding the clock time. A bare hour run
/// directly before a lone AM/PM run belongs to the time.
fn time_span(tokens: &[Token], runs: &[(usize, usize)]) -> Option<(usize, usize)> {
    let sig_of = |i: usize| significant(&tokens[runs[i].0..runs[i].1]);
    let timed = |i: usize| sig_of(i).iter().any(|t| t.is(TokenKind::Colon) || t.is(TokenKind::AmPm));
    let lone = |i: usize, kind: TokenKind| matches!(sig_of(i).as_slice(), [t] if t.is(kind));
    let mut first = (0..runs.len()).find(|&i| timed(i))?;
    if first > 0 && lone(first, TokenKind::AmPm) && lone(first - 1, TokenKind::WholeNumber) {
        first -= 1;
    }
    let mut last = first;
    while last + 1 < runs.len() && timed(last + 1) {
        last += 1;
    }
    Some((first, last))
}

fn date_time(tokens: &[Token]) -> Result<Pairs, String> {
    let tokens = trim(tokens);
    let has_dash = |run: &[Token]| date_dashes(&significant(run)) > 0;
    let runs = runs(tokens);
    let date_runs: Vec<usize> = (0..runs.len()).filter(|&i| has_dash(&tokens[runs[i].0..runs[i].1])).collect();
    let [date_run] = date_runs.as_slice() else {
        return Err(format!("Unexpected whitespace in date '{}'", join(tokens)));
    };
    let (date_start, date_end) = runs[*date_run];
    let time = if *date_run == 0 {
        runs.get(1).map(|&(s, _)| &tokens[s..])
    } else if *date_run == runs.len() - 1 {
        Some(&tokens[..runs[date_run - 1].1])
    } else {
        None
    };
    let time = time.ok_or_else(|| format!("Expected a date and a time separated by a space in '{}'", join(tokens)))?;
    let mut pairs = date(&tokens[date_start..date_end])?;
    pairs.extend(clock(time)?);
    Ok(pairs)
}

fn day_time(tokens: &[Token]) -> Result<Pairs, String> {
    let tokens = trim(tokens);
    let runs = runs(tokens);
    let (first, last) =
        time_span(tokens, &runs).ok_or_else(|| format!("Missing clock time in '{}'", join(tokens)))?;
    let time_pairs = clock(&tokens[runs[first].0..runs[last].1])?;

    let mut day = None;
    let mut month = None;
    let mut year = None;
    let date_runs: Vec<Vec<&Token>> = runs
        .iter()
        .enumerate()
        .filter(|(i, _)| *i < first || *i > last)
        .map(|(_, &(s, e))| significant(&tokens[s..e]))
        .collect();
    let mut iter = date_runs.iter().peekable();
    while let Some(run) = iter.next() {
        let (unit, value) = match run.as_slice() {
            [t] if t.is(TokenKind::MonthWord) => (TimeUnit::Month, t.text.clone()),
            [t] if t.is(TokenKind::WholeNumber) && t.text.len() == 4 => (TimeUnit::Year, t.text.clone()),
            [t] if OrdinalClass::of(&t.text) == Some(OrdinalClass::ClosestWeekday) => {
                let arg = iter.next_if(|next| matches!(next.as_slice(), [n] if n.is(TokenKind::WholeNumber)));
                let mut joined = run.clone();
                joined.extend(arg.into_iter().flatten());
                let (_, value) =
                    special_value(&joined).ok_or_else(|| format!("Missing day number after '{}'", t.text))?;
                (TimeUnit::Day, value)
            }
            _ => {
                reject_unit_word(run, "clock time")?;
                let (_, value) = special_value(run)
                    .ok_or_else(|| format!("Unexpected '{}' in day and time value", join_refs(run)))?;
                (TimeUnit::Day, value)
            }
        };
        let slot = match unit {
            TimeUnit::Day => &mut day,
            TimeUnit::Month => &mut month,
            _ => &mut year,
        };
        if slot.replace(value).is_some() {
            return Err(format!("Duplicate {unit} in '{}'", join(tokens)));
        }
    }

    let day = day.ok_or_else(|| format!("Missing day in '{}'", join(tokens)))?;
    let mut pairs = vec![(TimeUnit::Day, day)];
    pairs.extend(month.map(|m| (TimeUnit::Month, m)));
    pairs.extend(year.map(|y| (TimeUnit::Year, y)));
    pairs.extend(time_pairs);
    Ok(pairs)
}

fn explicit_unit<'a>(sig: &[&'a Token]) -> Result<(Option<TimeUnit>, Vec<&'a Token>), String> {
    let (words, rest): (Vec<&'a Token>, Vec<&'a Token>) =
        sig.iter().copied().partition(|t| t.is(TokenKind::TimeUnitWord));
    match words.as_slice() {
        [] => Ok((None, rest)),
        [word] => Ok((word.unit(), rest)),
        [_, extra, ..] => Err(format!("Unexpected time unit '{}'", extra.text)),
    }
}

fn special_day(tokens: &[Token], default: Option<TimeUnit>) -> Result<Pairs, String> {
    let (explicit, rest) = explicit_unit(&significant(tokens))?;
    let (class, value) =
        special_value(&rest).ok_or_else(|| format!("Invalid value '{}'", join_refs(&rest)))?;
    let unit = match (explicit.or(default), class) {
        (Some(unit), OrdinalClass::Edge) => unit,
        (None, _) | (Some(TimeUnit::Day), _) => TimeUnit::Day,
        (Some(_), _) => return Err(format!("'{value}' can only be used with the day unit")),
    };
    Ok(vec![(unit, value)])
}

fn single(tokens: &[Token], default: Option<TimeUnit>) -> Result<Pairs, String> {
    let (explicit, rest) = explicit_unit(&significant(tokens))?;
    let value = match rest.as_slice() {
        [value] => *value,
        [] => {
            let unit = explicit.map_or_else(String::new, |u| u.to_string());
            return Err(format!("A value is required after '{unit}'"));
        }
        [_, extra, ..] => return Err(format!("Unexpected '{}'", extra.text)),
    };
    let named = |unit: TimeUnit| match explicit {
        None => Ok(unit),
        Some(u) if u == unit => Ok(unit),
        Some(u) => Err(format!("'{}' is not a {u} value", value.text)),
    };
    match value.kind {
        TokenKind::WholeNumber => {
            let unit = explicit
                .or(default)
                .ok_or_else(|| format!("A time unit is required for value '{}'", value.text))?;
            Ok(vec![(unit, number(&value.text))])
        }
        TokenKind::WeekdayWord => Ok(vec![(named(TimeUnit::Week)?, value.text.clone())]),
        TokenKind::MonthWord => Ok(vec![(named(TimeUnit::Month)?, value.text.clone())]),
        _ => Err(format!("Unexpected '{}'", value.text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::tokenize;
    use TimeUnit::*;

    fn parse(text: &str, default: Option<TimeUnit>) -> Result<Vec<(TimeUnit, String)>, String> {
        let tokens = tokenize(text);
        parse_values(&tokens, default)
    }

    fn pairs(items: &[(TimeUnit, &str)]) -> Result<Pairs, String> {
        Ok(items.iter().map(|(u, v)| (*u, v.to_string())).collect())
    }

    #[test]
    fn clock_times_with_and_without_meridiem() {
        assert_eq!(parse("10:30", None), pairs(&[(Hour, "10"), (Minute, "30")]));
        assert_eq!(parse("09:05:07", None), pairs(&[(Hour, "9"), (Minute, "5"), (Second, "7")]));
        assert_eq!(parse("12:15 AM", None), pairs(&[(Hour, "0"), (Minute, "15")]));
        assert_eq!(parse("12:00pm", None), pairs(&[(Hour, "12"), (Minute, "0")]));
        assert_eq!(parse("3pm", None), pairs(&[(Hour, "15")]));
        assert!(parse("13:00 PM", None).is_err());
    }

    #[test]
    fn malformed_clock_times_are_rejected() {
        assert!(parse("10 :30", None).unwrap_err().contains("whitespace"));
        assert!(parse("1:2:3:4", None).unwrap_err().contains("two colons"));
        assert!(parse("day 10:30", None).unwrap_err().contains("cannot be combined"));
        assert!(parse("10:", None).is_err());
    }

    #[test]
    fn dates_with_and_without_year() {
        assert_eq!(parse("2024-02-15", None), pairs(&[(Year, "2024"), (Month, "2"), (Day, "15")]));
        assert_eq!(parse("12-25", None), pairs(&[(Month, "12"), (Day, "25")]));
        assert_eq!(parse("Feb-Last", None), pairs(&[(Month, "Feb"), (Day, "Last")]));
        assert_eq!(parse("2024-3-Last-2", None), pairs(&[(Year, "2024"), (Month, "3"), (Day, "Last-2")]));
        assert!(parse("1-2-3", None).unwrap_err().contains("without a year"));
        assert!(parse("2024-1-2-3", None).unwrap_err().contains("two dashes"));
        assert!(parse("2024 -01-05", None).is_err());
    }

    #[test]
    fn date_and_time_combine() {
        assert_eq!(
            parse("2024-01-05 10:30 PM", None),
            pairs(&[(Year, "2024"), (Month, "1"), (Day, "5"), (Hour, "22"), (Minute, "30")])
        );
    }

    #[test]
    fn ordinal_day_with_time() {
        assert_eq!(parse("15th 08:00", None), pairs(&[(Day, "15"), (Hour, "8"), (Minute, "0")]));
        assert_eq!(
            parse("3rdFriday March 2025 17:45", None),
            pairs(&[(Day, "3rdFriday"), (Month, "March"), (Year, "2025"), (Hour, "17"), (Minute, "45")])
        );
        assert_eq!(
            parse("ClosestWeekdayTo 15 09:00", None),
            pairs(&[(Day, "ClosestWeekdayTo 15"), (Hour, "9"), (Minute, "0")])
        );
    }

    #[test]
    fn special_days_and_offsets() {
        assert_eq!(parse("LastDayOfMonth", None), pairs(&[(Day, "LastDayOfMonth")]));
        assert_eq!(parse("5th", None), pairs(&[(Day, "5")]));
        assert_eq!(parse("day Last-3", None), pairs(&[(Day, "Last-3")]));
        assert_eq!(parse("Last + 2", Some(Hour)), pairs(&[(Hour, "Last+2")]));
        assert_eq!(parse("ClosestWeekdayTo 1", None), pairs(&[(Day, "ClosestWeekdayTo 1")]));
        assert!(parse("hour 3rdFriday", None).unwrap_err().contains("day unit"));
    }

    #[test]
    fn single_values_need_a_unit() {
        assert_eq!(parse("monday", None), pairs(&[(Week, "monday")]));
        assert_eq!(parse("March", None), pairs(&[(Month, "March")]));
        assert_eq!(parse("hour 07", None), pairs(&[(Hour, "7")]));
        assert_eq!(parse("30 minutes", None), pairs(&[(Minute, "30")]));
        assert_eq!(parse("10", Some(Hour)), pairs(&[(Hour, "10")]));
        assert!(parse("5", None).unwrap_err().contains("time unit is required"));
        assert!(parse("day monday", None).is_err());
    }
}
