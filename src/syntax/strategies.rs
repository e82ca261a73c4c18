use std::collections::BTreeMap;

use super::format;
use super::grouping::{Group, GroupKind, source_text};
use super::lexer::{Token, TokenKind};
use super::values::{self, Pairs, parse_values};
use crate::calendar;
use crate::rule::{AtMultiplesRule, AtRule, BetweenMultiplesRule, BetweenRule, EveryRule, Rule, TimeZoneRule};
use crate::{TimeUnit, UnitSet};

/// Turn one group into its rules. The error is a bare message; the caller
/// prefixes it with the group text.
pub(crate) fn parse_group(group: &Group<'_>) -> Result<Vec<Rule>, String> {
    let source = group.text();
    let body = group.body();
    match group.kind {
        GroupKind::Shorthand(unit) => shorthand(unit, body, source),
        GroupKind::Every => every(body, source),
        GroupKind::AtInOn => at_in_on(body, source),
        GroupKind::Between => between(body, source),
        GroupKind::Upto => open_range(body, source, false),
        GroupKind::From => open_range(body, source, true),
        GroupKind::TimeZone => time_zone(body, source),
    }
}

fn significant(tokens: &[Token]) -> Vec<&Token> {
    tokens.iter().filter(|t| !t.is_trivia()).collect()
}

/// Split off a trailing `AnchoredOn <value>` clause.
fn split_anchor(body: &[Token]) -> Result<(&[Token], Option<String>), String> {
    let Some(at) = body.iter().position(|t| t.is(TokenKind::AnchorKeyword)) else {
        return Ok((body, None));
    };
    let clause = &body[at + 1..];
    if let Some(extra) = clause.iter().find(|t| t.is(TokenKind::AnchorKeyword)) {
        return Err(format!("Only one anchor clause is allowed, found '{}'", extra.text));
    }
    let value = values::join(clause);
    if value.is_empty() {
        return Err(format!("Missing anchor value after '{}'", body[at].text));
    }
    Ok((&body[..at], Some(value)))
}

fn every_rule(unit: TimeUnit, interval: u32, anchor: Option<String>, source: String) -> Vec<Rule> {
    vec![Rule::Every(EveryRule { unit, interval, anchor, source })]
}

fn shorthand(unit: TimeUnit, body: &[Token], source: String) -> Result<Vec<Rule>, String> {
    let (main, anchor) = split_anchor(body)?;
    if let Some(extra) = significant(main).first() {
        return Err(format!("Unexpected '{}'", extra.text));
    }
    Ok(every_rule(unit, 1, anchor, source))
}

fn every(body: &[Token], source: String) -> Result<Vec<Rule>, String> {
    let (main, anchor) = split_anchor(body)?;
    let sig = significant(main);
    let (count, rest) = match sig.split_first() {
        Some((n, rest)) if n.is(TokenKind::WholeNumber) => (Some(*n), rest),
        _ => (None, sig.as_slice()),
    };
    let interval = match count {
        Some(n) => n.text.parse().map_err(|_| format!("Invalid interval '{}'", n.text))?,
        None => 1,
    };
    match rest {
        [word] => {
            if let Some(unit) = word.unit() {
                return Ok(every_rule(unit, interval, anchor, source));
            }
            if !word.is(TokenKind::WeekdayWord) || count.is_some() {
                return Err(format!("Unexpected '{}'", word.text));
            }
            match anchor {
                Some(_) => Err(format!("'{}' already anchors the week and cannot take an anchor clause", word.text)),
                None => Ok(every_rule(TimeUnit::Week, 1, Some(word.text.clone()), source)),
            }
        }
        [] => match count {
            Some(n) => Err(format!("Missing time unit after '{}'", n.text)),
            None => Err("Expected an interval and a time unit".to_string()),
        },
        [_, extra, ..] => Err(format!("Unexpected '{}'", extra.text)),
    }
}

/// Bracketed list: the optional leading unit word and the comma-separated items.
fn bracket_items(body: &[Token]) -> Result<(Option<TimeUnit>, Vec<&[Token]>), String> {
    let open = body.iter().position(|t| t.is(TokenKind::OpenBracket)).unwrap_or(0);
    let close = body
        .iter()
        .rposition(|t| t.is(TokenKind::CloseBracket))
        .filter(|&close| close > open)
        .ok_or_else(|| "Missing closing bracket ']'".to_string())?;

    let mut default = match significant(&body[..open]).as_slice() {
        [] => None,
        [word] if word.unit().is_some() => word.unit(),
        [other, ..] => return Err(format!("Unexpected '{}' before '['", other.text)),
    };
    if let Some(extra) = significant(&body[close + 1..]).first() {
        return Err(format!("Unexpected '{}' after ']'", extra.text));
    }
    let inner = &body[open + 1..close];
    if inner.iter().any(|t| t.is(TokenKind::OpenBracket)) {
        return Err("Nested brackets are not allowed".to_string());
    }

    let items: Vec<&[Token]> = inner.split(|t| t.is(TokenKind::Comma)).collect();
    if items.iter().any(|item| significant(item).is_empty()) {
        return Err("Empty value in list".to_string());
    }
    if default.is_none() {
        default = items.first().and_then(|item| significant(item).first().and_then(|t| t.unit()));
    }
    Ok((default, items))
}

fn units_of(pairs: &Pairs) -> UnitSet {
    pairs.iter().map(|(unit, _)| *unit).collect()
}

fn at_in_on(body: &[Token], source: String) -> Result<Vec<Rule>, String> {
    if !body.iter().any(|t| t.is(TokenKind::OpenBracket)) {
        let pairs = parse_values(body, None)?;
        return Ok(pairs
            .into_iter()
            .map(|(unit, value)| Rule::At(AtRule { unit, value, source: source.clone() }))
            .collect());
    }

    let (default, items) = bracket_items(body)?;
    let mut values: BTreeMap<TimeUnit, Vec<String>> = BTreeMap::new();
    let mut shape: Option<UnitSet> = None;
    for item in items {
        let pairs = parse_values(item, default)?;
        let units = units_of(&pairs);
        match shape {
            Some(expected) if expected != units => {
                return Err(format!(
                    "All values in a list must specify the same time units, '{}' does not",
                    source_text(item)
                ));
            }
            _ => shape = Some(units),
        }
        for (unit, value) in pairs {
            values.entry(unit).or_default().push(value);
        }
    }
    Ok(vec![Rule::AtMultiples(AtMultiplesRule { values, source })])
}

fn range(tokens: &[Token], default: Option<TimeUnit>, source: &str) -> Result<BetweenRule, String> {
    let ands: Vec<usize> = (0..tokens.len()).filter(|&i| tokens[i].is(TokenKind::AndKeyword)).collect();
    let split = match ands.as_slice() {
        [i] => *i,
        [] => return Err(format!("Missing 'and' in range '{}'", source_text(tokens))),
        _ => return Err(format!("Only one 'and' is allowed in range '{}'", source_text(tokens))),
    };
    let (start, end) = (&tokens[..split], &tokens[split + 1..]);
    let default = default.or_else(|| significant(tokens).into_iter().find_map(Token::unit));
    let start = parse_values(start, default)?;
    let end = parse_values(end, default)?;
    if units_of(&start) != units_of(&end) {
        return Err(format!(
            "Start and end of range '{}' must specify the same time units",
            source_text(tokens)
        ));
    }
    let ends: BTreeMap<TimeUnit, String> = end.into_iter().collect();
    let bounds = start
        .into_iter()
        .filter_map(|(unit, from)| ends.get(&unit).map(|to| (unit, (from, to.clone()))))
        .collect();
    Ok(BetweenRule { bounds, source: source.to_string() })
}

fn between(body: &[Token], source: String) -> Result<Vec<Rule>, String> {
    if !body.iter().any(|t| t.is(TokenKind::OpenBracket)) {
        return Ok(vec![Rule::Between(range(body, None, &source)?)]);
    }
    let (default, items) = bracket_items(body)?;
    let ranges = items.into_iter().map(|item| range(item, default, &source)).collect::<Result<Vec<_>, _>>()?;
    let shape = ranges.first().map(BetweenRule::units);
    if let Some(odd) = ranges.iter().find(|r| Some(r.units()) != shape) {
        return Err(format!(
            "All ranges in a list must specify the same time units as the first, '{}' does not",
            format::range(odd)
        ));
    }
    Ok(vec![Rule::BetweenMultiples(BetweenMultiplesRule { ranges, source })])
}

/// `@upto x` is `@between First and x`, `@from x` is `@between x and Last`.
/// Bounds that do not depend on the month are written as plain numbers.
fn open_range(body: &[Token], source: String, from: bool) -> Result<Vec<Rule>, String> {
    let pairs = parse_values(body, None)?;
    let bounds = pairs
        .into_iter()
        .map(|(unit, value)| {
            let bound = match (from, unit) {
                (true, TimeUnit::Day) => "Last".to_string(),
                (true, _) => calendar::absolute_max(unit).to_string(),
                (false, _) => calendar::min_value(unit).to_string(),
            };
            (unit, if from { (value, bound) } else { (bound, value) })
        })
        .collect();
    Ok(vec![Rule::Between(BetweenRule { bounds, source })])
}

fn time_zone(body: &[Token], source: String) -> Result<Vec<Rule>, String> {
    let id = source_text(body);
    if id.is_empty() {
        return Err("A time zone identifier is required".to_string());
    }
    Ok(vec![Rule::TimeZone(TimeZoneRule { id, source })])
}
