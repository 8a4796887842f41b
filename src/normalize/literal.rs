//! Parser for literal-encoded payloads.
//!
//! Some backends return `str(obj)` of a dynamic-language value instead of
//! JSON: single-quoted strings, `True`/`False`/`None`, tuples, and dicts with
//! non-string keys. This module turns that text into a `serde_json::Value`.

use chumsky::prelude::*;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};

/// Type-tag header some backends print before the payload, e.g.
/// `<class 'list'>` or `list:`.
static TYPE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:<(?:class|type)\s+'[^']*'>|<[A-Za-z_][\w.]*>|[A-Za-z_][\w.]*\s*:)\s*")
        .expect("type tag pattern is valid")
});

/// Strip a leading type-tag header, if the text after it looks structured.
pub fn strip_type_tag(text: &str) -> &str {
    let trimmed = text.trim();
    match TYPE_TAG.find(trimmed) {
        Some(m) => {
            let rest = trimmed[m.end()..].trim_start();
            if rest.starts_with(['[', '{', '(']) {
                rest
            } else {
                trimmed
            }
        }
        None => trimmed,
    }
}

/// Create a parser for literal-encoded values.
pub fn literal_parser<'src>() -> impl Parser<'src, &'src str, Value, extra::Err<Rich<'src, char>>> {
    recursive(|value| {
        let escape = just('\\').ignore_then(choice((
            just('n').to('\n'),
            just('t').to('\t'),
            just('r').to('\r'),
            just('0').to('\0'),
            just('a').to('\x07'),
            just('b').to('\x08'),
            just('f').to('\x0c'),
            just('v').to('\x0b'),
            just('x').ignore_then(hex_escape(2)),
            just('u').ignore_then(hex_escape(4)),
            just('U').ignore_then(hex_escape(8)),
            just('\\'),
            just('\''),
            just('"'),
        )));

        let single_quoted = just('\'')
            .ignore_then(none_of("\\'").or(escape.clone()).repeated().collect::<String>())
            .then_ignore(just('\''));

        let double_quoted = just('"')
            .ignore_then(none_of("\\\"").or(escape).repeated().collect::<String>())
            .then_ignore(just('"'));

        let string = single_quoted.or(double_quoted).map(Value::String);

        let number = just('-')
            .or_not()
            .then(text::digits(10))
            .then(just('.').then(text::digits(10)).or_not())
            .then(one_of("eE").then(one_of("+-").or_not()).then(text::digits(10)).or_not())
            .to_slice()
            .map(number_value);

        let constant = choice((
            just("True").to(Value::Bool(true)),
            just("False").to(Value::Bool(false)),
            just("None").to(Value::Null),
            just("true").to(Value::Bool(true)),
            just("false").to(Value::Bool(false)),
            just("null").to(Value::Null),
        ));

        let items = value
            .clone()
            .separated_by(just(','))
            .allow_trailing()
            .collect::<Vec<Value>>()
            .padded();

        let list = items.clone().delimited_by(just('['), just(']')).map(Value::Array);
        let tuple = items.delimited_by(just('('), just(')')).map(Value::Array);

        let entry = value
            .clone()
            .then_ignore(just(':'))
            .then(value)
            .map(|(key, value): (Value, Value)| (key_string(key), value));

        let dict = entry
            .separated_by(just(','))
            .allow_trailing()
            .collect::<Vec<(String, Value)>>()
            .padded()
            .delimited_by(just('{'), just('}'))
            .map(|entries| Value::Object(entries.into_iter().collect::<Map<String, Value>>()));

        choice((string, number, constant, list, tuple, dict)).padded()
    })
    .then_ignore(end())
}

/// `digits` hex digits naming a code point, as in `\xa0` or `\u00e9`.
fn hex_escape<'src>(digits: usize) -> impl Parser<'src, &'src str, char, extra::Err<Rich<'src, char>>> + Clone {
    one_of("0123456789abcdefABCDEF")
        .repeated()
        .exactly(digits)
        .to_slice()
        .try_map(|hex: &str, span| {
            u32::from_str_radix(hex, 16)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| Rich::custom(span, format!("invalid code point escape `{hex}`")))
        })
}

/// Parse literal-encoded text into a JSON value.
///
/// Returns the parser's error messages on failure.
pub fn parse_literal(text: &str) -> Result<Value, Vec<String>> {
    let (value, errs) = literal_parser().parse(text).into_output_errors();
    match value {
        Some(value) if errs.is_empty() => Ok(value),
        _ => Err(errs.into_iter().map(|e| e.to_string()).collect()),
    }
}

fn number_value(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn key_string(key: Value) -> String {
    match key {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
