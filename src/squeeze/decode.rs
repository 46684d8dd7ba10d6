//! Decoding of field query responses.
//!
//! A response echoes the query: `<player> <field> <percent-encoded value>`.
//! The value is missing altogether when the player has nothing to report.

use std::{borrow::Cow, str::FromStr};

use log::debug;

use crate::squeeze::{error::SqueezeError, field::Field};

/// Tokens of one response line
#[derive(Debug, PartialEq, Eq)]
pub struct RawField<'a> {
    pub player: &'a str,
    pub command: &'a str,
    pub payload: Option<&'a str>,
}

impl<'a> RawField<'a> {
    pub fn parse(line: &'a str) -> Self {
        let mut tokens = line.split_whitespace();
        Self {
            player: tokens.next().unwrap_or_default(),
            command: tokens.next().unwrap_or_default(),
            payload: tokens.next(),
        }
    }
}

/// Unescapes a query-string encoded value (`%XY` sequences and `+` for space).
pub fn unescape(field: Field, raw: &str) -> Result<String, SqueezeError> {
    let error = || SqueezeError::Decode {
        field,
        raw: raw.to_string(),
    };

    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                return Err(error());
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(Cow::into_owned)
        .map_err(|_| error())
}

/// Decodes a text value, an absent value decodes to an empty string.
pub fn decode_text(field: Field, line: &str) -> Result<String, SqueezeError> {
    let raw = RawField::parse(line);
    if raw.command != field.as_str() {
        debug!(
            "player {} answered '{}' to a {field} query",
            raw.player, raw.command
        );
    }

    match raw.payload {
        Some(raw) => unescape(field, raw),
        None => {
            debug!("no {field} metadata for current track");
            Ok(String::new())
        }
    }
}

pub fn decode_int(field: Field, line: &str) -> Result<i32, SqueezeError> {
    let text = decode_text(field, line)?;
    Ok(parse_or_zero(field, &text))
}

/// Non-finite values (`nan`, `inf`) are unknown and decode to 0
pub fn decode_float(field: Field, line: &str) -> Result<f64, SqueezeError> {
    let text = decode_text(field, line)?;
    let value: f64 = parse_or_zero(field, &text);
    if !value.is_finite() {
        debug!("{field} value \"{text}\" isn't finite, value ignored");
        return Ok(0.0);
    }
    Ok(value)
}

/// Servers answer `?` for values they don't know
fn parse_or_zero<T: FromStr + Default>(field: Field, text: &str) -> T {
    text.trim().parse().unwrap_or_else(|_| {
        debug!("{field} value \"{text}\" isn't a number, value ignored");
        T::default()
    })
}
