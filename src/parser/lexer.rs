//! Low-level tokens (spec §3 "lexical conventions"): whitespace, comments, numbers, names,
//! literal and hexadecimal strings.

use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::digit1;
use nom::combinator::opt;

use super::{fail, NResult, ParserInput};
use crate::error::ParseError;
use crate::object::{Name, Object, StringFormat};
use crate::reader::MAX_BRACKET;

pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0c | 0x00)
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

pub fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Skips whitespace and `%...`-to-end-of-line comments, repeatedly (spec §3).
pub fn skip_ws_and_comments(mut input: ParserInput) -> ParserInput {
    loop {
        let bytes = input.fragment();
        let ws_len = bytes.iter().take_while(|&&b| is_whitespace(b)).count();
        if ws_len > 0 {
            input = input.slice(ws_len..);
            continue;
        }
        if bytes.first() == Some(&b'%') {
            let len = bytes.iter().take_while(|&&b| b != b'\n' && b != b'\r').count();
            input = input.slice(len..);
            continue;
        }
        break;
    }
    input
}

/// Adapter so `LocatedSpan` reads like a byte slice with a `slice` helper.
trait SpanSlice<'a> {
    fn slice(self, range: std::ops::RangeFrom<usize>) -> ParserInput<'a>;
}

impl<'a> SpanSlice<'a> for ParserInput<'a> {
    fn slice(self, range: std::ops::RangeFrom<usize>) -> ParserInput<'a> {
        use nom::Slice;
        nom::Slice::slice(self, range)
    }
}

pub fn keyword<'a>(kw: &'static [u8]) -> impl Fn(ParserInput<'a>) -> NResult<'a, ()> {
    move |input: ParserInput<'a>| {
        let input = skip_ws_and_comments(input);
        let (input, _) = tag(kw)(input)?;
        Ok((input, ()))
    }
}

pub fn name(input: ParserInput) -> NResult<Name> {
    let input = skip_ws_and_comments(input);
    let (input, _) = tag(b"/")(input)?;
    let (input, raw) = take_while(is_regular)(input)?;
    let mut out = Vec::with_capacity(raw.fragment().len());
    let bytes = raw.fragment();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'#' && i + 2 < bytes.len() && bytes[i + 1].is_ascii_hexdigit() && bytes[i + 2].is_ascii_hexdigit()
        {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("00");
            out.push(u8::from_str_radix(hex, 16).unwrap_or(0));
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok((input, out))
}

pub fn number(input: ParserInput) -> NResult<Object> {
    let input = skip_ws_and_comments(input);
    let (input, sign) = opt(nom::branch::alt((tag(b"+"), tag(b"-"))))(input)?;
    let (input, int_part) = opt(digit1)(input)?;
    let (input, frac) = opt(nom::sequence::preceded(tag(b"."), digit1))(input)?;

    if int_part.is_none() && frac.is_none() {
        return fail(input);
    }

    let mut text = String::new();
    if let Some(s) = sign {
        text.push_str(std::str::from_utf8(s.fragment()).unwrap_or(""));
    }
    let int_text = int_part.map(|s| std::str::from_utf8(s.fragment()).unwrap_or("0").to_string());
    text.push_str(int_text.as_deref().unwrap_or("0"));

    if let Some(frac) = frac {
        text.push('.');
        text.push_str(std::str::from_utf8(frac.fragment()).unwrap_or("0"));
        let value: f64 = text.parse().unwrap_or(0.0);
        Ok((input, Object::Real(value)))
    } else {
        match text.parse::<i64>() {
            Ok(v) => Ok((input, Object::Integer(v))),
            Err(_) => match text.parse::<f64>() {
                Ok(v) => Ok((input, Object::Real(v))),
                Err(_) => fail(input),
            },
        }
    }
}

/// `(...)`: balanced literal string with escape sequences (spec §3). Depth is bounded by
/// [`MAX_BRACKET`] to keep pathological nesting from blowing up the parser.
pub fn literal_string(input: ParserInput) -> NResult<(Vec<u8>, StringFormat)> {
    let input = skip_ws_and_comments(input);
    let (mut input, _) = tag(b"(")(input)?;
    let mut out = Vec::new();
    let mut depth = 1usize;
    loop {
        let bytes = *input.fragment();
        let Some(&b) = bytes.first() else {
            return fail(input);
        };
        match b {
            b'\\' => {
                let next = bytes.get(1).copied();
                input = input.slice(1..);
                match next {
                    Some(b'n') => {
                        out.push(b'\n');
                        input = input.slice(1..);
                    }
                    Some(b'r') => {
                        out.push(b'\r');
                        input = input.slice(1..);
                    }
                    Some(b't') => {
                        out.push(b'\t');
                        input = input.slice(1..);
                    }
                    Some(b'b') => {
                        out.push(0x08);
                        input = input.slice(1..);
                    }
                    Some(b'f') => {
                        out.push(0x0c);
                        input = input.slice(1..);
                    }
                    Some(b'(') => {
                        out.push(b'(');
                        input = input.slice(1..);
                    }
                    Some(b')') => {
                        out.push(b')');
                        input = input.slice(1..);
                    }
                    Some(b'\\') => {
                        out.push(b'\\');
                        input = input.slice(1..);
                    }
                    Some(b'\r') => {
                        input = input.slice(1..);
                        if input.fragment().first() == Some(&b'\n') {
                            input = input.slice(1..);
                        }
                    }
                    Some(b'\n') => {
                        input = input.slice(1..);
                    }
                    Some(d) if d.is_ascii_digit() => {
                        let mut value = 0u32;
                        let mut n = 0;
                        while n < 3 {
                            match input.fragment().first() {
                                Some(&c) if (b'0'..=b'7').contains(&c) => {
                                    value = value * 8 + (c - b'0') as u32;
                                    input = input.slice(1..);
                                    n += 1;
                                }
                                _ => break,
                            }
                        }
                        out.push((value & 0xff) as u8);
                    }
                    _ => {}
                }
            }
            b'(' => {
                depth += 1;
                if depth > MAX_BRACKET {
                    return Err(nom::Err::Failure(nom::error::Error::new(
                        input,
                        nom::error::ErrorKind::TooLarge,
                    )));
                }
                out.push(b'(');
                input = input.slice(1..);
            }
            b')' => {
                depth -= 1;
                input = input.slice(1..);
                if depth == 0 {
                    break;
                }
                out.push(b')');
            }
            _ => {
                out.push(b);
                input = input.slice(1..);
            }
        }
    }
    Ok((input, (out, StringFormat::Literal)))
}

/// `<...>`: hexadecimal string, whitespace-tolerant, odd trailing nibble zero-padded (spec §3).
pub fn hex_string(input: ParserInput) -> NResult<(Vec<u8>, StringFormat)> {
    let input = skip_ws_and_comments(input);
    let (input, _) = tag(b"<")(input)?;
    let (input, raw) = take_while1(|b: u8| b != b'>')(input)?;
    let (input, _) = tag(b">")(input)?;
    let mut digits = Vec::new();
    for &b in raw.fragment().iter() {
        if b.is_ascii_hexdigit() {
            digits.push(b);
        }
    }
    if digits.len() % 2 != 0 {
        digits.push(b'0');
    }
    let bytes = digits
        .chunks(2)
        .map(|pair| {
            let s = std::str::from_utf8(pair).unwrap_or("00");
            u8::from_str_radix(s, 16).unwrap_or(0)
        })
        .collect();
    Ok((input, (bytes, StringFormat::Hexadecimal)))
}

pub fn parse_error(reason: &str, offset: usize) -> ParseError {
    ParseError::Syntax {
        offset,
        reason: reason.to_string(),
    }
}
