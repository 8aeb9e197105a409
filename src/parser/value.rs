//! `direct_object`: the recursive value grammar (spec §3) shared by indirect objects, array
//! elements, dictionary values and object-stream payloads.

use nom::bytes::complete::tag;
use nom::character::complete::digit1;

use super::lexer::{hex_string, literal_string, name, number, skip_ws_and_comments};
use super::{fail, NResult, ParserInput};
use crate::object::{Dictionary, Object};

pub fn direct_object(input: ParserInput) -> NResult<Object> {
    let input = skip_ws_and_comments(input);
    let bytes = *input.fragment();

    if bytes.starts_with(b"null") {
        let (input, _) = tag(b"null")(input)?;
        return Ok((input, Object::Null));
    }
    if bytes.starts_with(b"true") {
        let (input, _) = tag(b"true")(input)?;
        return Ok((input, Object::Boolean(true)));
    }
    if bytes.starts_with(b"false") {
        let (input, _) = tag(b"false")(input)?;
        return Ok((input, Object::Boolean(false)));
    }
    if bytes.starts_with(b"<<") {
        return dictionary(input);
    }
    if bytes.starts_with(b"<") {
        let (input, (s, fmt)) = hex_string(input)?;
        return Ok((input, Object::String(s, fmt)));
    }
    if bytes.starts_with(b"(") {
        let (input, (s, fmt)) = literal_string(input)?;
        return Ok((input, Object::String(s, fmt)));
    }
    if bytes.starts_with(b"/") {
        let (input, n) = name(input)?;
        return Ok((input, Object::Name(n)));
    }
    if bytes.starts_with(b"[") {
        return array(input);
    }
    if bytes.first().map(|&b| b == b'+' || b == b'-' || b == b'.' || b.is_ascii_digit()) == Some(true) {
        return number_or_reference(input);
    }

    fail(input)
}

/// After parsing an integer, looks ahead for `<integer> R` to disambiguate a reference from a
/// plain number (spec §3 "Indirect reference").
fn number_or_reference(input: ParserInput) -> NResult<Object> {
    let (after_first, first) = number(input)?;
    let Object::Integer(oid) = first else {
        return Ok((after_first, first));
    };
    if oid < 0 {
        return Ok((after_first, first));
    }

    let lookahead = skip_ws_and_comments(after_first);
    if let Ok((after_gen, gen_span)) = digit1::<ParserInput, nom::error::Error<ParserInput>>(lookahead) {
        if let Ok(gen) = std::str::from_utf8(gen_span.fragment()).unwrap_or("").parse::<u16>() {
            let after_gen_ws = skip_ws_and_comments(after_gen);
            if after_gen_ws.fragment().starts_with(b"R")
                && after_gen_ws
                    .fragment()
                    .get(1)
                    .map(|&b| !b.is_ascii_alphanumeric())
                    .unwrap_or(true)
            {
                let (rest, _) = tag(b"R")(after_gen_ws)?;
                return Ok((rest, Object::Reference((oid as u32, gen))));
            }
        }
    }

    Ok((after_first, first))
}

fn array(input: ParserInput) -> NResult<Object> {
    let (mut input, _) = tag(b"[")(input)?;
    let mut items = Vec::new();
    loop {
        input = skip_ws_and_comments(input);
        if input.fragment().starts_with(b"]") {
            let (rest, _) = tag(b"]")(input)?;
            input = rest;
            break;
        }
        let (rest, value) = direct_object(input)?;
        items.push(value);
        input = rest;
    }
    Ok((input, Object::Array(items)))
}

fn dictionary(input: ParserInput) -> NResult<Object> {
    let (mut input, _) = tag(b"<<")(input)?;
    let mut dict = Dictionary::new();
    loop {
        input = skip_ws_and_comments(input);
        if input.fragment().starts_with(b">>") {
            let (rest, _) = tag(b">>")(input)?;
            input = rest;
            break;
        }
        let (rest, key) = name(input)?;
        let (rest, value) = direct_object(rest)?;
        dict.set(key, value);
        input = rest;
    }
    Ok((input, Object::Dictionary(dict)))
}
