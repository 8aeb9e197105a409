//! `header` and `indirect_object`: the two entry points the reader drives directly, plus the
//! stream-body slicing logic (spec §3 "Indirect object", §4.1).

use std::collections::HashSet;

use nom::character::complete::digit1;

use super::lexer::{keyword, skip_ws_and_comments};
use super::value::direct_object;
use super::{fail, NResult, ParserInput};
use crate::error::{Error, ParseError, Result};
use crate::object::{Object, ObjectId, Stream};
use crate::reader::Reader;

/// `%PDF-n.m` header (spec §3). Reads up to the first whitespace/EOL after `%PDF-`.
pub fn header(input: ParserInput) -> Option<String> {
    let bytes = *input.fragment();
    if !bytes.starts_with(b"%PDF-") {
        return None;
    }
    let rest = &bytes[5..];
    let end = rest
        .iter()
        .position(|&b| b == b'\r' || b == b'\n' || b == b' ')
        .unwrap_or(rest.len());
    std::str::from_utf8(&rest[..end]).ok().map(|s| s.to_string())
}

fn parse_u32(span: ParserInput) -> NResult<u32> {
    let span = skip_ws_and_comments(span);
    let (rest, digits) = digit1(span)?;
    match std::str::from_utf8(digits.fragment()).ok().and_then(|s| s.parse().ok()) {
        Some(n) => Ok((rest, n)),
        None => fail(rest),
    }
}

fn parse_u16(span: ParserInput) -> NResult<u16> {
    let span = skip_ws_and_comments(span);
    let (rest, digits) = digit1(span)?;
    match std::str::from_utf8(digits.fragment()).ok().and_then(|s| s.parse().ok()) {
        Some(n) => Ok((rest, n)),
        None => fail(rest),
    }
}

fn syntax(offset: usize, reason: &str) -> Error {
    Error::Parse(ParseError::Syntax {
        offset,
        reason: reason.to_string(),
    })
}

/// Parses one `N G obj ... endobj` unit at `offset` into `input`'s buffer. When the value is a
/// dictionary immediately followed by `stream`, promotes it to a [`crate::object::Stream`],
/// slicing its raw (still-filtered) payload using `/Length` when that resolves directly to an
/// integer; otherwise leaves `content` empty and `start_position` set so the caller can finish
/// the job once every object (and thus any indirect `/Length`) has been loaded (spec §4.1,
/// §4.6 "Deferred stream content").
pub fn indirect_object<'a>(
    input: ParserInput<'a>, offset: usize, expected_id: Option<ObjectId>, _reader: &Reader<'a>,
    seen: &mut HashSet<ObjectId>,
) -> Result<(ObjectId, Object)> {
    let buffer = *input.fragment();
    if offset > buffer.len() {
        return Err(Error::InvalidOffset(offset));
    }
    let tag_name = input.extra;
    let span = ParserInput::new_extra(&buffer[offset..], tag_name);

    let span = skip_ws_and_comments(span);
    let (span, oid) = parse_u32(span).map_err(|_| syntax(offset, "expected object number"))?;
    let (span, gen) = parse_u16(span).map_err(|_| syntax(offset, "expected generation number"))?;
    let (span, _) = keyword(b"obj")(span).map_err(|_| syntax(offset, "expected 'obj' keyword"))?;

    let id = expected_id.unwrap_or((oid, gen));
    if !seen.insert(id) {
        return Err(Error::ReferenceCycle(id));
    }

    let (span, value) = direct_object(span).map_err(|_| syntax(offset, "malformed object value"))?;
    let after_value = skip_ws_and_comments(span);

    if let Object::Dictionary(dict) = value {
        if after_value.fragment().starts_with(b"stream") {
            let mut rest = &after_value.fragment()[b"stream".len()..];
            if rest.first() == Some(&b'\r') {
                rest = &rest[1..];
            }
            if rest.first() == Some(&b'\n') {
                rest = &rest[1..];
            }
            let start_in_buffer = buffer.len() - rest.len();

            let explicit_len = dict.get(b"Length").ok().and_then(|o| o.as_i64().ok());
            let content = match explicit_len {
                Some(len) if len >= 0 => {
                    let len = len as usize;
                    let end = (start_in_buffer + len).min(buffer.len());
                    buffer[start_in_buffer..end].to_vec()
                }
                _ => Vec::new(),
            };

            let stream = Stream {
                dict,
                content,
                start_position: Some(start_in_buffer),
                decoded: false,
            };
            return Ok((id, Object::Stream(stream)));
        }
        return Ok((id, Object::Dictionary(dict)));
    }

    Ok((id, value))
}
