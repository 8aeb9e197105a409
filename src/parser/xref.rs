//! Classic and stream cross-reference sections, plus the bare `startxref` pointer (spec §4.2).

use std::collections::HashSet;

use nom::character::complete::digit1;

use super::lexer::{keyword, skip_ws_and_comments};
use super::object::indirect_object;
use super::value::direct_object;
use super::ParserInput;
use crate::error::{Error, ParseError, Result, XrefError};
use crate::filters::decode_chain;
use crate::object::{Dictionary, Object};
use crate::reader::Reader;
use crate::xref::{decode_stream_entry, parse_index, Xref, XrefEntry, XrefStreamWidths};

/// `startxref\n<offset>` (spec §4.2).
pub fn xref_start(input: ParserInput) -> Option<i64> {
    let input = skip_ws_and_comments(input);
    let (input, _) = keyword(b"startxref")(input).ok()?;
    let input = skip_ws_and_comments(input);
    let (_, digits) = digit1::<ParserInput, nom::error::Error<ParserInput>>(input).ok()?;
    std::str::from_utf8(digits.fragment()).ok()?.parse().ok()
}

/// Parses either a classic `xref` table + `trailer` dictionary, or (when the section at this
/// offset is instead an indirect object) a cross-reference stream, whose own dictionary doubles
/// as the trailer (spec §4.2 "Xref stream").
pub fn xref_and_trailer<'a>(input: ParserInput<'a>, reader: &Reader<'a>) -> Result<(Xref, Dictionary)> {
    let probe = skip_ws_and_comments(input);
    if probe.fragment().starts_with(b"xref") {
        classic_xref_and_trailer(probe)
    } else {
        let mut seen = HashSet::new();
        let (_, obj) = indirect_object(input, 0, None, reader, &mut seen)?;
        let stream = obj.as_stream()?.clone();
        if !stream.is_xref_stream() {
            return Err(Error::Xref(XrefError::Start));
        }
        xref_stream_to_table(&stream)
    }
}

fn classic_xref_and_trailer(input: ParserInput) -> Result<(Xref, Dictionary)> {
    let (mut input, _) = keyword(b"xref")(input).map_err(|_| Error::Xref(XrefError::Start))?;
    let mut xref = Xref::new(0);

    loop {
        input = skip_ws_and_comments(input);
        if input.fragment().starts_with(b"trailer") {
            break;
        }
        let (rest, first) = parse_decimal_u32(input)?;
        let (rest, count) = parse_decimal_u32(rest)?;
        input = rest;
        for oid in first..first.saturating_add(count) {
            input = skip_ws_and_comments(input);
            let bytes = *input.fragment();
            if bytes.len() < 18 {
                return Err(Error::Xref(XrefError::Start));
            }
            let offset_str = std::str::from_utf8(&bytes[0..10]).map_err(|_| Error::Xref(XrefError::Start))?;
            let gen_str = std::str::from_utf8(&bytes[11..16]).map_err(|_| Error::Xref(XrefError::Start))?;
            let kind = bytes[17];
            let offset: u32 = offset_str.trim().parse().map_err(|_| Error::Xref(XrefError::Start))?;
            let generation: u16 = gen_str.trim().parse().map_err(|_| Error::Xref(XrefError::Start))?;
            let entry = match kind {
                b'n' => XrefEntry::Normal { offset, generation },
                b'f' => XrefEntry::Free {
                    next_free: offset,
                    next_gen: generation,
                },
                _ => XrefEntry::UnusableFree,
            };
            xref.entries.entry(oid).or_insert(entry);
            let consumed = bytes.iter().take(20).take_while(|&&b| b != b'\n').count().max(18);
            let consumed = consumed.min(bytes.len());
            input = advance(input, consumed);
        }
    }

    let (input, _) = keyword(b"trailer")(input).map_err(|_| Error::Xref(XrefError::Start))?;
    let (_, trailer_obj) = direct_object(input).map_err(|_| Error::Parse(ParseError::InvalidDictionary))?;
    let trailer = match trailer_obj {
        Object::Dictionary(d) => d,
        _ => return Err(Error::Parse(ParseError::InvalidDictionary)),
    };

    xref.size = trailer.get(b"Size").and_then(|o| o.as_i64()).unwrap_or(xref.max_id() as i64 + 1) as u32;

    Ok((xref, trailer))
}

fn xref_stream_to_table(stream: &crate::object::Stream) -> Result<(Xref, Dictionary)> {
    let dict = stream.dict.clone();
    let filters = stream.filters().unwrap_or_default();
    let parms = stream.decode_parms();
    let decoded = if filters.is_empty() {
        stream.content.clone()
    } else {
        decode_chain(stream.content.clone(), &filters, &parms)?
    };

    let w = dict
        .get(b"W")
        .and_then(|o| o.as_array())
        .map_err(|_| Error::Xref(XrefError::StreamWidth))?;
    let widths_raw: Vec<i64> = w.iter().filter_map(|o| o.as_i64().ok()).collect();
    let widths = XrefStreamWidths::from_array(&widths_raw)?;
    let entry_width = widths.entry_width();
    if entry_width == 0 {
        return Err(Error::Xref(XrefError::StreamWidth));
    }

    let size = dict.get(b"Size").and_then(|o| o.as_i64()).unwrap_or(0);
    let index = parse_index(&dict, size);

    let mut xref = Xref::new(size.max(0) as u32);
    let mut pos = 0usize;
    for (first, count) in index {
        for i in 0..count {
            if pos + entry_width > decoded.len() {
                break;
            }
            let oid = (first + i) as u32;
            let entry = decode_stream_entry(&decoded[pos..pos + entry_width], &widths);
            xref.entries.entry(oid).or_insert(entry);
            pos += entry_width;
        }
    }

    Ok((xref, dict))
}

fn parse_decimal_u32(input: ParserInput) -> Result<(ParserInput, u32)> {
    let input = skip_ws_and_comments(input);
    let (rest, digits) =
        digit1::<ParserInput, nom::error::Error<ParserInput>>(input).map_err(|_| Error::Xref(XrefError::Start))?;
    let value = std::str::from_utf8(digits.fragment())
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(Error::Xref(XrefError::Start))?;
    Ok((rest, value))
}

fn advance(input: ParserInput, n: usize) -> ParserInput {
    use nom::Slice;
    input.slice(n..)
}
