//! Hand-written recursive-descent parser over a [`nom_locate`] span (spec §4.1/§4.2/§4.3).
//!
//! Grammar, informally:
//!   document       <- header indirect_object* xref trailer xref_start
//!   direct_object  <- null | boolean | number | name | string | array | dictionary
//!   indirect_object <- integer integer "obj" direct_object ("stream" ...)? "endobj"
//!
//! Functions here take a raw byte offset into the file (xref entries are byte offsets, not
//! parser state), so objects are addressed directly rather than parsed in file order.

mod lexer;
mod object;
mod value;
mod xref;

use nom_locate::LocatedSpan;

pub(crate) use lexer::skip_ws_and_comments;
pub use object::{header, indirect_object};
pub use xref::{xref_and_trailer, xref_start};

use crate::error::{Error, ParseError, Result};
use crate::object::Object;

/// Parser input: a byte slice tagged with a short `&str` label used only in diagnostics.
pub type ParserInput<'a> = LocatedSpan<&'a [u8], &'a str>;

/// Parses one [`Object`] value out of `input`, discarding the remainder. Used by the
/// object-stream unpacker, which addresses each packed object by its own byte offset rather
/// than by threading a cursor across entries (spec §4.3 "Object stream").
pub fn parse_direct_object(input: ParserInput) -> Result<Object> {
    value::direct_object(input)
        .map(|(_, obj)| obj)
        .map_err(|_| Error::Parse(ParseError::InvalidObjectStream))
}

pub(crate) type NResult<'a, T> = nom::IResult<ParserInput<'a>, T>;

pub(crate) fn fail<'a, T>(input: ParserInput<'a>) -> NResult<'a, T> {
    Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Fail)))
}

/// Reads the binary-mark comment line conventionally placed right after the header (spec
/// §4.1): a `%` followed by at least 4 bytes `>= 0x80`, signalling the file is binary to
/// naive line-oriented tools.
pub fn binary_mark(input: ParserInput) -> Option<Vec<u8>> {
    let bytes = input.fragment();
    if bytes.first() != Some(&b'%') {
        return None;
    }
    let rest = &bytes[1..];
    let end = rest.iter().position(|&b| b == b'\n' || b == b'\r').unwrap_or(rest.len());
    let line = &rest[..end];
    if line.len() >= 4 && line.iter().all(|&b| b >= 0x80) {
        Some(line.to_vec())
    } else {
        None
    }
}
