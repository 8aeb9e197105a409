//! Object serialization (spec §4.1 "Numeric semantics"/"Strings"/"Name objects", §4.8 step 2):
//! turns an [`Object`] back into PDF syntax bytes.
//!
//! Grounded on the reader's value grammar (`src/parser/value.rs`) read in reverse, and on the
//! teacher-adjacent writer shape in `other_examples/` (a dictionary-then-delimiter walk).

use crate::error::Result;
use crate::object::{Dictionary, Name, Object, Stream, StringFormat};

/// Serializes `object` onto `out`, following the direct-object grammar (spec §3). Streams
/// write their already-encoded `content` verbatim, wrapped in `stream`/`endstream` keywords.
pub fn write_object(object: &Object, out: &mut Vec<u8>) -> Result<()> {
    match object {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Object::Integer(i) => {
            let mut buf = itoa::Buffer::new();
            out.extend_from_slice(buf.format(*i).as_bytes());
        }
        Object::Real(r) => write_real(*r, out),
        Object::Name(name) => write_name(name, out),
        Object::String(bytes, format) => write_string(bytes, *format, out),
        Object::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_object(item, out)?;
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => write_dictionary(dict, out),
        Object::Reference(id) => {
            let mut buf = itoa::Buffer::new();
            out.extend_from_slice(buf.format(id.0).as_bytes());
            out.push(b' ');
            out.extend_from_slice(buf.format(id.1).as_bytes());
            out.extend_from_slice(b" R");
        }
        Object::Stream(stream) => write_stream(stream, out)?,
    }
    Ok(())
}

/// Writes `oid gen obj\n<value>\nendobj\n` (spec §4.8 step 2).
pub fn write_indirect_object(id: (u32, u16), object: &Object, out: &mut Vec<u8>) -> Result<()> {
    let mut buf = itoa::Buffer::new();
    out.extend_from_slice(buf.format(id.0).as_bytes());
    out.push(b' ');
    out.extend_from_slice(buf.format(id.1).as_bytes());
    out.extend_from_slice(b" obj\n");
    write_object(object, out)?;
    out.extend_from_slice(b"\nendobj\n");
    Ok(())
}

/// `%g`-style real formatting with no scientific notation and trailing zeros trimmed (spec
/// §4.1 "Numeric semantics").
fn write_real(value: f64, out: &mut Vec<u8>) {
    if !value.is_finite() {
        out.extend_from_slice(b"0");
        return;
    }
    let mut text = format!("{value:.6}");
    if text.contains('.') {
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
    }
    if text.is_empty() || text == "-" {
        text.push('0');
    }
    out.extend_from_slice(text.as_bytes());
}

/// Re-escapes any byte outside `!..~` (and the PDF delimiters) as `#hh` (spec §4.1 "Name
/// objects").
fn write_name(name: &Name, out: &mut Vec<u8>) {
    out.push(b'/');
    for &byte in name {
        if byte.is_ascii_graphic() && !matches!(byte, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' | b'#') {
            out.push(byte);
        } else {
            out.push(b'#');
            out.extend_from_slice(format!("{byte:02X}").as_bytes());
        }
    }
}

/// Writes a string as a parenthesized literal (escaping backslash, parens and control bytes)
/// or as a `<hex>` string, following the format it was parsed with (spec §3 `StringFormat`).
fn write_string(bytes: &[u8], format: StringFormat, out: &mut Vec<u8>) {
    match format {
        StringFormat::Literal => {
            out.push(b'(');
            for &byte in bytes {
                match byte {
                    b'(' => out.extend_from_slice(b"\\("),
                    b')' => out.extend_from_slice(b"\\)"),
                    b'\\' => out.extend_from_slice(b"\\\\"),
                    b'\n' => out.extend_from_slice(b"\\n"),
                    b'\r' => out.extend_from_slice(b"\\r"),
                    b'\t' => out.extend_from_slice(b"\\t"),
                    _ => out.push(byte),
                }
            }
            out.push(b')');
        }
        StringFormat::Hexadecimal => {
            out.push(b'<');
            for &byte in bytes {
                out.extend_from_slice(format!("{byte:02X}").as_bytes());
            }
            out.push(b'>');
        }
    }
}

pub fn write_dictionary(dict: &Dictionary, out: &mut Vec<u8>) {
    out.extend_from_slice(b"<<");
    for (key, value) in dict.iter() {
        write_name(key, out);
        out.push(b' ');
        let _ = write_object(value, out);
    }
    out.extend_from_slice(b">>");
}

fn write_stream(stream: &Stream, out: &mut Vec<u8>) -> Result<()> {
    let mut dict = stream.dict.clone();
    dict.set("Length", Object::Integer(stream.content.len() as i64));
    write_dictionary(&dict, out);
    out.extend_from_slice(b"\nstream\n");
    out.extend_from_slice(&stream.content);
    out.extend_from_slice(b"\nendstream");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Dictionary, StringFormat};

    fn rendered(object: &Object) -> String {
        let mut out = Vec::new();
        write_object(object, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn integers_and_booleans_render_plainly() {
        assert_eq!(rendered(&Object::Integer(-17)), "-17");
        assert_eq!(rendered(&Object::Boolean(true)), "true");
        assert_eq!(rendered(&Object::Null), "null");
    }

    #[test]
    fn reals_trim_trailing_zeros_without_scientific_notation() {
        assert_eq!(rendered(&Object::Real(1.5)), "1.5");
        assert_eq!(rendered(&Object::Real(3.0)), "3");
        assert_eq!(rendered(&Object::Real(-0.125)), "-0.125");
    }

    #[test]
    fn names_escape_non_printable_and_delimiter_bytes() {
        let name = Object::Name(b"A Name/With#Stuff".to_vec());
        assert_eq!(rendered(&name), "/A#20Name#2FWith#23Stuff");
    }

    #[test]
    fn literal_strings_escape_parens_and_backslash() {
        let s = Object::String(b"a (b) \\ c".to_vec(), StringFormat::Literal);
        assert_eq!(rendered(&s), "(a \\(b\\) \\\\ c)");
    }

    #[test]
    fn hex_strings_render_uppercase_pairs() {
        let s = Object::String(vec![0xDE, 0xAD], StringFormat::Hexadecimal);
        assert_eq!(rendered(&s), "<DEAD>");
    }

    #[test]
    fn references_render_as_oid_gen_r() {
        assert_eq!(rendered(&Object::Reference((7, 2))), "7 2 R");
    }

    #[test]
    fn dictionaries_preserve_key_order() {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"Catalog".to_vec()));
        dict.set("Count", Object::Integer(3));
        assert_eq!(rendered(&Object::Dictionary(dict)), "<</Type /Catalog/Count 3>>");
    }

    #[test]
    fn indirect_object_wraps_with_header_and_endobj() {
        let mut out = Vec::new();
        write_indirect_object((3, 0), &Object::Integer(42), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "3 0 obj\n42\nendobj\n");
    }
}
