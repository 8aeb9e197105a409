use super::{drain, Filter, Producer, SliceProducer};
use crate::error::{Error, ParseError, Result};

/// `/ASCIIHexDecode`: two hex digits per byte, terminated by `>`. Any whitespace between
/// digits is ignored; a trailing odd nibble is padded with `0` (spec §4.1/§4.4).
pub struct AsciiHexFilter;

impl Filter for AsciiHexFilter {
    fn encode<'a>(&self, source: Box<dyn Producer + 'a>) -> Result<Box<dyn Producer + 'a>> {
        let mut input = source;
        let data = drain(&mut *input)?;
        let mut out = Vec::with_capacity(data.len() * 2 + 1);
        for byte in data {
            out.push(hex_digit(byte >> 4));
            out.push(hex_digit(byte & 0x0f));
        }
        out.push(b'>');
        Ok(Box::new(SliceProducer::new(out)))
    }

    fn decode<'a>(&self, source: Box<dyn Producer + 'a>) -> Result<Box<dyn Producer + 'a>> {
        let mut input = source;
        let raw = drain(&mut *input)?;
        let mut digits: Vec<u8> = Vec::with_capacity(raw.len());
        for &b in &raw {
            if b == b'>' {
                break;
            }
            if b.is_ascii_whitespace() {
                continue;
            }
            digits.push(hex_value(b).ok_or(Error::Parse(ParseError::InvalidString))?);
        }
        if digits.len() % 2 != 0 {
            digits.push(0);
        }
        let out: Vec<u8> = digits.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect();
        Ok(Box::new(SliceProducer::new(out)))
    }
}

fn hex_digit(nibble: u8) -> u8 {
    match nibble {
        0..=9 => b'0' + nibble,
        10..=15 => b'A' + (nibble - 10),
        _ => unreachable!(),
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asciihex_round_trips() {
        let filter = AsciiHexFilter;
        let data = vec![0xDE, 0xAD, 0xBE, 0xEF];
        let mut encoded = filter.encode(Box::new(SliceProducer::new(data.clone()))).unwrap();
        let encoded_bytes = drain(&mut *encoded).unwrap();
        assert_eq!(encoded_bytes, b"DEADBEEF>");
        let mut decoded = filter.decode(Box::new(SliceProducer::new(encoded_bytes))).unwrap();
        assert_eq!(drain(&mut *decoded).unwrap(), data);
    }

    #[test]
    fn asciihex_pads_trailing_odd_nibble() {
        let filter = AsciiHexFilter;
        let mut decoded = filter.decode(Box::new(SliceProducer::new(b"ABC>".to_vec()))).unwrap();
        assert_eq!(drain(&mut *decoded).unwrap(), vec![0xAB, 0xC0]);
    }

    #[test]
    fn asciihex_ignores_whitespace() {
        let filter = AsciiHexFilter;
        let mut decoded = filter
            .decode(Box::new(SliceProducer::new(b"DE AD\nBE EF>".to_vec())))
            .unwrap();
        assert_eq!(drain(&mut *decoded).unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }
}
