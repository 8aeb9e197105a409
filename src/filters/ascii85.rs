use super::{drain, Filter, Producer, SliceProducer};
use crate::error::{Error, ParseError, Result};

/// `/ASCII85Decode`: base-85 text encoding terminated by `~>` (spec §4.4).
pub struct Ascii85Filter;

impl Filter for Ascii85Filter {
    fn encode<'a>(&self, source: Box<dyn Producer + 'a>) -> Result<Box<dyn Producer + 'a>> {
        let mut input = source;
        let data = drain(&mut *input)?;
        let mut out = Vec::with_capacity(data.len() * 5 / 4 + 8);
        for chunk in data.chunks(4) {
            if chunk.len() == 4 && chunk == [0, 0, 0, 0] {
                out.push(b'z');
                continue;
            }
            let mut buf = [0u8; 4];
            buf[..chunk.len()].copy_from_slice(chunk);
            let value = u32::from_be_bytes(buf);
            let mut digits = [0u8; 5];
            let mut v = value;
            for i in (0..5).rev() {
                digits[i] = b'!' + (v % 85) as u8;
                v /= 85;
            }
            out.extend_from_slice(&digits[..chunk.len() + 1]);
        }
        out.extend_from_slice(b"~>");
        Ok(Box::new(SliceProducer::new(out)))
    }

    fn decode<'a>(&self, source: Box<dyn Producer + 'a>) -> Result<Box<dyn Producer + 'a>> {
        let mut input = source;
        let raw = drain(&mut *input)?;
        let mut data: Vec<u8> = raw
            .iter()
            .copied()
            .take_while(|&b| !(b == b'~'))
            .filter(|b| !b.is_ascii_whitespace())
            .collect();

        let mut out = Vec::with_capacity(data.len() * 4 / 5);
        let mut i = 0;
        while i < data.len() {
            if data[i] == b'z' {
                out.extend_from_slice(&[0, 0, 0, 0]);
                i += 1;
                continue;
            }
            let remaining = data.len() - i;
            let group_len = remaining.min(5);
            let mut group = [b'u'; 5];
            group[..group_len].copy_from_slice(&data[i..i + group_len]);
            let mut value: u32 = 0;
            for &c in &group {
                if !(b'!'..=b'u').contains(&c) {
                    return Err(Error::Parse(ParseError::InvalidString));
                }
                value = value
                    .checked_mul(85)
                    .and_then(|v| v.checked_add((c - b'!') as u32))
                    .ok_or(Error::Parse(ParseError::InvalidString))?;
            }
            let bytes = value.to_be_bytes();
            let n = group_len.saturating_sub(1).max(1);
            out.extend_from_slice(&bytes[..n]);
            i += group_len;
        }
        data.clear();
        Ok(Box::new(SliceProducer::new(out)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii85_round_trips() {
        let filter = Ascii85Filter;
        let data = b"Man is distinguished".to_vec();
        let mut encoded = filter.encode(Box::new(SliceProducer::new(data.clone()))).unwrap();
        let encoded_bytes = drain(&mut *encoded).unwrap();
        let mut decoded = filter.decode(Box::new(SliceProducer::new(encoded_bytes))).unwrap();
        assert_eq!(drain(&mut *decoded).unwrap(), data);
    }

    #[test]
    fn ascii85_all_zero_group_encodes_as_z() {
        let filter = Ascii85Filter;
        let data = vec![0u8; 4];
        let mut encoded = filter.encode(Box::new(SliceProducer::new(data))).unwrap();
        let encoded_bytes = drain(&mut *encoded).unwrap();
        assert_eq!(&encoded_bytes, b"z~>");
    }
}
