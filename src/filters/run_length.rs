use super::{drain, Filter, Producer, SliceProducer};
use crate::error::Result;

/// `/RunLengthDecode` (PackBits-style): length byte `0..=127` copies `len+1` literal bytes,
/// `129..=255` repeats the following byte `257-len` times, `128` is end-of-data (spec §4.4).
pub struct RunLengthFilter;

impl Filter for RunLengthFilter {
    fn encode<'a>(&self, source: Box<dyn Producer + 'a>) -> Result<Box<dyn Producer + 'a>> {
        let mut input = source;
        let data = drain(&mut *input)?;
        let mut out = Vec::new();
        let mut i = 0;
        while i < data.len() {
            let run_start = i;
            while i + 1 < data.len() && data[i] == data[i + 1] && i - run_start < 127 {
                i += 1;
            }
            if i > run_start {
                out.push((257 - (i - run_start + 1)) as u8);
                out.push(data[run_start]);
                i += 1;
            } else {
                let literal_start = i;
                while i + 1 < data.len() && data[i] != data[i + 1] && i - literal_start < 127 {
                    i += 1;
                }
                if i == data.len() - 1 {
                    i += 1;
                }
                out.push((i - literal_start - 1) as u8);
                out.extend_from_slice(&data[literal_start..i]);
            }
        }
        out.push(128);
        Ok(Box::new(SliceProducer::new(out)))
    }

    fn decode<'a>(&self, source: Box<dyn Producer + 'a>) -> Result<Box<dyn Producer + 'a>> {
        let mut input = source;
        let data = drain(&mut *input)?;
        let mut out = Vec::new();
        let mut i = 0;
        while i < data.len() {
            let len = data[i];
            i += 1;
            if len == 128 {
                break;
            } else if len < 128 {
                let count = len as usize + 1;
                if i + count > data.len() {
                    break;
                }
                out.extend_from_slice(&data[i..i + count]);
                i += count;
            } else {
                if i >= data.len() {
                    break;
                }
                let count = 257 - len as usize;
                out.extend(std::iter::repeat(data[i]).take(count));
                i += 1;
            }
        }
        Ok(Box::new(SliceProducer::new(out)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_length_round_trips_mixed_data() {
        let filter = RunLengthFilter;
        let data = b"AAAAABCDEFFFFFFFFFFG".to_vec();
        let mut encoded = filter.encode(Box::new(SliceProducer::new(data.clone()))).unwrap();
        let encoded_bytes = drain(&mut *encoded).unwrap();
        let mut decoded = filter.decode(Box::new(SliceProducer::new(encoded_bytes))).unwrap();
        assert_eq!(drain(&mut *decoded).unwrap(), data);
    }

    #[test]
    fn run_length_decode_stops_at_marker() {
        let filter = RunLengthFilter;
        let encoded = vec![2, b'a', b'b', b'c', 128, 9, 9, 9];
        let mut decoded = filter.decode(Box::new(SliceProducer::new(encoded))).unwrap();
        assert_eq!(drain(&mut *decoded).unwrap(), b"abc".to_vec());
    }
}
