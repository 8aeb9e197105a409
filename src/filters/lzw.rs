use weezl::{decode::Decoder as WeezlDecoder, encode::Encoder as WeezlEncoder, BitOrder};

use super::{drain, Filter, Producer, SliceProducer};
use crate::error::{Error, Result};

/// `/LZWDecode` with the `/EarlyChange` flag (spec §4.4). PDF's LZW variant always uses MSB
/// bit order and an 8-bit minimum code size; `early_change` (default `true`, matching the PDF
/// default) controls whether the code width grows one code early, as `weezl`'s GIF-flavoured
/// encoder does.
pub struct LzwFilter {
    pub early_change: bool,
}

impl Default for LzwFilter {
    fn default() -> Self {
        LzwFilter { early_change: true }
    }
}

impl Filter for LzwFilter {
    fn encode<'a>(&self, source: Box<dyn Producer + 'a>) -> Result<Box<dyn Producer + 'a>> {
        let mut input = source;
        let data = drain(&mut *input)?;
        let mut encoder = if self.early_change {
            WeezlEncoder::new(BitOrder::Msb, 8)
        } else {
            WeezlEncoder::with_tiff_size_switch(BitOrder::Msb, 8)
        };
        let encoded = encoder
            .encode(&data)
            .map_err(|e| Error::Integrity(format!("LZW encode failed: {e}")))?;
        Ok(Box::new(SliceProducer::new(encoded)))
    }

    fn decode<'a>(&self, source: Box<dyn Producer + 'a>) -> Result<Box<dyn Producer + 'a>> {
        let mut input = source;
        let data = drain(&mut *input)?;
        let mut decoder = if self.early_change {
            WeezlDecoder::new(BitOrder::Msb, 8)
        } else {
            WeezlDecoder::with_tiff_size_switch(BitOrder::Msb, 8)
        };
        let decoded = decoder
            .decode(&data)
            .map_err(|e| Error::Integrity(format!("LZW decode failed: {e}")))?;
        Ok(Box::new(SliceProducer::new(decoded)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lzw_round_trips() {
        let filter = LzwFilter::default();
        let data = b"TOBEORNOTTOBEORTOBEORNOT".to_vec();
        let mut encoded = filter.encode(Box::new(SliceProducer::new(data.clone()))).unwrap();
        let encoded_bytes = drain(&mut *encoded).unwrap();
        let mut decoded = filter.decode(Box::new(SliceProducer::new(encoded_bytes))).unwrap();
        assert_eq!(drain(&mut *decoded).unwrap(), data);
    }

    #[test]
    fn lzw_without_early_change_round_trips() {
        let filter = LzwFilter { early_change: false };
        let data = b"AAAAAAAAAAAAAAAAAAAAABBBBBBBBBBBBBBBBBBBBBB".to_vec();
        let mut encoded = filter.encode(Box::new(SliceProducer::new(data.clone()))).unwrap();
        let encoded_bytes = drain(&mut *encoded).unwrap();
        let mut decoded = filter.decode(Box::new(SliceProducer::new(encoded_bytes))).unwrap();
        assert_eq!(drain(&mut *decoded).unwrap(), data);
    }
}
