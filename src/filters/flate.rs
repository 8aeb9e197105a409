use flate2::read::{ZlibDecoder, ZlibEncoder};
use flate2::Compression;

use super::{Filter, Producer, ProducerRead, ReadProducer};
use crate::error::Result;

/// `/FlateDecode`: zlib-wrapped DEFLATE, streamed through `flate2`'s `Read` adapters so large
/// streams never need to be fully materialized before the next stage runs (spec §4.4).
pub struct FlateFilter;

impl Filter for FlateFilter {
    fn encode<'a>(&self, source: Box<dyn Producer + 'a>) -> Result<Box<dyn Producer + 'a>> {
        let reader = ProducerRead::new(source);
        let encoder = ZlibEncoder::new(reader, Compression::default());
        Ok(Box::new(ReadProducer::new(encoder)))
    }

    fn decode<'a>(&self, source: Box<dyn Producer + 'a>) -> Result<Box<dyn Producer + 'a>> {
        let reader = ProducerRead::new(source);
        let decoder = ZlibDecoder::new(reader);
        Ok(Box::new(ReadProducer::new(decoder)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{drain, SliceProducer};

    #[test]
    fn flate_round_trips() {
        let filter = FlateFilter;
        let data = b"the quick brown fox jumps over the lazy dog".repeat(50);
        let mut encoded_producer = filter.encode(Box::new(SliceProducer::new(data.clone()))).unwrap();
        let encoded = drain(&mut *encoded_producer).unwrap();
        assert!(encoded.len() < data.len());

        let mut decoded_producer = filter.decode(Box::new(SliceProducer::new(encoded))).unwrap();
        let decoded = drain(&mut *decoded_producer).unwrap();
        assert_eq!(decoded, data);
    }
}
