//! The stream filter pipeline (spec §4.4): chained lazy byte transformations used by streams.
//!
//! Filters are producer-to-producer transforms. A [`Producer`] is a cooperative generator
//! that yields chunks of bytes and terminates — the redesign note in spec §9 replaces the
//! source's fiber-based scheduler with plain function composition: `decode` wraps one
//! producer in another, no scheduler involved.

mod ascii85;
mod asciihex;
mod crypt;
mod flate;
mod lzw;
mod predictor;
mod run_length;

pub use ascii85::Ascii85Filter;
pub use asciihex::AsciiHexFilter;
pub use crypt::CryptFilter;
pub use flate::FlateFilter;
pub use lzw::LzwFilter;
pub use run_length::RunLengthFilter;

use crate::error::{Error, Result};
use crate::object::Dictionary;

/// A cooperative generator yielding chunks of bytes. `next_chunk` returning `Ok(None)` signals
/// end-of-stream; it must never be called again afterwards.
pub trait Producer {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Drains a producer to completion, concatenating every chunk. Used at the outermost
/// source/sink boundary (spec §5 "I/O is performed by the outermost source/sink").
pub fn drain(producer: &mut dyn Producer) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    while let Some(chunk) = producer.next_chunk()? {
        out.extend(chunk);
    }
    Ok(out)
}

/// Yields a byte buffer in fixed-size chunks.
pub struct SliceProducer {
    data: Vec<u8>,
    pos: usize,
    chunk_size: usize,
}

impl SliceProducer {
    pub fn new(data: Vec<u8>) -> Self {
        SliceProducer {
            data,
            pos: 0,
            chunk_size: 8192,
        }
    }
}

impl Producer for SliceProducer {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let end = (self.pos + self.chunk_size).min(self.data.len());
        let chunk = self.data[self.pos..end].to_vec();
        self.pos = end;
        Ok(Some(chunk))
    }
}

/// Adapts a [`Producer`] into a [`std::io::Read`] so it can feed a `flate2` reader-side codec.
pub struct ProducerRead<'a> {
    producer: Box<dyn Producer + 'a>,
    leftover: Vec<u8>,
    leftover_pos: usize,
    done: bool,
}

impl<'a> ProducerRead<'a> {
    pub fn new(producer: Box<dyn Producer + 'a>) -> Self {
        ProducerRead {
            producer,
            leftover: Vec::new(),
            leftover_pos: 0,
            done: false,
        }
    }
}

impl std::io::Read for ProducerRead<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            if self.leftover_pos < self.leftover.len() {
                let n = (self.leftover.len() - self.leftover_pos).min(buf.len());
                buf[..n].copy_from_slice(&self.leftover[self.leftover_pos..self.leftover_pos + n]);
                self.leftover_pos += n;
                return Ok(n);
            }
            if self.done {
                return Ok(0);
            }
            match self.producer.next_chunk() {
                Ok(Some(chunk)) => {
                    self.leftover = chunk;
                    self.leftover_pos = 0;
                }
                Ok(None) => {
                    self.done = true;
                    return Ok(0);
                }
                Err(e) => return Err(std::io::Error::other(e.to_string())),
            }
        }
    }
}

/// Wraps any [`std::io::Read`] (e.g. a `flate2` decoder/encoder) back up as a [`Producer`].
pub struct ReadProducer<R> {
    reader: R,
    buf_size: usize,
}

impl<R: std::io::Read> ReadProducer<R> {
    pub fn new(reader: R) -> Self {
        ReadProducer { reader, buf_size: 8192 }
    }
}

impl<R: std::io::Read> Producer for ReadProducer<R> {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; self.buf_size];
        let n = self.reader.read(&mut buf).map_err(Error::Io)?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }
}

/// A named filter's encode/decode pair (spec §4.4).
pub trait Filter {
    fn encode<'a>(&self, source: Box<dyn Producer + 'a>) -> Result<Box<dyn Producer + 'a>>;
    fn decode<'a>(&self, source: Box<dyn Producer + 'a>) -> Result<Box<dyn Producer + 'a>>;
}

/// Looks up a filter implementation by its PDF name. `DCTDecode`/`JPXDecode`/`CCITTFaxDecode`
/// are pass-through on read and never re-encoded (spec §4.4).
pub fn filter_by_name(name: &[u8]) -> Result<Box<dyn Filter>> {
    match name {
        b"FlateDecode" | b"Fl" => Ok(Box::new(FlateFilter)),
        b"LZWDecode" | b"LZW" => Ok(Box::new(LzwFilter::default())),
        b"ASCII85Decode" | b"A85" => Ok(Box::new(Ascii85Filter)),
        b"ASCIIHexDecode" | b"AHx" => Ok(Box::new(AsciiHexFilter)),
        b"RunLengthDecode" | b"RL" => Ok(Box::new(RunLengthFilter)),
        b"Crypt" => Ok(Box::new(CryptFilter)),
        b"DCTDecode" | b"DCT" | b"JPXDecode" | b"CCITTFaxDecode" | b"CCF" => Ok(Box::new(PassThroughFilter)),
        other => Err(Error::UnsupportedFeature(Box::leak(
            format!("unknown filter {:?}", String::from_utf8_lossy(other)).into_boxed_str(),
        ))),
    }
}

struct PassThroughFilter;
impl Filter for PassThroughFilter {
    fn encode<'a>(&self, source: Box<dyn Producer + 'a>) -> Result<Box<dyn Producer + 'a>> {
        Ok(source)
    }
    fn decode<'a>(&self, source: Box<dyn Producer + 'a>) -> Result<Box<dyn Producer + 'a>> {
        Ok(source)
    }
}

/// Runs the full `/Filter` chain in declared order for encode, reverse order for decode (spec
/// §4.4 "Chaining"), applying the matching `/DecodeParms` entry (by position) to each stage's
/// PNG-style predictor when present.
pub fn decode_chain(data: Vec<u8>, filters: &[Vec<u8>], parms: &[Option<Dictionary>]) -> Result<Vec<u8>> {
    let mut producer: Box<dyn Producer> = Box::new(SliceProducer::new(data));
    for (i, name) in filters.iter().enumerate() {
        let filter = filter_by_name(name)?;
        producer = filter.decode(producer)?;
        if let Some(Some(parm)) = parms.get(i) {
            let bytes = drain(&mut *producer)?;
            let bytes = predictor::maybe_unpredict(bytes, parm)?;
            producer = Box::new(SliceProducer::new(bytes));
        }
    }
    drain(&mut *producer)
}

pub fn encode_chain(data: Vec<u8>, filters: &[Vec<u8>]) -> Result<Vec<u8>> {
    let mut producer: Box<dyn Producer> = Box::new(SliceProducer::new(data));
    for name in filters.iter().rev() {
        let filter = filter_by_name(name)?;
        producer = filter.encode(producer)?;
    }
    drain(&mut *producer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_producer_yields_whole_buffer() {
        let data = vec![1u8, 2, 3, 4, 5];
        let mut producer = SliceProducer::new(data.clone());
        assert_eq!(drain(&mut producer).unwrap(), data);
    }

    #[test]
    fn pass_through_filter_is_identity() {
        let filter = PassThroughFilter;
        let data = vec![9u8, 9, 9];
        let producer = Box::new(SliceProducer::new(data.clone()));
        let mut decoded = filter.decode(producer).unwrap();
        assert_eq!(drain(&mut *decoded).unwrap(), data);
    }
}
