//! Object streams (spec §4.3): packing non-stream, generation-0, non-`/Encrypt` objects into a
//! single compressed `/Type /ObjStm` container to cut down on repeated dictionary overhead.

use std::collections::BTreeMap;

use crate::error::{Error, ParseError, Result};
use crate::filters::{decode_chain, encode_chain};
use crate::object::{Dictionary, Object, ObjectId, Stream};
use crate::parser::{self, ParserInput};

/// A parsed object stream: every packed object, keyed by `(object number, 0)` — compressed
/// objects always carry an implicit generation of zero (spec §4.3).
pub struct ObjectStream {
    pub objects: BTreeMap<ObjectId, Object>,
}

impl ObjectStream {
    /// Decodes `stream`'s filter chain (memoizing the result onto `stream` itself) and unpacks
    /// every object named in its `(objnum, offset)` header table.
    pub fn new(stream: &mut Stream) -> Result<Self> {
        let n = stream
            .dict
            .get(b"N")
            .and_then(|o| o.as_i64())
            .map_err(|_| Error::Parse(ParseError::InvalidObjectStream))? as usize;
        let first = stream
            .dict
            .get(b"First")
            .and_then(|o| o.as_i64())
            .map_err(|_| Error::Parse(ParseError::InvalidObjectStream))? as usize;

        if !stream.decoded {
            let filters = stream.filters().unwrap_or_default();
            let parms = stream.decode_parms();
            let decoded = if filters.is_empty() {
                stream.content.clone()
            } else {
                decode_chain(stream.content.clone(), &filters, &parms)?
            };
            stream.content = decoded;
            stream.decoded = true;
        }

        let decoded = &stream.content;
        if first > decoded.len() {
            return Err(Error::Parse(ParseError::InvalidObjectStream));
        }

        let header =
            std::str::from_utf8(&decoded[..first]).map_err(|_| Error::Parse(ParseError::InvalidObjectStream))?;
        let mut numbers = header.split_ascii_whitespace().map(|tok| tok.parse::<u32>());
        let mut pairs = Vec::with_capacity(n);
        for _ in 0..n {
            let oid = numbers
                .next()
                .and_then(|r| r.ok())
                .ok_or(Error::Parse(ParseError::InvalidObjectStream))?;
            let offset = numbers
                .next()
                .and_then(|r| r.ok())
                .ok_or(Error::Parse(ParseError::InvalidObjectStream))?;
            pairs.push((oid, offset));
        }

        let mut objects = BTreeMap::new();
        for (oid, offset) in pairs {
            let start = first + offset as usize;
            if start > decoded.len() {
                continue;
            }
            let span = ParserInput::new_extra(&decoded[start..], "objstm-entry");
            let value = parser::parse_direct_object(span)?;
            objects.insert((oid, 0), value);
        }

        Ok(ObjectStream { objects })
    }
}

/// Selects which in-use objects are eligible for packing into an object stream on write (spec
/// §4.3 "Packing eligibility"): generation must be zero, the object itself must not be a
/// stream, and it must not be the `/Encrypt` dictionary (which has to stay plaintext and
/// directly addressable for the security handler to bootstrap).
#[derive(Debug, Clone, Default)]
pub struct ObjectStreamConfig {
    pub max_objects_per_stream: usize,
}

impl ObjectStreamConfig {
    pub fn is_eligible(&self, id: ObjectId, object: &Object, encrypt_ref: Option<ObjectId>) -> bool {
        if id.1 != 0 {
            return false;
        }
        if matches!(object, Object::Stream(_)) {
            return false;
        }
        if Some(id) == encrypt_ref {
            return false;
        }
        true
    }
}

/// Packs a batch of eligible objects into one or more `/ObjStm` streams, each compressed with
/// `/FlateDecode` (spec §4.3). Returns the built stream objects in emission order; the writer
/// assigns them their own object numbers and records the packed ids in the new cross-reference
/// table as `Compressed` entries.
pub struct ObjectStreamBuilder {
    config: ObjectStreamConfig,
}

impl ObjectStreamBuilder {
    pub fn new(config: ObjectStreamConfig) -> Self {
        ObjectStreamBuilder { config }
    }

    pub fn pack(&self, objects: &[(ObjectId, Object)]) -> Result<Vec<(Vec<ObjectId>, Stream)>> {
        let chunk_size = if self.config.max_objects_per_stream == 0 {
            objects.len().max(1)
        } else {
            self.config.max_objects_per_stream
        };

        let mut out = Vec::new();
        for chunk in objects.chunks(chunk_size.max(1)) {
            if chunk.is_empty() {
                continue;
            }
            out.push(self.pack_one(chunk)?);
        }
        Ok(out)
    }

    fn pack_one(&self, chunk: &[(ObjectId, Object)]) -> Result<(Vec<ObjectId>, Stream)> {
        let mut header = String::new();
        let mut body = Vec::new();
        let mut ids = Vec::with_capacity(chunk.len());

        for (id, object) in chunk {
            let offset = body.len();
            header.push_str(&format!("{} {} ", id.0, offset));
            serialize_direct_object(object, &mut body)?;
            body.push(b' ');
            ids.push(*id);
        }

        let first = header.len();
        let mut content = header.into_bytes();
        content.extend_from_slice(&body);

        let compressed = encode_chain(content, &[b"FlateDecode".to_vec()])?;

        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"ObjStm".to_vec()));
        dict.set("N", Object::Integer(chunk.len() as i64));
        dict.set("First", Object::Integer(first as i64));
        dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));

        Ok((ids, Stream::new(dict, compressed)))
    }
}

/// Serializes a value using the same grammar the writer uses for ordinary objects (spec §5) —
/// object streams never contain references to other streams or themselves, so this never
/// recurses into [`Object::Stream`].
fn serialize_direct_object(object: &Object, out: &mut Vec<u8>) -> Result<()> {
    crate::writer::serialize::write_object(object, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Dictionary, Object};

    #[test]
    fn pack_and_unpack_round_trips() {
        let mut dict_a = Dictionary::new();
        dict_a.set("Type", Object::Name(b"Example".to_vec()));
        let objects = vec![
            ((1u32, 0u16), Object::Dictionary(dict_a)),
            ((2u32, 0u16), Object::Integer(42)),
        ];

        let builder = ObjectStreamBuilder::new(ObjectStreamConfig::default());
        let packed = builder.pack(&objects).unwrap();
        assert_eq!(packed.len(), 1);
        let (ids, mut stream) = packed.into_iter().next().unwrap();
        assert_eq!(ids, vec![(1, 0), (2, 0)]);

        let unpacked = ObjectStream::new(&mut stream).unwrap();
        assert_eq!(unpacked.objects.get(&(2, 0)), Some(&Object::Integer(42)));
        assert!(matches!(unpacked.objects.get(&(1, 0)), Some(Object::Dictionary(_))));
    }

    #[test]
    fn eligibility_excludes_generation_and_streams_and_encrypt() {
        let config = ObjectStreamConfig::default();
        assert!(!config.is_eligible((1, 1), &Object::Integer(1), None));
        assert!(!config.is_eligible(
            (1, 0),
            &Object::Stream(Stream::new(Dictionary::new(), vec![])),
            None
        ));
        assert!(!config.is_eligible((5, 0), &Object::Integer(1), Some((5, 0))));
        assert!(config.is_eligible((5, 0), &Object::Integer(1), Some((6, 0))));
    }
}
