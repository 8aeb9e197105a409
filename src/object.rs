//! The PDF object model: the tagged union described in spec §3/§9 ("heterogeneous value
//! types" — never deep-copy on traversal, pattern-match at every boundary).

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;

use crate::error::{Error, ParseError, Result};

/// `(object number, generation number)`. `oid = 0` denotes a not-yet-assigned object; the
/// head of the free list is conventionally `(0, 65535)`.
pub type ObjectId = (u32, u16);

/// A PDF name, stored as its raw (already `#hh`-decoded) bytes. Interning is left to callers;
/// equality/hash are structural on the byte string, which is what round-trip fidelity needs.
pub type Name = Vec<u8>;

/// How a byte string should be serialized: parenthesized literal syntax or `<hex>` syntax.
/// Stored alongside the bytes so a round trip reproduces the original encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringFormat {
    Literal,
    Hexadecimal,
}

/// An ordered mapping from PDF names to objects. Insertion order is preserved so that
/// serialization reproduces the original byte layout of a parsed dictionary (spec §3).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary(IndexMap<Name, Object>);

impl Dictionary {
    pub fn new() -> Self {
        Dictionary(IndexMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &Object)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Name, &mut Object)> {
        self.0.iter_mut()
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &[u8]) -> Result<&Object> {
        self.0.get(key).ok_or(Error::DictKeyNotFound)
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Result<&mut Object> {
        self.0.get_mut(key).ok_or(Error::DictKeyNotFound)
    }

    /// Insert-or-replace, preserving the position of an existing key (round-trip fidelity).
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<Name>,
        V: Into<Object>,
    {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<Object> {
        self.0.shift_remove(key)
    }

    pub fn get_type(&self) -> Result<&[u8]> {
        self.get(b"Type").and_then(Object::as_name)
    }

    pub fn has_type(&self, type_name: &[u8]) -> bool {
        matches!(self.get_type(), Ok(t) if t == type_name)
    }

}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a Name, &'a Object);
    type IntoIter = indexmap::map::Iter<'a, Name, Object>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Convenience macro mirroring the teacher's `dictionary!` — builds a [`Dictionary`] from
/// `"Key" => value` pairs, converting each value with [`Into<Object>`].
#[macro_export]
macro_rules! dictionary {
    () => { $crate::object::Dictionary::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut dict = $crate::object::Dictionary::new();
        $(dict.set($key, $value);)+
        dict
    }};
}

/// The lazy payload of a stream object: either fully materialized bytes, or bytes that have
/// not yet been read off disk (the reader defers the seek until the content is requested, per
/// spec §4.1/§4.6).
#[derive(Debug, Clone, PartialEq)]
pub enum StreamContent {
    Owned(Vec<u8>),
    /// Not yet read: the byte offset in the source buffer where the raw (encoded) payload
    /// begins. Populated by the parser, resolved by `Reader::read_stream_content`.
    Deferred,
}

/// `Dictionary` + binary payload (spec §3 "Stream"). Always carries `/Length` in `dict`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    pub content: Vec<u8>,
    /// Byte offset of the raw (still filtered) stream body in the source buffer, set by the
    /// parser so `Reader::read_stream_content` can seek back for zero-length-at-parse-time
    /// streams (object streams reference objects before their own length is known).
    pub start_position: Option<usize>,
    /// Whether `content` already had its filter chain applied.
    pub decoded: bool,
}

impl Stream {
    pub fn new(dict: Dictionary, content: Vec<u8>) -> Self {
        let mut dict = dict;
        dict.set("Length", Object::Integer(content.len() as i64));
        Stream {
            dict,
            content,
            start_position: None,
            decoded: false,
        }
    }

    pub fn set_content(&mut self, content: Vec<u8>) {
        self.dict.set("Length", Object::Integer(content.len() as i64));
        self.content = content;
        self.decoded = false;
    }

    pub fn filters(&self) -> Result<Vec<Name>> {
        match self.dict.get(b"Filter") {
            Ok(Object::Name(name)) => Ok(vec![name.clone()]),
            Ok(Object::Array(arr)) => arr.iter().map(|o| o.as_name().map(|n| n.to_vec())).collect(),
            Ok(_) => Err(Error::Parse(ParseError::InvalidStreamDictionary)),
            Err(_) => Ok(Vec::new()),
        }
    }

    pub fn decode_parms(&self) -> Vec<Option<Dictionary>> {
        match self.dict.get(b"DecodeParms") {
            Ok(Object::Dictionary(d)) => vec![Some(d.clone())],
            Ok(Object::Array(arr)) => arr
                .iter()
                .map(|o| match o {
                    Object::Dictionary(d) => Some(d.clone()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_compressed_object_stream(&self) -> bool {
        self.dict.has_type(b"ObjStm")
    }

    pub fn is_xref_stream(&self) -> bool {
        self.dict.has_type(b"XRef")
    }
}

/// The tagged union of every PDF value kind (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Name(Name),
    String(Vec<u8>, StringFormat),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    Reference(ObjectId),
    Stream(Stream),
}

impl Object {
    pub fn string_literal<S: Into<Vec<u8>>>(s: S) -> Self {
        Object::String(s.into(), StringFormat::Literal)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Object::Boolean(b) => Ok(*b),
            _ => Err(Error::WrongObjectType),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Object::Integer(i) => Ok(*i),
            Object::Real(r) => Ok(*r as i64),
            _ => Err(Error::WrongObjectType),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Object::Integer(i) => Ok(*i as f64),
            Object::Real(r) => Ok(*r),
            _ => Err(Error::WrongObjectType),
        }
    }

    pub fn as_name(&self) -> Result<&[u8]> {
        match self {
            Object::Name(n) => Ok(n),
            _ => Err(Error::WrongObjectType),
        }
    }

    pub fn as_str(&self) -> Result<&[u8]> {
        match self {
            Object::String(s, _) => Ok(s),
            _ => Err(Error::WrongObjectType),
        }
    }

    pub fn as_str_mut(&mut self) -> Result<&mut Vec<u8>> {
        match self {
            Object::String(s, _) => Ok(s),
            _ => Err(Error::WrongObjectType),
        }
    }

    pub fn as_array(&self) -> Result<&[Object]> {
        match self {
            Object::Array(a) => Ok(a),
            _ => Err(Error::WrongObjectType),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Vec<Object>> {
        match self {
            Object::Array(a) => Ok(a),
            _ => Err(Error::WrongObjectType),
        }
    }

    pub fn as_dict(&self) -> Result<&Dictionary> {
        match self {
            Object::Dictionary(d) => Ok(d),
            Object::Stream(s) => Ok(&s.dict),
            _ => Err(Error::WrongObjectType),
        }
    }

    pub fn as_dict_mut(&mut self) -> Result<&mut Dictionary> {
        match self {
            Object::Dictionary(d) => Ok(d),
            Object::Stream(s) => Ok(&mut s.dict),
            _ => Err(Error::WrongObjectType),
        }
    }

    pub fn as_stream(&self) -> Result<&Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            _ => Err(Error::WrongObjectType),
        }
    }

    pub fn as_stream_mut(&mut self) -> Result<&mut Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            _ => Err(Error::WrongObjectType),
        }
    }

    pub fn as_reference(&self) -> Result<ObjectId> {
        match self {
            Object::Reference(id) => Ok(*id),
            _ => Err(Error::WrongObjectType),
        }
    }

    pub fn has_type(&self, type_name: &[u8]) -> bool {
        self.as_dict().map(|d| d.has_type(type_name)).unwrap_or(false)
    }

    /// Walks the graph rooted at `self`, substituting references with their targets, stopping
    /// at objects already visited so self-referential dictionaries never cause infinite
    /// recursion (spec §9 "Cyclic object graphs").
    pub fn deep_clone_resolved(&self, resolve: &dyn Fn(ObjectId) -> Option<Object>) -> Object {
        fn walk(obj: &Object, resolve: &dyn Fn(ObjectId) -> Option<Object>, seen: &mut std::collections::HashSet<ObjectId>) -> Object {
            match obj {
                Object::Reference(id) => {
                    if !seen.insert(*id) {
                        return Object::Null;
                    }
                    match resolve(*id) {
                        Some(target) => walk(&target, resolve, seen),
                        None => Object::Null,
                    }
                }
                Object::Array(items) => Object::Array(items.iter().map(|o| walk(o, resolve, seen)).collect()),
                Object::Dictionary(dict) => {
                    let mut out = Dictionary::new();
                    for (k, v) in dict.iter() {
                        out.set(k.clone(), walk(v, resolve, seen));
                    }
                    Object::Dictionary(out)
                }
                other => other.clone(),
            }
        }
        let mut seen = std::collections::HashSet::new();
        walk(self, resolve, &mut seen)
    }
}

impl fmt::Display for StringFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringFormat::Literal => write!(f, "literal"),
            StringFormat::Hexadecimal => write!(f, "hex"),
        }
    }
}

macro_rules! impl_from_for_object {
    ($ty:ty, $variant:ident, $conv:expr) => {
        impl From<$ty> for Object {
            fn from(value: $ty) -> Self {
                Object::$variant($conv(value))
            }
        }
    };
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Object::Boolean(value)
    }
}
impl_from_for_object!(i64, Integer, |v| v);
impl_from_for_object!(i32, Integer, |v: i32| v as i64);
impl_from_for_object!(u32, Integer, |v: u32| v as i64);
impl_from_for_object!(f64, Real, |v| v);
impl_from_for_object!(f32, Real, |v: f32| v as f64);

impl From<&str> for Object {
    fn from(value: &str) -> Self {
        Object::Name(value.as_bytes().to_vec())
    }
}
impl From<String> for Object {
    fn from(value: String) -> Self {
        Object::Name(value.into_bytes())
    }
}
impl From<Vec<u8>> for Object {
    fn from(value: Vec<u8>) -> Self {
        Object::Name(value)
    }
}
impl From<Dictionary> for Object {
    fn from(value: Dictionary) -> Self {
        Object::Dictionary(value)
    }
}
impl From<Vec<Object>> for Object {
    fn from(value: Vec<Object>) -> Self {
        Object::Array(value)
    }
}
impl From<ObjectId> for Object {
    fn from(value: ObjectId) -> Self {
        Object::Reference(value)
    }
}
impl From<Stream> for Object {
    fn from(value: Stream) -> Self {
        Object::Stream(value)
    }
}

#[cfg(feature = "chrono")]
mod datetime {
    use super::*;
    use chrono::{DateTime, FixedOffset, Local, TimeZone};

    impl From<DateTime<Local>> for Object {
        fn from(time: DateTime<Local>) -> Self {
            let offset = time.offset().local_minus_utc();
            let sign = if offset < 0 { '-' } else { '+' };
            let hours = offset.abs() / 3600;
            let minutes = (offset.abs() % 3600) / 60;
            let text = format!(
                "D:{}{}{:02}'{:02}'",
                time.format("%Y%m%d%H%M%S"),
                sign,
                hours,
                minutes
            );
            Object::string_literal(text)
        }
    }

    impl Object {
        /// Parses the PDF date format `D:YYYYMMDDHHmmSSOHH'mm'` produced by `From<DateTime<Local>>`.
        pub fn as_datetime(&self) -> Option<DateTime<FixedOffset>> {
            let bytes = self.as_str().ok()?;
            let s = std::str::from_utf8(bytes).ok()?;
            let s = s.strip_prefix("D:").unwrap_or(s);
            if s.len() < 14 {
                return None;
            }
            let year: i32 = s.get(0..4)?.parse().ok()?;
            let month: u32 = s.get(4..6)?.parse().ok()?;
            let day: u32 = s.get(6..8)?.parse().ok()?;
            let hour: u32 = s.get(8..10)?.parse().ok()?;
            let minute: u32 = s.get(10..12)?.parse().ok()?;
            let second: u32 = s.get(12..14)?.parse().ok()?;
            let rest = &s[14..];
            let offset_seconds = if let Some(sign) = rest.chars().next() {
                let sign = if sign == '-' { -1 } else { 1 };
                let digits: String = rest.chars().filter(|c| c.is_ascii_digit()).collect();
                let hh: i32 = digits.get(0..2)?.parse().ok()?;
                let mm: i32 = digits.get(2..4).unwrap_or("0").parse().unwrap_or(0);
                sign * (hh * 3600 + mm * 60)
            } else {
                0
            };
            let offset = FixedOffset::east_opt(offset_seconds)?;
            offset
                .with_ymd_and_hms(year, month, day, hour, minute, second)
                .single()
        }
    }
}
