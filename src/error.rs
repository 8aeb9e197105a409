use std::io;

use thiserror::Error;

use crate::object::ObjectId;

/// Malformed PDF syntax encountered while tokenizing or parsing a value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid file header")]
    InvalidFileHeader,
    #[error("invalid xref table or stream")]
    InvalidXref,
    #[error("invalid dictionary")]
    InvalidDictionary,
    #[error("invalid object stream")]
    InvalidObjectStream,
    #[error("invalid stream dictionary")]
    InvalidStreamDictionary,
    #[error("invalid number literal")]
    InvalidNumber,
    #[error("invalid name literal")]
    InvalidName,
    #[error("invalid string literal")]
    InvalidString,
    #[error("string literal nests parentheses deeper than the allowed limit")]
    StringTooDeep,
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },
    #[error("syntax error at offset {offset}: {reason}")]
    Syntax { offset: usize, reason: String },
}

/// Xref chain is inconsistent, unreachable, or loops back on itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XrefError {
    #[error("could not locate startxref")]
    Start,
    #[error("/Prev offset in xref chain is out of range")]
    PrevStart,
    #[error("/XRefStm offset is out of range")]
    StreamStart,
    #[error("xref stream has an invalid /W field")]
    StreamWidth,
    #[error("xref chain contains a loop")]
    Loop,
}

/// Errors surfaced by the security handler (spec §7 `EncryptionError`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncryptionError {
    #[error("incorrect password")]
    InvalidPassword,
    #[error("/Perms entry does not decrypt to the expected plaintext")]
    PermsMismatch,
    #[error("document trailer is missing /ID")]
    MissingId,
    #[error("unsupported security handler revision {0}")]
    UnsupportedRevision(u8),
    #[error("unsupported encryption /V value {0}")]
    UnsupportedVersion(i64),
    #[error("document has no /Encrypt dictionary")]
    NotEncrypted,
}

/// Errors surfaced while reserving, computing or patching a signature byte range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature reservation of {reserved} bytes is too small for a {required}-byte signature")]
    SignatureTooLarge { reserved: usize, required: usize },
    #[error("could not locate the /Contents token inside the written signature dictionary")]
    ContentsNotFound,
    #[error("timestamp authority request failed: {0}")]
    TsaUnreachable(String),
    #[error("signer callback failed: {0}")]
    SignerFailed(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Xref(#[from] XrefError),
    #[error(transparent)]
    Encryption(#[from] EncryptionError),
    #[error("could not decrypt object: {0}")]
    Decryption(EncryptionError),
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(&'static str),
    #[error("stream /Length mismatch or corrupt content: {0}")]
    Integrity(String),
    #[error("{0}")]
    Unimplemented(&'static str),
    #[error("invalid byte offset {0}")]
    InvalidOffset(usize),
    #[error("xref entry for object is missing")]
    MissingXrefEntry,
    #[error("object {0:?} references itself transitively")]
    ReferenceCycle(ObjectId),
    #[error("invalid stream: {0}")]
    InvalidStream(String),
    #[error("numeric conversion failed: {0}")]
    NumericCast(String),
    #[error("object is not of the requested type")]
    WrongObjectType,
    #[error("dictionary key not found")]
    DictKeyNotFound,
    #[error("incorrect password")]
    InvalidPassword,
    #[error("operation cancelled")]
    Cancelled,
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
