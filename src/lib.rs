//! Core object model and I/O engine for reading, mutating and byte-exact writing PDF documents:
//! xref/revisions, object streams, the filter pipeline, the standard security handler and the
//! digital-signature byte-range orchestrator.

pub mod config;
pub mod crypto;
pub mod document;
pub mod encryption;
pub mod error;
pub mod filters;
pub mod object;
pub mod object_stream;
pub mod parser;
pub mod permissions;
pub mod reader;
pub mod signature;
pub mod writer;
pub mod xref;

pub use config::Config;
pub use document::{Document, IncrementalDocument};
pub use error::{Error, Result};
pub use object::{Dictionary, Name, Object, ObjectId, Stream, StringFormat};
pub use permissions::Permissions;
pub use signature::{DigestAlgorithm, Signer, SignatureField, SubFilter, TimestampAuthority};
pub use writer::{SaveOptions, SaveOptionsBuilder};
