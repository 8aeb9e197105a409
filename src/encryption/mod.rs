//! The Standard Security Handler (spec §4.7): password authentication, per-object key
//! derivation and string/stream decryption. The handler's algorithms (padding, iterated
//! hashing, `/O`/`/U`/`/OE`/`/UE`/`/Perms`) live in [`standard`]; this module wires them to the
//! object graph.

mod standard;

use crate::crypto::{self, arc4::Arc4, Aes128Cbc, Aes256Cbc, SymmetricCipher};
use crate::document::Document;
use crate::error::{EncryptionError, Result};
use crate::object::{Object, ObjectId};

pub use standard::set_up_encryption;

/// Which cipher a crypt filter applies to strings/streams (spec §4.7 `/CF`, `/StmF`, `/StrF`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptMethod {
    Identity,
    Rc4,
    Aes128,
    Aes256,
}

/// The outcome of successfully authenticating a password against a document's `/Encrypt`
/// dictionary: the derived file encryption key plus enough of the dictionary to decrypt any
/// object (spec §4.7 "Revisions and derivations").
#[derive(Debug, Clone)]
pub struct EncryptionState {
    pub file_key: Vec<u8>,
    pub r: u8,
    pub stm_method: CryptMethod,
    pub str_method: CryptMethod,
    pub encrypt_metadata: bool,
    /// Mirrors [`crate::config::Config::strict_aes_padding`] at the time this state was derived
    /// or created, so AES decrypt calls can honor it without threading a `Config` everywhere.
    pub strict_aes_padding: bool,
}

impl EncryptionState {
    /// Authenticates `password` against `document`'s `/Encrypt` dictionary, trying it as both
    /// the user and the owner password, and returns the resulting file key and cipher
    /// configuration.
    pub fn decode(document: &Document, password: &str) -> Result<Self> {
        standard::derive_state(document, password)
    }
}

/// Authenticates `password` against `document` without requiring a prior [`EncryptionState`].
/// Used both by [`Document::authenticate_password`](crate::document::Document::authenticate_password)
/// and by the reader's encrypted-load path.
pub fn verify_password(document: &Document, password: &str) -> Result<EncryptionState> {
    EncryptionState::decode(document, password)
}

/// Algorithm 1 (spec §4.7): derives the per-object key from the file key and the object's id.
/// R≥5 handlers use the file key directly; R≤4 handlers mix in the object id/generation (and,
/// for AES, the fixed `"sAlT"` suffix) through MD5.
fn per_object_key(state: &EncryptionState, id: ObjectId, method: CryptMethod) -> std::result::Result<Vec<u8>, EncryptionError> {
    if state.r >= 5 {
        return Ok(state.file_key.clone());
    }
    let mut input = Vec::with_capacity(state.file_key.len() + 5 + 4);
    input.extend_from_slice(&state.file_key);
    input.extend_from_slice(&id.0.to_le_bytes()[..3]);
    input.extend_from_slice(&id.1.to_le_bytes()[..2]);
    if matches!(method, CryptMethod::Aes128) {
        input.extend_from_slice(b"sAlT");
    }
    let digest = crypto::md5(&input);
    let len = (state.file_key.len() + 5).min(16);
    Ok(digest[..len].to_vec())
}

fn apply(
    method: CryptMethod, key: &[u8], data: &[u8], encrypting: bool, strict_aes_padding: bool,
) -> std::result::Result<Vec<u8>, EncryptionError> {
    let to_err = |_| EncryptionError::InvalidPassword;
    match method {
        CryptMethod::Identity => Ok(data.to_vec()),
        CryptMethod::Rc4 => Arc4::encrypt(key, data).map_err(to_err),
        CryptMethod::Aes128 => {
            if encrypting {
                Aes128Cbc::encrypt(key, data).map_err(to_err)
            } else {
                Aes128Cbc::decrypt_strict(key, data, strict_aes_padding).map_err(to_err)
            }
        }
        CryptMethod::Aes256 => {
            if encrypting {
                Aes256Cbc::encrypt(key, data).map_err(to_err)
            } else {
                Aes256Cbc::decrypt_strict(key, data, strict_aes_padding).map_err(to_err)
            }
        }
    }
}

fn transform_object(
    state: &EncryptionState, id: ObjectId, object: &mut Object, encrypting: bool,
) -> std::result::Result<(), EncryptionError> {
    match object {
        Object::String(bytes, _) => {
            if state.str_method != CryptMethod::Identity {
                let key = per_object_key(state, id, state.str_method)?;
                *bytes = apply(state.str_method, &key, bytes, encrypting, state.strict_aes_padding)?;
            }
        }
        Object::Stream(stream) => {
            // Cross-reference streams are never encrypted, and a Metadata stream is skipped
            // when /EncryptMetadata is false (spec §4.7 "Selective encryption").
            let is_metadata = stream.dict.has_type(b"Metadata");
            let skip = stream.dict.is_xref_stream() || (is_metadata && !state.encrypt_metadata);
            if !skip && state.stm_method != CryptMethod::Identity {
                let key = per_object_key(state, id, state.stm_method)?;
                stream.content = apply(state.stm_method, &key, &stream.content, encrypting, state.strict_aes_padding)?;
            }
            for (_, value) in stream.dict.iter_mut() {
                transform_object(state, id, value, encrypting)?;
            }
        }
        Object::Dictionary(dict) => {
            let is_signature = dict.has_type(b"Sig") || dict.has_type(b"DocTimeStamp");
            for (key, value) in dict.iter_mut() {
                // A signature dictionary's /Contents hex string is the signature bytes
                // themselves and must never be re-encrypted (spec §4.7).
                if is_signature && key == b"Contents" {
                    continue;
                }
                transform_object(state, id, value, encrypting)?;
            }
        }
        Object::Array(items) => {
            for item in items.iter_mut() {
                transform_object(state, id, item, encrypting)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Decrypts every string and stream reachable from `object` in place, using `id`'s object
/// number and generation for the R≤4 per-object key (spec §4.7 Algorithm 1).
pub fn decrypt_object(state: &EncryptionState, id: ObjectId, object: &mut Object) -> std::result::Result<(), EncryptionError> {
    transform_object(state, id, object, false)
}

/// The write-side counterpart of [`decrypt_object`]: encrypts every string and stream reachable
/// from `object` in place, for the writer's "fresh encryption" save path (spec §4.8 step 5).
pub fn encrypt_object(state: &EncryptionState, id: ObjectId, object: &mut Object) -> std::result::Result<(), EncryptionError> {
    transform_object(state, id, object, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Dictionary, Stream};

    fn state_rc4() -> EncryptionState {
        EncryptionState {
            file_key: vec![1, 2, 3, 4, 5],
            r: 3,
            stm_method: CryptMethod::Rc4,
            str_method: CryptMethod::Rc4,
            encrypt_metadata: true,
            strict_aes_padding: false,
        }
    }

    #[test]
    fn per_object_key_differs_across_objects() {
        let state = state_rc4();
        let key_a = per_object_key(&state, (1, 0), CryptMethod::Rc4).unwrap();
        let key_b = per_object_key(&state, (2, 0), CryptMethod::Rc4).unwrap();
        assert_ne!(key_a, key_b);
    }

    #[test]
    fn decrypt_then_encrypt_round_trips_a_string() {
        let state = state_rc4();
        let mut obj = Object::string_literal(b"top secret".to_vec());
        let original = obj.clone();

        encrypt_object(&state, (5, 0), &mut obj).unwrap();
        assert_ne!(obj, original);
        decrypt_object(&state, (5, 0), &mut obj).unwrap();
        assert_eq!(obj, original);
    }

    #[test]
    fn decrypt_object_recurses_into_stream_dictionary_strings() {
        let state = state_rc4();
        let mut dict = Dictionary::new();
        dict.set("Label", Object::string_literal(b"nested".to_vec()));
        let stream = Stream::new(dict, b"stream body".to_vec());
        let mut obj = Object::Stream(stream);
        let original = obj.clone();

        encrypt_object(&state, (9, 0), &mut obj).unwrap();
        assert_ne!(obj, original);
        decrypt_object(&state, (9, 0), &mut obj).unwrap();
        assert_eq!(obj, original);
    }

    #[test]
    fn xref_streams_are_left_untouched() {
        let state = state_rc4();
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XRef".to_vec()));
        let stream = Stream::new(dict, b"raw xref bytes".to_vec());
        let mut obj = Object::Stream(stream);
        let before = obj.as_stream().unwrap().content.clone();

        encrypt_object(&state, (3, 0), &mut obj).unwrap();
        assert_eq!(obj.as_stream().unwrap().content, before);
    }
}
