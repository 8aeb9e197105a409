//! The signature orchestrator (spec §4.9): reserves a `/ByteRange`/`/Contents` placeholder in a
//! signature dictionary, then — once the document has been serialized once with the placeholder
//! in place — patches the real byte range in and hex-encodes a signature (or timestamp token)
//! into `/Contents` without re-serializing anything.
//!
//! Grounded on the writer's own in-place patching style (`writer::write_xref_stream`'s
//! self-referencing offset fixup) and on `reader/mod.rs`'s forward byte-string scanning
//! (`search_substring`), generalized here to search forward instead of backward.

use crate::crypto;
use crate::document::Document;
use crate::error::{Error, Result, SignatureError};
use crate::object::{Dictionary, Object, StringFormat};
use crate::writer::SaveOptions;

/// Which digest the byte range is hashed with before signing (spec §4.9 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    pub fn hash(self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha256 => crypto::sha256(data).to_vec(),
            DigestAlgorithm::Sha384 => crypto::sha384(data).to_vec(),
            DigestAlgorithm::Sha512 => crypto::sha512(data).to_vec(),
        }
    }
}

/// `/SubFilter` value for a signature dictionary (spec §6 "Signature dictionary fields").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubFilter {
    /// Detached PKCS#7/CMS `SignedData` (the common case).
    Pkcs7Detached,
    /// An RFC 3161 timestamp token rather than a signature over the document's own key.
    Rfc3161,
}

impl SubFilter {
    fn name(self) -> &'static [u8] {
        match self {
            SubFilter::Pkcs7Detached => b"adbe.pkcs7.detached",
            SubFilter::Rfc3161 => b"ETSI.RFC3161",
        }
    }
}

/// Describes the signature field to reserve before the first save (spec §4.9 step 1).
#[derive(Debug, Clone)]
pub struct SignatureField {
    pub sub_filter: SubFilter,
    /// Upper bound on the final signature's byte length. The `/Contents` placeholder reserves
    /// `2 * reserved_signature_bytes` hex characters; exceeding this at signing time is a
    /// [`SignatureError::SignatureTooLarge`], not silent truncation.
    pub reserved_signature_bytes: usize,
    pub reason: Option<String>,
    pub location: Option<String>,
    pub contact_info: Option<String>,
    /// PDF date string, e.g. `"D:20260727120000+00'00'"`.
    pub signing_time: Option<String>,
}

impl SignatureField {
    pub fn new(sub_filter: SubFilter, reserved_signature_bytes: usize) -> Self {
        SignatureField {
            sub_filter,
            reserved_signature_bytes,
            reason: None,
            location: None,
            contact_info: None,
            signing_time: None,
        }
    }
}

/// Builds the signature dictionary with placeholder `/ByteRange` and `/Contents` (spec §4.9
/// step 1). The caller adds this as an indirect object (typically referenced from an
/// `/AcroForm` signature field's `/V`) before the first [`Document::save`].
pub fn reserve_signature_field(field: &SignatureField) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"Sig".to_vec()));
    dict.set("Filter", Object::Name(b"Adobe.PPKLite".to_vec()));
    dict.set("SubFilter", Object::Name(field.sub_filter.name().to_vec()));
    // Thirteen digits per number covers files up to ~1 TB; the in-place patch only ever shrinks
    // this text (padding with spaces), never grows it, so the reservation must be wide enough.
    dict.set(
        "ByteRange",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(1_000_000_000_000),
            Object::Integer(1_000_000_000_000),
            Object::Integer(1_000_000_000_000),
        ]),
    );
    dict.set(
        "Contents",
        Object::String(vec![0u8; field.reserved_signature_bytes], StringFormat::Hexadecimal),
    );
    if let Some(reason) = &field.reason {
        dict.set("Reason", Object::string_literal(reason.clone().into_bytes()));
    }
    if let Some(location) = &field.location {
        dict.set("Location", Object::string_literal(location.clone().into_bytes()));
    }
    if let Some(contact_info) = &field.contact_info {
        dict.set("ContactInfo", Object::string_literal(contact_info.clone().into_bytes()));
    }
    if let Some(m) = &field.signing_time {
        dict.set("M", Object::string_literal(m.clone().into_bytes()));
    }
    dict
}

/// Requests a complete RFC 3161 timestamp token over an already-hashed message (spec §4.9
/// "ETSI.RFC3161"). Implemented by the caller against whatever TSA they use; this crate has no
/// HTTP client of its own.
pub trait TimestampAuthority {
    fn timestamp(&self, message_digest: &[u8], algo: DigestAlgorithm) -> Result<Vec<u8>>;
}

/// The three signer callback shapes spec §4.9 step 3 allows, plus a timestamp-authority path for
/// `SubFilter::Rfc3161`. Each produces the bytes that go straight into `/Contents`.
pub enum Signer<'a> {
    /// Caller owns a complete CMS/PKCS#7 signer: given the exact byte range that was hashed (not
    /// pre-hashed — some signers need the full message for attributes), returns finished
    /// `SignedData` DER bytes.
    Cms(&'a dyn Fn(&[u8], DigestAlgorithm) -> Result<Vec<u8>>),
    /// Caller signs only the digest. There is no ASN.1/CMS crate in this dependency set, so the
    /// returned bytes are written to `/Contents` as-is rather than wrapped in a `SignedData`
    /// envelope — callers needing that envelope should build it themselves and use
    /// [`Signer::Cms`] instead.
    Detached(&'a dyn Fn(DigestAlgorithm, &[u8]) -> Result<Vec<u8>>),
    /// An X.509 certificate (plus chain, for embedding in the eventual CMS envelope) paired with
    /// an external raw-signing hook — same reasoning as [`Signer::Detached`].
    Rsa {
        certificate_der: Vec<u8>,
        chain_der: Vec<Vec<u8>>,
        sign: &'a dyn Fn(&[u8]) -> Result<Vec<u8>>,
    },
    /// Routes through a timestamp authority instead of a document signature.
    Timestamp(&'a dyn TimestampAuthority),
}

/// Saves `document` with the placeholder signature field already present, then patches the real
/// `/ByteRange` and signs in place (spec §4.9 steps 1-4). `signature_id` must be the id under
/// which a [`reserve_signature_field`] dictionary was added to `document` before calling this.
pub fn sign_document(
    document: &Document, options: &SaveOptions, signature_id: (u32, u16), digest: DigestAlgorithm, signer: &Signer,
) -> Result<Vec<u8>> {
    let mut bytes = document.save(options)?;
    let object_start =
        locate_indirect_object(&bytes, signature_id).ok_or(Error::Signature(SignatureError::ContentsNotFound))?;
    finalize_signature(&mut bytes, object_start, digest, signer)?;
    Ok(bytes)
}

/// Finds the byte offset where `N G obj` begins for `id`, bounded to the first match (spec §4.9
/// "Locate the signature dictionary").
pub fn locate_indirect_object(bytes: &[u8], id: (u32, u16)) -> Option<usize> {
    let needle = format!("{} {} obj", id.0, id.1);
    find_forward(bytes, needle.as_bytes(), 0)
}

/// Patches `/ByteRange` and hex-encodes a signature into `/Contents`, both in place, for the
/// signature dictionary whose indirect object starts at `object_start` (spec §4.9 steps 2-4).
pub fn finalize_signature(bytes: &mut [u8], object_start: usize, digest: DigestAlgorithm, signer: &Signer) -> Result<()> {
    let extent = object_extent(bytes, object_start);
    let (contents_open, contents_close) = find_span(bytes, object_start, extent, b"/Contents", b'<', b'>')?;
    let (range_open, range_close) = find_span(bytes, object_start, extent, b"/ByteRange", b'[', b']')?;

    let after_contents = contents_close + 1;
    let file_end = bytes.len();
    let byte_range = [0u64, contents_open as u64, after_contents as u64, (file_end - after_contents) as u64];
    patch_byte_range(bytes, range_open, range_close, byte_range)?;

    let mut hashed = Vec::with_capacity(contents_open + (file_end - after_contents));
    hashed.extend_from_slice(&bytes[..contents_open]);
    hashed.extend_from_slice(&bytes[after_contents..]);
    let message_digest = digest.hash(&hashed);

    let signature_bytes = match signer {
        Signer::Cms(f) => f(&hashed, digest)?,
        Signer::Detached(f) => f(digest, &message_digest)?,
        Signer::Rsa { sign, .. } => sign(&message_digest)?,
        Signer::Timestamp(tsa) => tsa.timestamp(&message_digest, digest)?,
    };

    write_contents_hex(bytes, contents_open, contents_close, &signature_bytes)
}

fn object_extent(bytes: &[u8], object_start: usize) -> usize {
    find_forward(bytes, b"endobj", object_start).map(|p| p + 6).unwrap_or(bytes.len())
}

fn find_span(
    bytes: &[u8], object_start: usize, object_end: usize, label: &[u8], open_byte: u8, close_byte: u8,
) -> Result<(usize, usize)> {
    let label_pos =
        find_forward(&bytes[object_start..object_end], label, 0).ok_or(Error::Signature(SignatureError::ContentsNotFound))?;
    let abs_label = object_start + label_pos;
    let open = find_forward(bytes, &[open_byte], abs_label).ok_or(Error::Signature(SignatureError::ContentsNotFound))?;
    let close = find_forward(bytes, &[close_byte], open).ok_or(Error::Signature(SignatureError::ContentsNotFound))?;
    Ok((open, close))
}

fn find_forward(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() || haystack.len() - from < needle.len() {
        return None;
    }
    haystack[from..].windows(needle.len()).position(|w| w == needle).map(|p| from + p)
}

/// Overwrites the placeholder `[0 ... ]` text with the real four-segment range, padding with
/// spaces before the closing bracket to keep the exact same byte length (spec §4.9 step 2).
fn patch_byte_range(bytes: &mut [u8], open: usize, close: usize, range: [u64; 4]) -> Result<()> {
    let mut text = format!("[{} {} {} {}]", range[0], range[1], range[2], range[3]);
    let capacity = close + 1 - open;
    if text.len() > capacity {
        return Err(Error::Signature(SignatureError::SignatureTooLarge {
            reserved: capacity,
            required: text.len(),
        }));
    }
    while text.len() < capacity {
        text.insert(text.len() - 1, ' ');
    }
    bytes[open..=close].copy_from_slice(text.as_bytes());
    Ok(())
}

/// Hex-encodes `signature` into the reserved `<...>` span, left-padded with `'0'` so the
/// placeholder's total length never changes (spec §4.9 step 4).
fn write_contents_hex(bytes: &mut [u8], open: usize, close: usize, signature: &[u8]) -> Result<()> {
    let reserved_chars = close - open - 1;
    let required_chars = signature.len() * 2;
    if required_chars > reserved_chars {
        return Err(Error::Signature(SignatureError::SignatureTooLarge {
            reserved: reserved_chars / 2,
            required: signature.len(),
        }));
    }
    let mut hex = String::with_capacity(reserved_chars);
    for _ in 0..(reserved_chars - required_chars) {
        hex.push('0');
    }
    for byte in signature {
        hex.push_str(&format!("{byte:02X}"));
    }
    bytes[open + 1..close].copy_from_slice(hex.as_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;
    use crate::writer::SaveOptions;

    fn signed_fixture(reserved: usize, signer: &Signer) -> (Document, (u32, u16), Vec<u8>) {
        let mut doc = Document::new();
        let catalog_id = doc.add_object(Dictionary::new());
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let field = SignatureField::new(SubFilter::Pkcs7Detached, reserved);
        let sig_dict = reserve_signature_field(&field);
        let sig_id = doc.add_object(sig_dict);

        let options = SaveOptions::default();
        let bytes = sign_document(&doc, &options, sig_id, DigestAlgorithm::Sha256, signer).unwrap();
        (doc, sig_id, bytes)
    }

    #[test]
    fn reserve_signature_field_sizes_contents_placeholder() {
        let field = SignatureField::new(SubFilter::Pkcs7Detached, 256);
        let dict = reserve_signature_field(&field);
        let contents = dict.get(b"Contents").unwrap().as_str().unwrap();
        assert_eq!(contents.len(), 256);
        assert!(contents.iter().all(|&b| b == 0));
    }

    #[test]
    fn finalize_signature_patches_byte_range_and_contents() {
        let signer_fn = |_: DigestAlgorithm, digest: &[u8]| -> Result<Vec<u8>> { Ok(digest.to_vec()) };
        let signer = Signer::Detached(&signer_fn);
        let (_, sig_id, bytes) = signed_fixture(128, &signer);

        let object_start = locate_indirect_object(&bytes, sig_id).unwrap();
        let extent = object_extent(&bytes, object_start);
        let text = String::from_utf8_lossy(&bytes[object_start..extent]);
        assert!(!text.contains("1000000000000"), "placeholder ByteRange must be overwritten");

        let (contents_open, contents_close) = find_span(&bytes, object_start, extent, b"/Contents", b'<', b'>').unwrap();
        let hex = std::str::from_utf8(&bytes[contents_open + 1..contents_close]).unwrap();
        assert_eq!(hex.len(), 256);
        // A 32-byte SHA-256 digest hex-encodes to 64 chars; the rest is left-padding zeros.
        assert!(hex[..256 - 64].chars().all(|c| c == '0'));
    }

    #[test]
    fn byte_range_covers_everything_except_contents() {
        let signer_fn = |_: DigestAlgorithm, digest: &[u8]| -> Result<Vec<u8>> { Ok(digest.to_vec()) };
        let signer = Signer::Detached(&signer_fn);
        let (_, sig_id, bytes) = signed_fixture(128, &signer);

        let object_start = locate_indirect_object(&bytes, sig_id).unwrap();
        let extent = object_extent(&bytes, object_start);
        let (range_open, range_close) = find_span(&bytes, object_start, extent, b"/ByteRange", b'[', b']').unwrap();
        let range_text = std::str::from_utf8(&bytes[range_open + 1..range_close]).unwrap();
        let parts: Vec<i64> = range_text.split_whitespace().map(|s| s.parse().unwrap()).collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], 0);
        let covered = parts[1] + parts[3];
        assert_eq!(covered as usize, bytes.len() - (parts[2] - parts[1]) as usize);
    }

    #[test]
    fn oversized_signature_is_rejected_without_corrupting_the_file() {
        let huge = vec![0xABu8; 1024];
        let signer_fn = move |_: DigestAlgorithm, _: &[u8]| -> Result<Vec<u8>> { Ok(huge.clone()) };
        let signer = Signer::Detached(&signer_fn);

        let mut doc = Document::new();
        let catalog_id = doc.add_object(Dictionary::new());
        doc.trailer.set("Root", Object::Reference(catalog_id));
        let field = SignatureField::new(SubFilter::Pkcs7Detached, 16);
        let sig_id = doc.add_object(reserve_signature_field(&field));

        let err = sign_document(&doc, &SaveOptions::default(), sig_id, DigestAlgorithm::Sha256, &signer).unwrap_err();
        assert!(matches!(err, Error::Signature(SignatureError::SignatureTooLarge { .. })));
    }

    #[test]
    fn timestamp_authority_path_writes_token_bytes_verbatim() {
        struct FixedTsa;
        impl TimestampAuthority for FixedTsa {
            fn timestamp(&self, _message_digest: &[u8], _algo: DigestAlgorithm) -> Result<Vec<u8>> {
                Ok(vec![0x30, 0x82, 0x01, 0x00])
            }
        }
        let tsa = FixedTsa;
        let signer = Signer::Timestamp(&tsa);

        let mut doc = Document::new();
        let catalog_id = doc.add_object(Dictionary::new());
        doc.trailer.set("Root", Object::Reference(catalog_id));
        let field = SignatureField::new(SubFilter::Rfc3161, 32);
        let sig_id = doc.add_object(reserve_signature_field(&field));

        let bytes = sign_document(&doc, &SaveOptions::default(), sig_id, DigestAlgorithm::Sha256, &signer).unwrap();
        let object_start = locate_indirect_object(&bytes, sig_id).unwrap();
        let extent = object_extent(&bytes, object_start);
        let (open, close) = find_span(&bytes, object_start, extent, b"/Contents", b'<', b'>').unwrap();
        let hex = std::str::from_utf8(&bytes[open + 1..close]).unwrap();
        assert!(hex.ends_with("30820100"));
    }
}
