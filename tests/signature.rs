mod common;

use pdfkit_core::signature::{self, DigestAlgorithm, SignatureField, Signer, SubFilter};
use pdfkit_core::writer::SaveOptions;

/// Property 5 (spec §8): signing patches `/ByteRange` and `/Contents` in place without touching
/// any byte outside the reserved placeholder — everything the signer actually hashed must survive
/// unchanged in the final file, and the byte range must add up to the whole file length.
#[test]
fn signing_patches_in_place_without_disturbing_the_rest_of_the_file() {
    let mut doc = common::document_with_title("Signed Document");
    let field = SignatureField::new(SubFilter::Pkcs7Detached, 256);
    let sig_dict = signature::reserve_signature_field(&field);
    let sig_id = doc.add_object(sig_dict);

    let before_signing = doc.save(&SaveOptions::default()).unwrap();

    let signer = |_digest: DigestAlgorithm, message_digest: &[u8]| -> pdfkit_core::Result<Vec<u8>> {
        Ok(message_digest.to_vec())
    };
    let signer = Signer::Detached(&signer);

    let signed = signature::sign_document(&doc, &SaveOptions::default(), sig_id, DigestAlgorithm::Sha256, &signer)
        .unwrap();

    assert_eq!(signed.len(), before_signing.len(), "in-place patch must not change the file length");

    let sig_object_start = signature::locate_indirect_object(&signed, sig_id).unwrap();
    let text = String::from_utf8_lossy(&signed);
    let range_marker = "/ByteRange";
    let range_pos = text[sig_object_start..].find(range_marker).unwrap() + sig_object_start;
    let open = signed[range_pos..].iter().position(|&b| b == b'[').unwrap() + range_pos;
    let close = signed[open..].iter().position(|&b| b == b']').unwrap() + open;
    let range_text = String::from_utf8_lossy(&signed[open + 1..close]);
    let parts: Vec<i64> = range_text.split_whitespace().map(|n| n.parse().unwrap()).collect();
    assert_eq!(parts.len(), 4);
    assert_eq!(parts[0], 0);
    assert_eq!(parts[1] + (parts[2] - parts[1]) + parts[3], signed.len() as i64);

    let reloaded = pdfkit_core::Document::load_mem(&signed).unwrap();
    let sig_value = reloaded.get_dictionary(sig_id).unwrap().get(b"Contents").unwrap();
    let contents = sig_value.as_str().unwrap();
    assert!(contents.iter().any(|&b| b != 0), "placeholder zero bytes must have been overwritten");
}

/// A timestamp-authority path (`SubFilter::Rfc3161`) writes the TSA's token bytes verbatim into
/// `/Contents`, hex-encoded, with no further interpretation.
#[test]
fn timestamp_signer_round_trips_through_a_saved_document() {
    struct FixedTsa;
    impl signature::TimestampAuthority for FixedTsa {
        fn timestamp(&self, _message_digest: &[u8], _algo: DigestAlgorithm) -> pdfkit_core::Result<Vec<u8>> {
            Ok(vec![0xDE, 0xAD, 0xBE, 0xEF])
        }
    }

    let mut doc = common::minimal_document();
    let field = SignatureField::new(SubFilter::Rfc3161, 16);
    let sig_dict = signature::reserve_signature_field(&field);
    let sig_id = doc.add_object(sig_dict);

    let tsa = FixedTsa;
    let signer = Signer::Timestamp(&tsa);
    let signed =
        signature::sign_document(&doc, &SaveOptions::default(), sig_id, DigestAlgorithm::Sha256, &signer).unwrap();

    let reloaded = pdfkit_core::Document::load_mem(&signed).unwrap();
    let contents = reloaded.get_dictionary(sig_id).unwrap().get(b"Contents").unwrap().as_str().unwrap();
    assert!(contents.ends_with(&[0xDE, 0xAD, 0xBE, 0xEF]));
    assert!(contents[..contents.len() - 4].iter().all(|&b| b == 0));
}
