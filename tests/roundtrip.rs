mod common;

use pdfkit_core::writer::SaveOptions;
use pdfkit_core::Document;

/// Property 1 (spec §8): for an unencrypted document, writing then reading back reproduces the
/// same object graph (modulo xref layout).
#[test]
fn round_trip_preserves_object_graph() {
    let doc = common::single_page_document();
    let bytes = doc.save(&SaveOptions::default()).unwrap();

    let reloaded = Document::load_mem(&bytes).unwrap();
    assert_eq!(reloaded.objects.len(), doc.objects.len());

    let root = reloaded.trailer.get(b"Root").unwrap().as_reference().unwrap();
    let catalog = reloaded.get_dictionary(root).unwrap();
    assert!(catalog.has_type(b"Catalog"));

    let pages_ref = catalog.get(b"Pages").unwrap().as_reference().unwrap();
    let pages = reloaded.get_dictionary(pages_ref).unwrap();
    assert_eq!(pages.get(b"Count").unwrap().as_i64().unwrap(), 1);
}

/// "Minimal empty doc" scenario (spec §8): header, binary marker, one Catalog, one Pages node
/// with `/Count 0`, a single xref section, `%%EOF` at the end.
#[test]
fn minimal_empty_document_matches_the_documented_shape() {
    let doc = common::minimal_document();
    let bytes = doc.save(&SaveOptions::default()).unwrap();

    assert!(bytes.starts_with(b"%PDF-1.7\n%"));
    let marker_line_end = bytes.iter().position(|&b| b == b'\n').unwrap();
    let marker_line = &bytes[marker_line_end + 1..];
    assert!(marker_line.starts_with(&[0xCF, 0xEC, 0xFF, 0xE8, 0xD7, 0xCB, 0xCD]));

    assert!(bytes.windows(5).filter(|w| *w == b"xref\n").count() >= 1);
    assert!(bytes.ends_with(b"%%EOF\n") || bytes.ends_with(b"%%EOF"));

    let reloaded = Document::load_mem(&bytes).unwrap();
    let root = reloaded.trailer.get(b"Root").unwrap().as_reference().unwrap();
    let catalog = reloaded.get_dictionary(root).unwrap();
    let pages_ref = catalog.get(b"Pages").unwrap().as_reference().unwrap();
    let pages = reloaded.get_dictionary(pages_ref).unwrap();
    assert!(pages.has_type(b"Pages"));
    assert_eq!(pages.get(b"Count").unwrap().as_i64().unwrap(), 0);
    assert_eq!(pages.get(b"Kids").unwrap().as_array().unwrap().len(), 0);
}

/// Property 1 applies identically whether the writer chooses a classic xref table or an xref
/// stream — both must be readable back to the same object graph.
#[test]
fn round_trip_holds_for_both_xref_table_and_xref_stream() {
    let doc = common::single_page_document();

    let classic = doc.save(&SaveOptions::default()).unwrap();
    let streamed = doc.save(&SaveOptions::builder().use_xref_streams(true).build()).unwrap();

    let from_classic = Document::load_mem(&classic).unwrap();
    let from_streamed = Document::load_mem(&streamed).unwrap();
    assert_eq!(from_classic.objects.len(), from_streamed.objects.len());
}

/// Property 6 (spec §8): no object packed into an object stream has gen != 0, is itself a
/// stream, or is the `/Encrypt` dictionary — and packing must still round-trip (review comment 8:
/// `use_object_streams` without an explicit `use_xref_streams` must not corrupt the file).
#[test]
fn object_streams_round_trip_without_an_explicit_xref_stream_flag() {
    let doc = common::single_page_document();
    let options = SaveOptions::builder().use_object_streams(true).build();
    assert!(options.use_xref_streams, "packing into object streams must force xref streams on");

    let bytes = doc.save(&options).unwrap();
    let reloaded = Document::load_mem(&bytes).unwrap();
    assert_eq!(reloaded.objects.len(), doc.objects.len());

    let root = reloaded.trailer.get(b"Root").unwrap().as_reference().unwrap();
    assert!(reloaded.get_dictionary(root).unwrap().has_type(b"Catalog"));
}

/// A direct `SaveOptions { use_object_streams: true, use_xref_streams: false, .. }` construction
/// (bypassing the builder) must be just as safe as the builder (review comment 8).
#[test]
fn direct_save_options_construction_is_also_protected() {
    let doc = common::single_page_document();
    let options = SaveOptions {
        use_xref_streams: false,
        use_object_streams: true,
        object_stream_config: Default::default(),
    };

    let bytes = doc.save(&options).unwrap();
    let reloaded = Document::load_mem(&bytes).unwrap();
    assert_eq!(reloaded.objects.len(), doc.objects.len());
}

/// Deleting an object and saving must not leave it reachable after reload — round-trip fidelity
/// for deletions, not just additions.
#[test]
fn deleted_objects_do_not_resurface_after_round_trip() {
    let mut doc = common::single_page_document();
    let root = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
    let catalog = doc.get_dictionary(root).unwrap().clone();
    let pages_ref = catalog.get(b"Pages").unwrap().as_reference().unwrap();
    let pages = doc.get_dictionary(pages_ref).unwrap().clone();
    let kids = pages.get(b"Kids").unwrap().as_array().unwrap().to_vec();
    let page_ref = kids[0].as_reference().unwrap();

    doc.delete_object(page_ref);

    let bytes = doc.save(&SaveOptions::default()).unwrap();
    let reloaded = Document::load_mem(&bytes).unwrap();
    assert!(!reloaded.object_exists(page_ref));
}
