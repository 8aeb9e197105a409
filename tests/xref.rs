mod common;

use pdfkit_core::writer::SaveOptions;
use pdfkit_core::Document;

/// Property 7 (spec §8): the free-list threads through every deleted object and closes back to
/// entry 0 — no dangling `/Next free` pointer, no cycle that skips zero.
#[test]
fn deleting_several_objects_keeps_the_free_list_a_single_cycle() {
    let mut doc = common::single_page_document();
    let root = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
    let catalog = doc.get_dictionary(root).unwrap().clone();
    let pages_ref = catalog.get(b"Pages").unwrap().as_reference().unwrap();
    let extra_a = doc.add_object(pdfkit_core::Dictionary::new());
    let extra_b = doc.add_object(pdfkit_core::Dictionary::new());

    doc.delete_object(extra_a);
    doc.delete_object(extra_b);

    let bytes = doc.save(&SaveOptions::default()).unwrap();
    let reloaded = Document::load_mem(&bytes).unwrap();

    reloaded.reference_table.validate_free_list().unwrap();
    assert!(!reloaded.object_exists(extra_a));
    assert!(!reloaded.object_exists(extra_b));
    assert!(reloaded.object_exists(pages_ref));
}

/// The free list must still validate after an incremental save deletes an object on top of an
/// already-saved revision (deletions threaded across `/Prev` chains, not just within one xref).
#[test]
fn free_list_validates_after_an_incremental_deletion() {
    let doc = common::single_page_document();
    let original_bytes = doc.save(&SaveOptions::default()).unwrap();

    let loaded = Document::load_mem(&original_bytes).unwrap();
    let root = loaded.trailer.get(b"Root").unwrap().as_reference().unwrap();
    let catalog = loaded.get_dictionary(root).unwrap().clone();
    let pages_ref = catalog.get(b"Pages").unwrap().as_reference().unwrap();
    let pages = loaded.get_dictionary(pages_ref).unwrap().clone();
    let page_ref = pages.get(b"Kids").unwrap().as_array().unwrap()[0].as_reference().unwrap();

    let mut incremental = pdfkit_core::IncrementalDocument::create_from(original_bytes, loaded);
    incremental.document.delete_object(page_ref);

    let appended = incremental.save(&SaveOptions::default()).unwrap();
    let reloaded = Document::load_mem(&appended).unwrap();

    reloaded.reference_table.validate_free_list().unwrap();
    assert!(!reloaded.object_exists(page_ref));
}
