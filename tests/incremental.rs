mod common;

use pdfkit_core::writer::SaveOptions;
use pdfkit_core::{Dictionary, Document, IncrementalDocument, Object};

/// Property 2 (spec §8): incrementally saving with no changes appends a revision containing no
/// objects, and `read` of the result equals `read` of the original.
#[test]
fn incremental_save_with_no_changes_appends_an_empty_revision() {
    let doc = common::single_page_document();
    let original_bytes = doc.save(&SaveOptions::default()).unwrap();

    let loaded = Document::load_mem(&original_bytes).unwrap();
    let incremental = IncrementalDocument::create_from(original_bytes.clone(), loaded);
    let appended = incremental.save(&SaveOptions::default()).unwrap();

    assert!(appended.starts_with(&original_bytes));
    assert!(appended.len() > original_bytes.len());

    let reloaded = Document::load_mem(&appended).unwrap();
    let original_reloaded = Document::load_mem(&original_bytes).unwrap();
    assert_eq!(reloaded.objects.len(), original_reloaded.objects.len());
}

/// "Incremental update flipping /Info /Title" scenario (spec §8): the new revision contains only
/// the Info object and a fresh xref chained via `/Prev`; reading the result returns the new
/// title.
#[test]
fn incremental_save_flipping_info_title_is_visible_on_reload() {
    let doc = common::document_with_title("Before");
    let original_bytes = doc.save(&SaveOptions::default()).unwrap();

    let mut loaded = Document::load_mem(&original_bytes).unwrap();
    let info_ref = loaded.trailer.get(b"Info").unwrap().as_reference().unwrap();

    let mut incremental = IncrementalDocument::create_from(original_bytes.clone(), loaded.clone());
    let mut info_dict = loaded.get_dictionary(info_ref).unwrap().clone();
    info_dict.set("Title", Object::string_literal(b"After".to_vec()));
    incremental.document.set_object(info_ref, info_dict);

    let appended = incremental.save(&SaveOptions::default()).unwrap();
    assert!(appended.starts_with(&original_bytes));

    let reloaded = Document::load_mem(&appended).unwrap();
    let metadata = Document::load_metadata_mem(&appended).unwrap();
    assert_eq!(metadata.title.as_deref(), Some("After"));

    let info_after = reloaded.get_dictionary(info_ref).unwrap();
    assert_eq!(info_after.get(b"Title").unwrap().as_str().unwrap(), b"After");
}

/// Deleting an object through an incremental save must mark it free in the appended revision,
/// not silently retain the old in-use entry from the original file.
#[test]
fn incremental_save_can_delete_an_object() {
    let doc = common::single_page_document();
    let original_bytes = doc.save(&SaveOptions::default()).unwrap();

    let loaded = Document::load_mem(&original_bytes).unwrap();
    let root = loaded.trailer.get(b"Root").unwrap().as_reference().unwrap();
    let catalog = loaded.get_dictionary(root).unwrap().clone();
    let pages_ref = catalog.get(b"Pages").unwrap().as_reference().unwrap();
    let pages = loaded.get_dictionary(pages_ref).unwrap().clone();
    let page_ref = pages.get(b"Kids").unwrap().as_array().unwrap()[0].as_reference().unwrap();

    let mut incremental = IncrementalDocument::create_from(original_bytes, loaded);
    incremental.document.delete_object(page_ref);
    incremental.document.set_object(
        pages_ref,
        {
            let mut p = Dictionary::new();
            p.set("Type", Object::Name(b"Pages".to_vec()));
            p.set("Kids", Object::Array(vec![]));
            p.set("Count", Object::Integer(0));
            p
        },
    );

    let appended = incremental.save(&SaveOptions::default()).unwrap();
    let reloaded = Document::load_mem(&appended).unwrap();
    assert!(!reloaded.object_exists(page_ref));
}
