use pdfkit_core::{Dictionary, Document, Object};

/// A minimal viewable document: one Catalog, one Pages node with `/Count 0`, no pages — the
/// same shape as the "Minimal empty doc" scenario (spec §8).
pub fn minimal_document() -> Document {
    let mut doc = Document::new();

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Kids", Object::Array(vec![]));
    pages_dict.set("Count", Object::Integer(0));
    let pages_id = doc.add_object(pages_dict);

    let mut catalog_dict = Dictionary::new();
    catalog_dict.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog_dict.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog_dict);

    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc
}

/// A minimal document with an `/Info` dictionary carrying `/Title`, for incremental-update tests
/// that flip the title (spec §8 "Incremental update flipping /Info /Title").
pub fn document_with_title(title: &str) -> Document {
    let mut doc = minimal_document();
    let mut info = Dictionary::new();
    info.set("Title", Object::string_literal(title.as_bytes().to_vec()));
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", Object::Reference(info_id));
    doc
}

/// A document with one page under the Pages root, for page-count / kid-traversal assertions.
pub fn single_page_document() -> Document {
    let mut doc = Document::new();

    let pages_id = doc.add_object(Dictionary::new());

    let mut page_dict = Dictionary::new();
    page_dict.set("Type", Object::Name(b"Page".to_vec()));
    page_dict.set("Parent", Object::Reference(pages_id));
    let page_id = doc.add_object(page_dict);

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    pages_dict.set("Count", Object::Integer(1));
    doc.set_object(pages_id, pages_dict);

    let mut catalog_dict = Dictionary::new();
    catalog_dict.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog_dict.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog_dict);

    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc
}
