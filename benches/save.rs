use criterion::{criterion_group, criterion_main, Criterion};
use pdfkit_core::object::{Dictionary, Object};
use pdfkit_core::writer::SaveOptions;
use pdfkit_core::Document;

fn many_page_document() -> Document {
    let mut doc = Document::new();

    let pages_id = doc.add_object(Dictionary::new());
    let mut kids = Vec::new();
    for _ in 0..200 {
        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        let page_id = doc.add_object(page);
        kids.push(Object::Reference(page_id));
    }

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", Object::Integer(kids.len() as i64));
    pages_dict.set("Kids", Object::Array(kids));
    doc.set_object(pages_id, pages_dict);

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc
}

fn bench_save_standard(c: &mut Criterion) {
    let doc = many_page_document();

    c.bench_function("save_standard", |b| {
        b.iter(|| {
            let _ = doc.save(&SaveOptions::default()).unwrap();
        })
    });
}

fn bench_save_modern(c: &mut Criterion) {
    let doc = many_page_document();
    let options = SaveOptions::builder()
        .use_xref_streams(true)
        .use_object_streams(true)
        .build();

    c.bench_function("save_modern", |b| {
        b.iter(|| {
            let _ = doc.save(&options).unwrap();
        })
    });
}

criterion_group!(benches, bench_save_standard, bench_save_modern);
criterion_main!(benches);
