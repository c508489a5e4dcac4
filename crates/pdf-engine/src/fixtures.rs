//! In-memory fixture documents for tests.

use lopdf::{dictionary, Document, Object};

/// Build a PDF with one empty page per `(width, height)` entry.
pub fn blank_pdf(page_sizes: &[(f32, f32)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = page_sizes
        .iter()
        .map(|(width, height)| {
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(*width),
                    Object::Real(*height),
                ]),
            });
            Object::Reference(page_id)
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("in-memory save should succeed");
    buffer
}
