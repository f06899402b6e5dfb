//! In-memory PDFs for tests.

use lopdf::{
    content::{Content, Operation},
    dictionary, Document, Object, Stream,
};
use std::path::Path;

/// Build a document with one page per entry of `pages`; each page shows its
/// lines in 10pt Courier, top to bottom.
///
/// With `inherit` set, `Resources` and `MediaBox` live on the page tree node
/// instead of on each page.
pub fn sample_document(pages: &[Vec<&str>], inherit: bool) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });
    let media_box = || -> Vec<Object> { vec![0.into(), 0.into(), 612.into(), 792.into()] };

    let mut kids = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (idx, line) in lines.iter().enumerate() {
            let y = 740 - 14 * idx as i64;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
            operations.push(Operation::new("Td", vec![72.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        };
        if !inherit {
            page.set("Resources", resources_id);
            page.set("MediaBox", media_box());
        }
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let mut tree = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages.len() as u32,
    };
    if inherit {
        tree.set("Resources", resources_id);
        tree.set("MediaBox", media_box());
    }
    doc.objects.insert(pages_id, Object::Dictionary(tree));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("RFC 9999: Sample Protocol"),
        "Author" => Object::string_literal("Example Working Group"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    doc
}

/// A 20-page RFC lookalike whose page 2 carries `toc` below a heading.
pub fn rfc_document(toc: &[&str]) -> Document {
    let mut contents = vec!["Table of Contents", "", ""];
    contents.extend_from_slice(toc);
    let mut pages: Vec<Vec<&str>> = vec![
        vec!["Internet Engineering Task Force", "Request for Comments: 9999"],
        contents,
    ];
    for _ in 2..20 {
        pages.push(vec!["This section is intentionally verbose."]);
    }
    sample_document(&pages, false)
}

pub fn save_to(doc: &mut Document, path: &Path) {
    doc.save(path).unwrap();
}
