use anyhow::{Context, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

use super::text::decode_text_string;

/// An outline item in display order.
#[derive(Debug, Clone, Serialize)]
pub struct OutlineItem {
    pub title: String,
    /// 1-based target page, when the destination resolves to one
    pub page: Option<u32>,
    /// Nesting depth, 0 for top-level items
    pub level: u32,
    /// Fit mode of an explicit destination (`Fit`, `XYZ`, ...)
    pub fit: Option<String>,
}

/// Read the outline (bookmarks) of a PDF file.
pub fn read_outline<P: AsRef<Path>>(path: P) -> Result<Vec<OutlineItem>> {
    let path = path.as_ref();
    let doc =
        Document::load(path).with_context(|| format!("Failed to open PDF: {}", path.display()))?;

    read_outline_from_doc(&doc)
}

pub fn read_outline_from_doc(doc: &Document) -> Result<Vec<OutlineItem>> {
    let catalog = doc
        .catalog()
        .with_context(|| "Failed to get document catalog")?;

    let outlines = match catalog.get(b"Outlines") {
        Ok(Object::Reference(r)) => match doc.get_dictionary(*r) {
            Ok(d) => d,
            _ => return Ok(Vec::new()),
        },
        Ok(Object::Dictionary(d)) => d,
        _ => return Ok(Vec::new()),
    };

    let first_ref = match outlines.get(b"First") {
        Ok(Object::Reference(r)) => *r,
        _ => return Ok(Vec::new()),
    };

    let page_map = build_page_map(doc);
    let mut items = Vec::new();
    let mut seen = HashSet::new();
    walk_items(doc, first_ref, &page_map, 0, &mut seen, &mut items);

    Ok(items)
}

fn walk_items(
    doc: &Document,
    first_id: ObjectId,
    page_map: &[(ObjectId, u32)],
    level: u32,
    seen: &mut HashSet<ObjectId>,
    items: &mut Vec<OutlineItem>,
) {
    let mut current_id = Some(first_id);

    while let Some(id) = current_id {
        // Broken Next/First links can form cycles
        if !seen.insert(id) {
            break;
        }
        let dict = match doc.get_dictionary(id) {
            Ok(d) => d,
            Err(_) => break,
        };

        let title = match dict.get(b"Title") {
            Ok(Object::String(bytes, _)) => decode_text_string(bytes),
            _ => "Untitled".to_string(),
        };
        let dest = get_destination(doc, dict);
        items.push(OutlineItem {
            title,
            page: dest.and_then(|d| get_page_from_dest_array(d, page_map)),
            level,
            fit: dest.and_then(fit_name),
        });

        if let Ok(Object::Reference(child_ref)) = dict.get(b"First") {
            walk_items(doc, *child_ref, page_map, level + 1, seen, items);
        }

        current_id = match dict.get(b"Next") {
            Ok(Object::Reference(r)) => Some(*r),
            _ => None,
        };
    }
}

/// Explicit destination array of an outline item, via `Dest` or a GoTo action.
fn get_destination<'a>(doc: &'a Document, dict: &'a Dictionary) -> Option<&'a [Object]> {
    if let Ok(dest) = dict.get(b"Dest") {
        return resolve_destination(doc, dest, 0);
    }

    let action = match dict.get(b"A") {
        Ok(Object::Reference(r)) => doc.get_dictionary(*r).ok()?,
        Ok(Object::Dictionary(d)) => d,
        _ => return None,
    };
    match action.get(b"S") {
        Ok(Object::Name(action_type)) if action_type == b"GoTo" => {
            resolve_destination(doc, action.get(b"D").ok()?, 0)
        }
        _ => None,
    }
}

fn resolve_destination<'a>(
    doc: &'a Document,
    dest: &'a Object,
    depth: u32,
) -> Option<&'a [Object]> {
    if depth > 8 {
        return None;
    }
    match dest {
        Object::Array(arr) => Some(arr.as_slice()),
        // A named destination's value may be an array or a dictionary with D
        Object::Dictionary(d) => resolve_destination(doc, d.get(b"D").ok()?, depth + 1),
        Object::Reference(r) => resolve_destination(doc, doc.get_object(*r).ok()?, depth + 1),
        Object::String(name, _) | Object::Name(name) => {
            let target = resolve_named_destination(doc, name)?;
            resolve_destination(doc, target, depth + 1)
        }
        _ => None,
    }
}

fn resolve_named_destination<'a>(doc: &'a Document, name: &[u8]) -> Option<&'a Object> {
    let catalog = doc.catalog().ok()?;

    // Names/Dests name tree
    if let Ok(names_dict) = doc.get_dict_in_dict(catalog, b"Names") {
        if let Ok(Object::Reference(dests_ref)) = names_dict.get(b"Dests") {
            if let Some(found) = search_name_tree(doc, *dests_ref, name, 0) {
                return Some(found);
            }
        }
    }

    // Dests dictionary (older style)
    let dests = doc.get_dict_in_dict(catalog, b"Dests").ok()?;
    dests.get(name).ok()
}

fn search_name_tree<'a>(
    doc: &'a Document,
    node_id: ObjectId,
    name: &[u8],
    depth: u32,
) -> Option<&'a Object> {
    if depth > 32 {
        return None;
    }
    let dict = doc.get_dictionary(node_id).ok()?;

    if let Ok(Object::Array(names)) = dict.get(b"Names") {
        for chunk in names.chunks(2) {
            if let [Object::String(key, _), value] = chunk {
                if key == name {
                    return Some(value);
                }
            }
        }
    }

    if let Ok(Object::Array(kids)) = dict.get(b"Kids") {
        for kid in kids {
            if let Object::Reference(kid_ref) = kid {
                if let Some(found) = search_name_tree(doc, *kid_ref, name, depth + 1) {
                    return Some(found);
                }
            }
        }
    }

    None
}

fn get_page_from_dest_array(arr: &[Object], page_map: &[(ObjectId, u32)]) -> Option<u32> {
    // [page_ref, /XYZ, left, top, zoom] or similar
    if let Some(Object::Reference(page_ref)) = arr.first() {
        for (id, page_num) in page_map {
            if id == page_ref {
                return Some(*page_num);
            }
        }
    }
    None
}

fn fit_name(arr: &[Object]) -> Option<String> {
    match arr.get(1) {
        Some(Object::Name(name)) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

fn build_page_map(doc: &Document) -> Vec<(ObjectId, u32)> {
    let mut pages: Vec<_> = doc.get_pages().into_iter().collect();
    pages.sort_by_key(|(num, _)| *num);
    pages.into_iter().map(|(num, id)| (id, num)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::sample_document;
    use lopdf::dictionary;

    #[test]
    fn test_no_outline() {
        let doc = sample_document(&[vec!["only page"]], false);
        assert!(read_outline_from_doc(&doc).unwrap().is_empty());
    }

    #[test]
    fn test_goto_action_and_named_destination() {
        let mut doc = sample_document(&[vec!["one"], vec!["two"]], false);
        let pages = build_page_map(&doc);
        let second = pages[1].0;

        let dests_id = doc.add_object(dictionary! {
            "sec2" => vec![Object::Reference(second), "Fit".into()],
        });
        let outlines_id = doc.new_object_id();
        let action_item = doc.new_object_id();
        let named_item = doc.new_object_id();
        doc.objects.insert(
            action_item,
            Object::Dictionary(dictionary! {
                "Title" => Object::string_literal("By action"),
                "Parent" => outlines_id,
                "Next" => named_item,
                "A" => dictionary! {
                    "S" => "GoTo",
                    "D" => vec![
                        Object::Reference(second),
                        "XYZ".into(),
                        Object::Null,
                        Object::Null,
                        Object::Null,
                    ],
                },
            }),
        );
        doc.objects.insert(
            named_item,
            Object::Dictionary(dictionary! {
                "Title" => Object::string_literal("By name"),
                "Parent" => outlines_id,
                "Prev" => action_item,
                "Dest" => Object::string_literal("sec2"),
            }),
        );
        doc.objects.insert(
            outlines_id,
            Object::Dictionary(dictionary! {
                "Type" => "Outlines",
                "First" => action_item,
                "Last" => named_item,
                "Count" => 2,
            }),
        );
        let root = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
        let catalog = doc.get_dictionary_mut(root).unwrap();
        catalog.set("Outlines", outlines_id);
        catalog.set("Dests", dests_id);

        let items = read_outline_from_doc(&doc).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "By action");
        assert_eq!(items[0].page, Some(2));
        assert_eq!(items[0].fit.as_deref(), Some("XYZ"));
        assert_eq!(items[1].title, "By name");
        assert_eq!(items[1].page, Some(2));
    }
}
