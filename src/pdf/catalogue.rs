//! Catalogue (table of contents) extraction from rendered page text.

use anyhow::{Context, Result};
use lopdf::{Document, Object};
use std::path::Path;
use tracing::{debug, info, trace, warn};

use super::entries::{finish_candidate, BookmarkEntry};
use super::error::BookmarkError;
use super::layout::{collect_layouts, PageLayout};
use super::matcher::{CatalogueMatcher, MatcherKind};
use crate::page_range::expand_page_ranges;

/// Extract permission bit of the encryption dictionary's `P` entry.
const PERMISSION_EXTRACT: i64 = 1 << 4;

#[derive(Debug, Clone, Default)]
pub struct CatalogueOptions {
    /// Added to every page number read from the catalogue.
    pub page_offset: u32,
    /// Pages to scan (e.g. `1-5`); all pages when `None`.
    pub pages: Option<String>,
    pub matcher: MatcherKind,
}

impl CatalogueOptions {
    /// Every page, dotted-leader matcher; only the offset is set.
    pub fn is_plain_scan(&self) -> bool {
        self.pages.is_none() && self.matcher == MatcherKind::Dotted
    }
}

/// Extract the catalogue of a PDF with the default dotted-leader matcher.
pub fn extract_catalogue<P: AsRef<Path>>(
    path: P,
    page_offset: u32,
) -> Result<Vec<BookmarkEntry>> {
    let options = CatalogueOptions {
        page_offset,
        ..Default::default()
    };
    extract_catalogue_with(path, &options)
}

pub fn extract_catalogue_with<P: AsRef<Path>>(
    path: P,
    options: &CatalogueOptions,
) -> Result<Vec<BookmarkEntry>> {
    let path = path.as_ref();
    let doc =
        Document::load(path).with_context(|| format!("Failed to open PDF: {}", path.display()))?;
    check_extractable(&doc, path)?;

    let total = doc.get_pages().len() as u32;
    let pages = match &options.pages {
        Some(spec) => Some(expand_page_ranges(spec, total)?),
        None => None,
    };

    let layouts = collect_layouts(&doc, pages.as_deref())
        .with_context(|| format!("Failed to lay out text of {}", path.display()))?;
    let matcher = options.matcher.build();
    let entries = entries_from_layouts(&layouts, matcher.as_ref(), options.page_offset);

    info!(
        "found {} catalogue entr{} in {} using the {} matcher",
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" },
        path.display(),
        matcher.name()
    );
    Ok(entries)
}

/// Apply `matcher` to every line of every box, in page, box, then line order.
pub fn entries_from_layouts(
    layouts: &[PageLayout],
    matcher: &dyn CatalogueMatcher,
    page_offset: u32,
) -> Vec<BookmarkEntry> {
    let mut entries = Vec::new();

    for layout in layouts {
        for text_box in &layout.boxes {
            trace!(page = layout.page, "text box:\n{}", text_box.text());
            for line in &text_box.lines {
                let Some(candidate) = matcher.candidate(&line.text) else {
                    continue;
                };
                match finish_candidate(candidate, page_offset) {
                    Ok(entry) => {
                        debug!(page = layout.page, "catalogue entry {:?}", entry);
                        entries.push(entry);
                    }
                    Err(reason) => warn!(
                        page = layout.page,
                        "skipping catalogue line {:?}: {}", line.text, reason
                    ),
                }
            }
        }
    }

    entries
}

/// Fail when the document's encryption dictionary withholds text extraction.
pub fn check_extractable(doc: &Document, path: &Path) -> Result<(), BookmarkError> {
    let encrypt = match doc.trailer.get(b"Encrypt") {
        Ok(Object::Reference(id)) => doc.get_dictionary(*id).ok(),
        Ok(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };
    let Some(encrypt) = encrypt else {
        return Ok(());
    };

    let permissions = encrypt.get(b"P").and_then(Object::as_i64).unwrap_or(-1);
    if permissions & PERMISSION_EXTRACT == 0 {
        return Err(BookmarkError::ExtractionNotAllowed(path.to_path_buf()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{rfc_document, sample_document, save_to};
    use crate::pdf::layout::{TextBox, TextLine};
    use crate::pdf::matcher::DottedLeader;
    use lopdf::dictionary;

    fn entry(title: &str, page: u32) -> BookmarkEntry {
        BookmarkEntry {
            title: title.to_string(),
            page,
        }
    }

    fn text_box(lines: &[&str]) -> TextBox {
        TextBox {
            lines: lines
                .iter()
                .enumerate()
                .map(|(i, text)| TextLine {
                    text: text.to_string(),
                    x0: 72.0,
                    x1: 300.0,
                    y: 700.0 - 12.0 * i as f64,
                    height: 10.0,
                })
                .collect(),
            x0: 72.0,
            x1: 300.0,
        }
    }

    #[test]
    fn test_entries_in_page_box_line_order() {
        let layouts = vec![
            PageLayout {
                page: 1,
                boxes: vec![text_box(&["Status of This Memo"])],
            },
            PageLayout {
                page: 2,
                boxes: vec![
                    text_box(&["Introduction.....5", "plain prose here", "Terminology...6"]),
                    text_box(&["Security.........9"]),
                ],
            },
        ];

        let entries = entries_from_layouts(&layouts, &DottedLeader::default(), 0);
        assert_eq!(
            entries,
            vec![entry("Introduction", 5), entry("Terminology", 6), entry("Security", 9)]
        );

        let shifted = entries_from_layouts(&layouts, &DottedLeader::default(), 2);
        assert_eq!(shifted[0], entry("Introduction", 7));
    }

    #[test]
    fn test_malformed_candidates_are_skipped() {
        let layouts = vec![PageLayout {
            page: 1,
            boxes: vec![text_box(&["....5", "Appendix..A1", "Good....2"])],
        }];
        let entries = entries_from_layouts(&layouts, &DottedLeader::default(), 0);
        assert_eq!(entries, vec![entry("Good", 2)]);
    }

    #[test]
    fn test_plain_scan() {
        let mut options = CatalogueOptions {
            page_offset: 4,
            ..Default::default()
        };
        assert!(options.is_plain_scan());
        options.matcher = MatcherKind::Spaced;
        assert!(!options.is_plain_scan());
        options.matcher = MatcherKind::Dotted;
        options.pages = Some("1-3".to_string());
        assert!(!options.is_plain_scan());
    }

    #[test]
    fn test_extract_from_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rfc.pdf");
        let mut doc = rfc_document(&["Overview....3", "Terminology.....4"]);
        save_to(&mut doc, &path);

        assert_eq!(
            extract_catalogue(&path, 0).unwrap(),
            vec![entry("Overview", 3), entry("Terminology", 4)]
        );
        assert_eq!(
            extract_catalogue(&path, 1).unwrap(),
            vec![entry("Overview", 4), entry("Terminology", 5)]
        );
    }

    #[test]
    fn test_page_selection_limits_scan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rfc.pdf");
        let mut doc = rfc_document(&["Overview....3"]);
        save_to(&mut doc, &path);

        let only_first = CatalogueOptions {
            pages: Some("1".to_string()),
            ..Default::default()
        };
        assert!(extract_catalogue_with(&path, &only_first).unwrap().is_empty());

        let toc_page = CatalogueOptions {
            pages: Some("2".to_string()),
            ..Default::default()
        };
        assert_eq!(
            extract_catalogue_with(&path, &toc_page).unwrap(),
            vec![entry("Overview", 3)]
        );

        let out_of_range = CatalogueOptions {
            pages: Some("21".to_string()),
            ..Default::default()
        };
        assert!(extract_catalogue_with(&path, &out_of_range).is_err());
    }

    #[test]
    fn test_prose_only_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prose.pdf");
        let mut doc = sample_document(&[vec!["Nothing to see here.", "Version 1.0 final."]], false);
        save_to(&mut doc, &path);

        assert!(extract_catalogue(&path, 0).unwrap().is_empty());
    }

    #[test]
    fn test_extraction_forbidden() {
        let mut doc = sample_document(&[vec!["x"]], false);
        let path = Path::new("locked.pdf");

        doc.trailer.set(
            "Encrypt",
            dictionary! { "Filter" => "Standard", "P" => -1i64 ^ PERMISSION_EXTRACT },
        );
        assert!(matches!(
            check_extractable(&doc, path),
            Err(BookmarkError::ExtractionNotAllowed(_))
        ));

        doc.trailer.set("Encrypt", dictionary! { "Filter" => "Standard", "P" => -4i64 });
        assert!(check_extractable(&doc, path).is_ok());

        doc.trailer.remove(b"Encrypt");
        assert!(check_extractable(&doc, path).is_ok());
    }
}
