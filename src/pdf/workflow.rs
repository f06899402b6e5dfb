use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use super::catalogue::{extract_catalogue, extract_catalogue_with, CatalogueOptions};
use super::document::{ApplyReport, Fit, OpenMode, PdfHandle};
use super::entries::load_bookmarks_from_text;

/// Suffix of the file written next to the working directory.
pub const OUTPUT_SUFFIX: &str = "_bookmark_version.pdf";

/// Everything one run needs; built from CLI arguments or an MCP request.
#[derive(Debug, Clone)]
pub struct BookmarkJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub mode: OpenMode,
    /// View every bookmark opens with.
    pub fit: Fit,
    pub catalogue: CatalogueOptions,
    /// Take bookmarks from a `title@page` file instead of the PDF's catalogue.
    pub bookmarks_file: Option<PathBuf>,
}

impl BookmarkJob {
    /// The default job: NEWLY mode, no offset, output in the working directory.
    pub fn new<P: AsRef<Path>>(input: P) -> Self {
        let input = input.as_ref().to_path_buf();
        BookmarkJob {
            output: default_output_path(&input),
            input,
            mode: OpenMode::default(),
            fit: Fit::default(),
            catalogue: CatalogueOptions::default(),
            bookmarks_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookmarkReport {
    pub output: PathBuf,
    pub page_count: u32,
    pub entries_found: usize,
    #[serde(flatten)]
    pub apply: ApplyReport,
}

/// `<stem>_bookmark_version.pdf`, relative to the current directory.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    PathBuf::from(format!("{}{}", stem, OUTPUT_SUFFIX))
}

/// Open the input, gather entries, apply them and save the result.
///
/// The input is read twice: once to build the writable document and once to
/// walk its text layout. Each read is closed before the call returns.
pub fn run(job: &BookmarkJob) -> Result<BookmarkReport> {
    let mut handle = PdfHandle::open(&job.input, job.mode)?;

    let entries = match &job.bookmarks_file {
        Some(file) => load_bookmarks_from_text(file, job.catalogue.page_offset)?,
        None if job.catalogue.is_plain_scan() => {
            extract_catalogue(&job.input, job.catalogue.page_offset)?
        }
        None => extract_catalogue_with(&job.input, &job.catalogue)?,
    };

    let apply = handle.add_bookmarks_with(&entries, None, job.fit);
    let page_count = handle.page_count();
    handle.save(&job.output)?;

    info!(
        "wrote {} with {} bookmark(s)",
        job.output.display(),
        apply.applied
    );
    Ok(BookmarkReport {
        output: job.output.clone(),
        page_count,
        entries_found: entries.len(),
        apply,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{rfc_document, save_to};
    use crate::pdf::outline::read_outline;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/tmp/docs/rfc2616.pdf")),
            PathBuf::from("rfc2616_bookmark_version.pdf")
        );
        assert_eq!(
            default_output_path(Path::new("notes")),
            PathBuf::from("notes_bookmark_version.pdf")
        );
    }

    #[test]
    fn test_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("rfc9999.pdf");
        let mut doc = rfc_document(&["Overview....3"]);
        save_to(&mut doc, &input);

        let mut job = BookmarkJob::new(&input);
        job.output = dir.path().join(default_output_path(&input));
        let report = run(&job).unwrap();

        assert_eq!(report.page_count, 20);
        assert_eq!(report.entries_found, 1);
        assert_eq!(report.apply.applied, 1);
        assert!(report.apply.failed.is_empty());

        let out = lopdf::Document::load(&job.output).unwrap();
        assert_eq!(out.get_pages().len(), 20);
        assert!(out.trailer.get(b"Info").is_err());

        let items = read_outline(&job.output).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Overview");
        assert_eq!(items[0].page, Some(3));
    }

    #[test]
    fn test_page_selection_skips_catalogue_page() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("rfc9999.pdf");
        let mut doc = rfc_document(&["Overview....3"]);
        save_to(&mut doc, &input);

        let mut job = BookmarkJob::new(&input);
        job.output = dir.path().join("out.pdf");
        job.catalogue.pages = Some("3-end".to_string());
        let report = run(&job).unwrap();

        assert_eq!(report.entries_found, 0);
        assert!(read_outline(&job.output).unwrap().is_empty());
    }

    #[test]
    fn test_bookmarks_from_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("rfc9999.pdf");
        let list = dir.path().join("bookmarks.txt");
        let mut doc = rfc_document(&[]);
        save_to(&mut doc, &input);
        std::fs::write(&list, "Cover@1\nAppendix@19\nMissing@40\n").unwrap();

        let mut job = BookmarkJob::new(&input);
        job.output = dir.path().join("out.pdf");
        job.bookmarks_file = Some(list);
        job.catalogue.page_offset = 1;
        let report = run(&job).unwrap();

        assert_eq!(report.entries_found, 3);
        assert_eq!(report.apply.applied, 2);
        assert_eq!(report.apply.failed.len(), 1);

        let pages: Vec<Option<u32>> = read_outline(&job.output)
            .unwrap()
            .into_iter()
            .map(|i| i.page)
            .collect();
        assert_eq!(pages, vec![Some(2), Some(20)]);
    }

    #[test]
    fn test_missing_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = BookmarkJob::new(dir.path().join("absent.pdf"));
        job.output = dir.path().join("out.pdf");
        assert!(run(&job).is_err());
        assert!(!job.output.exists());
    }
}
