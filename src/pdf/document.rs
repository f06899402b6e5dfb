use anyhow::{Context, Result};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

use super::entries::BookmarkEntry;
use super::error::BookmarkError;
use super::text::{decode_text_string, encode_text_string, sanitize_title};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// How the writable document is built from the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OpenMode {
    /// Keep the whole source document: catalog, info, existing outline.
    Clone,
    /// Keep only the pages, in order, under a fresh catalog.
    #[default]
    Newly,
}

/// RGB, each component in 0.0..=1.0
pub type Color = [f32; 3];

/// View a bookmark opens with.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Fit {
    #[default]
    Fit,
    FitB,
    FitH(Option<f32>),
    FitV(Option<f32>),
    Xyz {
        left: Option<f32>,
        top: Option<f32>,
        zoom: Option<f32>,
    },
}

impl Fit {
    /// Parse a fit mode name; position parameters are left unset.
    pub fn from_name(name: &str) -> Result<Self, String> {
        match name.to_ascii_lowercase().as_str() {
            "fit" => Ok(Fit::Fit),
            "fitb" => Ok(Fit::FitB),
            "fith" => Ok(Fit::FitH(None)),
            "fitv" => Ok(Fit::FitV(None)),
            "xyz" => Ok(Fit::Xyz {
                left: None,
                top: None,
                zoom: None,
            }),
            _ => Err(format!(
                "unknown fit mode '{}' (expected fit, fitb, fith, fitv or xyz)",
                name
            )),
        }
    }

    fn destination(&self, page_id: ObjectId) -> Vec<Object> {
        let mut dest = vec![Object::Reference(page_id)];
        match *self {
            Fit::Fit => dest.push("Fit".into()),
            Fit::FitB => dest.push("FitB".into()),
            Fit::FitH(top) => {
                dest.push("FitH".into());
                dest.push(real_or_null(top));
            }
            Fit::FitV(left) => {
                dest.push("FitV".into());
                dest.push(real_or_null(left));
            }
            Fit::Xyz { left, top, zoom } => {
                dest.push("XYZ".into());
                dest.push(real_or_null(left));
                dest.push(real_or_null(top));
                dest.push(real_or_null(zoom));
            }
        }
        dest
    }
}

fn real_or_null(value: Option<f32>) -> Object {
    value.map_or(Object::Null, Object::Real)
}

/// Handle to a bookmark added to a [`PdfHandle`], usable as a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookmarkId(usize);

#[derive(Debug, Clone)]
struct OutlineNode {
    title: String,
    page_id: ObjectId,
    parent: Option<BookmarkId>,
    color: Option<Color>,
    fit: Fit,
}

/// Outcome of applying a list of entries.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ApplyReport {
    pub applied: usize,
    pub failed: Vec<FailedEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedEntry {
    pub entry: BookmarkEntry,
    pub reason: String,
}

/// A source PDF opened for adding bookmarks.
pub struct PdfHandle {
    doc: Document,
    file_name: String,
    page_ids: Vec<ObjectId>,
    info: Option<Dictionary>,
    metadata: Option<Vec<u8>>,
    outline: Vec<OutlineNode>,
}

impl PdfHandle {
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref();
        let source = Document::load(path)
            .with_context(|| format!("Failed to open PDF: {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let handle = Self::from_document(source, file_name, mode)?;
        debug!(
            file = %handle.file_name,
            pages = handle.page_count(),
            ?mode,
            "opened PDF"
        );
        Ok(handle)
    }

    pub fn from_document(source: Document, file_name: String, mode: OpenMode) -> Result<Self> {
        let info = info_dictionary(&source);
        let metadata = xmp_metadata(&source);

        let doc = match mode {
            OpenMode::Clone => source,
            OpenMode::Newly => rebuild_from_pages(&source)?,
        };

        Ok(PdfHandle {
            page_ids: sorted_page_ids(&doc),
            doc,
            file_name,
            info,
            metadata,
            outline: Vec::new(),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn page_count(&self) -> u32 {
        self.page_ids.len() as u32
    }

    /// The source's document information dictionary, as read.
    pub fn info_dictionary(&self) -> Option<&Dictionary> {
        self.info.as_ref()
    }

    /// The source's XMP metadata stream content, as read.
    pub fn xmp_metadata(&self) -> Option<&[u8]> {
        self.metadata.as_deref()
    }

    /// Decoded view of the source's document information.
    pub fn info(&self) -> PdfInfo {
        let mut info = PdfInfo::default();
        if let Some(dict) = &self.info {
            info.title = get_string_from_dict(dict, b"Title");
            info.author = get_string_from_dict(dict, b"Author");
            info.creator = get_string_from_dict(dict, b"Creator");
            info.producer = get_string_from_dict(dict, b"Producer");
            info.creation_date = get_string_from_dict(dict, b"CreationDate");
            info.mod_date = get_string_from_dict(dict, b"ModDate");
            info.subject = get_string_from_dict(dict, b"Subject");
            info.keywords = get_string_from_dict(dict, b"Keywords");
        }
        info.page_count = self.page_count();
        info
    }

    /// The writable document as it stands; the outline is only written on save.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Add one bookmark pointing at the 1-based `page`.
    pub fn add_bookmark(
        &mut self,
        title: &str,
        page: u32,
        parent: Option<BookmarkId>,
        color: Option<Color>,
        fit: Fit,
    ) -> Result<BookmarkId, BookmarkError> {
        let title = sanitize_title(title);
        if title.is_empty() {
            return Err(BookmarkError::EmptyTitle);
        }
        if page == 0 || page > self.page_count() {
            return Err(BookmarkError::PageOutOfRange {
                page,
                page_count: self.page_count(),
            });
        }
        if let Some(BookmarkId(idx)) = parent {
            if idx >= self.outline.len() {
                return Err(BookmarkError::UnknownParent(idx));
            }
        }

        let page_id = self.page_ids[(page - 1) as usize];
        info!("added bookmark {:?} -> page {}", title, page);
        self.outline.push(OutlineNode {
            title,
            page_id,
            parent,
            color,
            fit,
        });
        Ok(BookmarkId(self.outline.len() - 1))
    }

    /// Add entries as flat bookmarks in list order, continuing past failures.
    pub fn add_bookmarks(&mut self, entries: &[BookmarkEntry]) -> ApplyReport {
        self.add_bookmarks_with(entries, None, Fit::default())
    }

    /// [`add_bookmarks`](Self::add_bookmarks) with one color and fit mode for every entry.
    pub fn add_bookmarks_with(
        &mut self,
        entries: &[BookmarkEntry],
        color: Option<Color>,
        fit: Fit,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();

        for entry in entries {
            match self.add_bookmark(&entry.title, entry.page, None, color, fit) {
                Ok(_) => report.applied += 1,
                Err(e) => {
                    warn!("skipping bookmark {:?}: {}", entry.title, e);
                    report.failed.push(FailedEntry {
                        entry: entry.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "added {} of {} bookmark(s) to {}",
            report.applied,
            entries.len(),
            self.file_name
        );
        report
    }

    /// Write the document with its outline to `path`, replacing any existing file.
    pub fn save<P: AsRef<Path>>(mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.write_outline()?;
        self.doc
            .save(path)
            .with_context(|| format!("Failed to save PDF: {}", path.display()))?;
        info!("saved {}", path.display());
        Ok(())
    }

    fn write_outline(&mut self) -> Result<()> {
        if self.outline.is_empty() {
            return Ok(());
        }

        let root_id = self
            .doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .context("Document has no catalog")?;
        let existing = self
            .doc
            .get_dictionary(root_id)?
            .get(b"Outlines")
            .and_then(Object::as_reference)
            .ok()
            .filter(|id| self.doc.get_dictionary(*id).is_ok());

        let outlines_id = existing.unwrap_or_else(|| self.doc.new_object_id());
        let node_ids: Vec<ObjectId> = self
            .outline
            .iter()
            .map(|_| self.doc.new_object_id())
            .collect();

        // Existing top-level items stay in front of the new ones
        let (existing_first, existing_last, existing_count) = match existing {
            Some(id) => {
                let dict = self.doc.get_dictionary(id)?;
                let first = dict.get(b"First").and_then(Object::as_reference).ok();
                let last = dict
                    .get(b"Last")
                    .and_then(Object::as_reference)
                    .ok()
                    .or_else(|| first.and_then(|f| last_sibling(&self.doc, f)));
                let count = dict.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
                (first, last, count)
            }
            None => (None, None, 0),
        };

        for (idx, node) in self.outline.iter().enumerate() {
            let siblings = self.children_of(node.parent);
            let pos = siblings.iter().position(|&i| i == idx).unwrap_or(0);

            let mut dict = dictionary! {
                "Title" => encode_text_string(&node.title),
                "Parent" => node.parent.map_or(outlines_id, |BookmarkId(p)| node_ids[p]),
                "Dest" => node.fit.destination(node.page_id),
            };
            if pos > 0 {
                dict.set("Prev", node_ids[siblings[pos - 1]]);
            } else if node.parent.is_none() {
                if let Some(last) = existing_last {
                    dict.set("Prev", last);
                }
            }
            if let Some(&next) = siblings.get(pos + 1) {
                dict.set("Next", node_ids[next]);
            }
            let children = self.children_of(Some(BookmarkId(idx)));
            if let (Some(&first), Some(&last)) = (children.first(), children.last()) {
                dict.set("First", node_ids[first]);
                dict.set("Last", node_ids[last]);
                dict.set("Count", self.descendants(idx) as i64);
            }
            if let Some([r, g, b]) = node.color {
                dict.set("C", vec![Object::Real(r), Object::Real(g), Object::Real(b)]);
            }
            self.doc.objects.insert(node_ids[idx], Object::Dictionary(dict));
        }

        let top = self.children_of(None);
        let new_first = top.first().map(|&i| node_ids[i]);
        let new_last = top.last().map(|&i| node_ids[i]);

        if let (Some(last), Some(first)) = (existing_last, new_first) {
            self.doc.get_dictionary_mut(last)?.set("Next", first);
        }

        let mut outlines = dictionary! {
            "Type" => "Outlines",
            "Count" => existing_count.max(0) + self.outline.len() as i64,
        };
        if let Some(first) = existing_first.or(new_first) {
            outlines.set("First", first);
        }
        if let Some(last) = new_last {
            outlines.set("Last", last);
        }
        self.doc.objects.insert(outlines_id, Object::Dictionary(outlines));

        let catalog = self.doc.get_dictionary_mut(root_id)?;
        catalog.set("Outlines", outlines_id);
        if catalog.get(b"PageMode").is_err() {
            catalog.set("PageMode", "UseOutlines");
        }

        Ok(())
    }

    fn children_of(&self, parent: Option<BookmarkId>) -> Vec<usize> {
        self.outline
            .iter()
            .enumerate()
            .filter(|(_, node)| node.parent == parent)
            .map(|(idx, _)| idx)
            .collect()
    }

    fn descendants(&self, idx: usize) -> usize {
        self.children_of(Some(BookmarkId(idx)))
            .into_iter()
            .map(|child| 1 + self.descendants(child))
            .sum()
    }
}

/// Rebuild a document holding only the source's pages, in order, under a new
/// catalog and a single page tree node. Inherited page attributes are copied
/// onto each page so the flattened tree renders the same.
fn rebuild_from_pages(source: &Document) -> Result<Document> {
    let page_ids = sorted_page_ids(source);
    if page_ids.is_empty() {
        anyhow::bail!("No pages found");
    }

    let mut doc = source.clone();
    let pages_id = doc.new_object_id();

    for &page_id in &page_ids {
        let inherited = inherited_attributes(source, page_id);
        let page = doc
            .get_dictionary_mut(page_id)
            .with_context(|| format!("Page object {:?} is not a dictionary", page_id))?;
        for (key, value) in inherited {
            page.set(key, value);
        }
        page.set("Parent", pages_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as u32,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });

    doc.trailer = Dictionary::new();
    doc.trailer.set("Root", catalog_id);
    let pruned = doc.prune_objects();
    debug!("dropped {} object(s) not reachable from the pages", pruned.len());

    Ok(doc)
}

/// Follow `Next` links from `first` to the end of the sibling chain.
fn last_sibling(doc: &Document, first: ObjectId) -> Option<ObjectId> {
    let mut seen = HashSet::new();
    let mut current = first;
    while seen.insert(current) {
        let dict = doc.get_dictionary(current).ok()?;
        match dict.get(b"Next").and_then(Object::as_reference) {
            Ok(next) => current = next,
            Err(_) => break,
        }
    }
    Some(current)
}

/// Attributes the page lacks but an ancestor provides, nearest ancestor first.
fn inherited_attributes(doc: &Document, page_id: ObjectId) -> Vec<(&'static [u8], Object)> {
    let mut found: Vec<(&'static [u8], Object)> = Vec::new();
    let Ok(page) = doc.get_dictionary(page_id) else {
        return found;
    };

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(id) = parent {
        // malformed trees can loop
        depth += 1;
        if depth > 64 {
            break;
        }
        let Ok(node) = doc.get_dictionary(id) else {
            break;
        };
        for key in INHERITABLE {
            if page.get(key).is_ok() || found.iter().any(|(k, _)| *k == key) {
                continue;
            }
            if let Ok(value) = node.get(key) {
                found.push((key, value.clone()));
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    found
}

/// Page object IDs ordered by page number.
fn sorted_page_ids(doc: &Document) -> Vec<ObjectId> {
    let mut pages: Vec<_> = doc.get_pages().into_iter().collect();
    pages.sort_by_key(|(num, _)| *num);
    pages.into_iter().map(|(_, id)| id).collect()
}

fn info_dictionary(doc: &Document) -> Option<Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok().cloned(),
        Object::Dictionary(dict) => Some(dict.clone()),
        _ => None,
    }
}

fn xmp_metadata(doc: &Document) -> Option<Vec<u8>> {
    let id = doc.catalog().ok()?.get(b"Metadata").ok()?.as_reference().ok()?;
    match doc.get_object(id).ok()? {
        Object::Stream(stream) => Some(stream.content.clone()),
        _ => None,
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct PdfInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub mod_date: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub page_count: u32,
}

fn get_string_from_dict(dict: &Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key).ok().and_then(|obj| match obj {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    })
}
