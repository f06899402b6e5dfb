use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use super::matcher::{Candidate, CatalogueMatcher, Separator};
use super::text::{decode_utf8_lossy, sanitize_title};

/// One outline entry: a title and the 1-based page it jumps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkEntry {
    pub title: String,
    pub page: u32,
}

impl BookmarkEntry {
    /// Format as a line of the `title@page` text format.
    pub fn to_text_line(&self) -> String {
        format!("{}@{}", self.title, self.page)
    }
}

/// Why a candidate line did not become an entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("empty title")]
    EmptyTitle,
    #[error("empty page number")]
    EmptyPage,
    #[error("invalid page number {0:?}")]
    InvalidPage(String),
    #[error("page number resolves to 0")]
    ZeroPage,
}

/// Validate a split candidate and apply the page offset.
pub fn finish_candidate(
    candidate: Candidate,
    page_offset: u32,
) -> Result<BookmarkEntry, Rejection> {
    let title = sanitize_title(&candidate.title);
    if title.is_empty() {
        return Err(Rejection::EmptyTitle);
    }
    if candidate.raw_page.is_empty() {
        return Err(Rejection::EmptyPage);
    }

    let raw: u32 = candidate
        .raw_page
        .parse()
        .map_err(|_| Rejection::InvalidPage(candidate.raw_page.clone()))?;
    let page = raw
        .checked_add(page_offset)
        .ok_or_else(|| Rejection::InvalidPage(candidate.raw_page.clone()))?;
    if page == 0 {
        return Err(Rejection::ZeroPage);
    }

    Ok(BookmarkEntry { title, page })
}

/// Parse `title@page` lines. Blank lines are ignored, malformed lines skipped.
pub fn parse_bookmarks_text(text: &str, page_offset: u32) -> Vec<BookmarkEntry> {
    let matcher = Separator('@');
    let mut entries = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        debug!(line = idx + 1, "read bookmark line: {}", line);

        let Some(candidate) = matcher.candidate(line) else {
            continue;
        };
        match finish_candidate(candidate, page_offset) {
            Ok(entry) => entries.push(entry),
            Err(reason) => warn!(line = idx + 1, "skipping bookmark line {:?}: {}", line, reason),
        }
    }

    entries
}

/// Read a bookmark list from a UTF-8 text file of `title@page` lines.
pub fn load_bookmarks_from_text<P: AsRef<Path>>(
    path: P,
    page_offset: u32,
) -> Result<Vec<BookmarkEntry>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read bookmark file: {}", path.display()))?;

    let (text, lossy) = decode_utf8_lossy(&bytes);
    if lossy {
        warn!(
            "{} is not valid UTF-8; invalid sequences were replaced with U+FFFD",
            path.display()
        );
    }

    Ok(parse_bookmarks_text(&text, page_offset))
}

/// Write entries in the `title@page` format read by [`load_bookmarks_from_text`].
pub fn write_bookmarks_text<P: AsRef<Path>>(path: P, entries: &[BookmarkEntry]) -> Result<()> {
    let path = path.as_ref();
    let mut text = String::new();
    for entry in entries {
        text.push_str(&entry.to_text_line());
        text.push('\n');
    }
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write bookmark file: {}", path.display()))
}
