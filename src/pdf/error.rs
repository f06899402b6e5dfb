use std::path::PathBuf;
use thiserror::Error;

/// Failures that callers may want to tell apart from plain IO/parse errors.
#[derive(Debug, Error)]
pub enum BookmarkError {
    #[error("text extraction is not allowed for {}", .0.display())]
    ExtractionNotAllowed(PathBuf),

    #[error("page {page} is out of range (1-{page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("unknown parent bookmark #{0}")]
    UnknownParent(usize),

    #[error("bookmark title is empty")]
    EmptyTitle,
}
