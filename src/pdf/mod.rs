pub mod catalogue;
pub mod document;
pub mod entries;
pub mod error;
pub mod layout;
pub mod matcher;
pub mod outline;
pub mod text;
pub mod workflow;

#[cfg(test)]
pub(crate) mod fixtures;

pub use document::{OpenMode, PdfHandle};
