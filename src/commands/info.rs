use crate::pdf::outline::read_outline_from_doc;
use crate::pdf::{OpenMode, PdfHandle};
use anyhow::Result;
use std::path::Path;

pub fn run<P: AsRef<Path>>(path: P) -> Result<()> {
    let handle = PdfHandle::open(&path, OpenMode::Clone)?;
    let info = handle.info();

    println!("File: {}", handle.file_name());
    println!("Pages: {}", info.page_count);

    if let Some(title) = &info.title {
        println!("Title: {}", title);
    }
    if let Some(author) = &info.author {
        println!("Author: {}", author);
    }
    if let Some(subject) = &info.subject {
        println!("Subject: {}", subject);
    }
    if let Some(keywords) = &info.keywords {
        println!("Keywords: {}", keywords);
    }
    if let Some(creator) = &info.creator {
        println!("Creator: {}", creator);
    }
    if let Some(producer) = &info.producer {
        println!("Producer: {}", producer);
    }
    if let Some(creation_date) = &info.creation_date {
        println!("Created: {}", format_pdf_date(creation_date));
    }
    if let Some(mod_date) = &info.mod_date {
        println!("Modified: {}", format_pdf_date(mod_date));
    }
    if let Some(dict) = handle.info_dictionary() {
        println!("Info entries: {}", dict.len());
    }
    if let Some(xmp) = handle.xmp_metadata() {
        println!("XMP metadata: {} bytes", xmp.len());
    }

    let bookmarks = read_outline_from_doc(handle.document())?;
    println!("Bookmarks: {}", bookmarks.len());

    Ok(())
}

/// `D:YYYYMMDDHHmmSS...` to `YYYY-MM-DD HH:mm:SS`; anything else is returned as is.
fn format_pdf_date(date: &str) -> String {
    let Some(d) = date.strip_prefix("D:") else {
        return date.to_string();
    };
    if d.len() < 8 || !d.is_ascii() {
        return date.to_string();
    }

    let time = if d.len() >= 14 {
        format!(" {}:{}:{}", &d[8..10], &d[10..12], &d[12..14])
    } else {
        String::new()
    };
    format!("{}-{}-{}{}", &d[0..4], &d[4..6], &d[6..8], time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pdf_date() {
        assert_eq!(format_pdf_date("D:20240131120000Z"), "2024-01-31 12:00:00");
        assert_eq!(format_pdf_date("D:20240131"), "2024-01-31");
        assert_eq!(format_pdf_date("yesterday"), "yesterday");
    }
}
