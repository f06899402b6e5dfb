use anyhow::{anyhow, bail, Result};

/// One bound of a page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRef {
    Number(u32),
    End,
}

impl PageRef {
    fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("end") {
            Ok(PageRef::End)
        } else {
            s.parse::<u32>()
                .map(PageRef::Number)
                .map_err(|_| anyhow!("Invalid page number: {}", s))
        }
    }

    fn resolve(self, total_pages: u32) -> u32 {
        match self {
            PageRef::Number(n) => n,
            PageRef::End => total_pages,
        }
    }
}

/// A single page (`5`) or an inclusive range (`1-5`, `9-6`, `3-end`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: PageRef,
    pub end: PageRef,
}

impl PageRange {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            bail!("Empty page range");
        }

        match s.split_once('-') {
            // "-5" is not a range
            Some(("", _)) => bail!("Invalid page range: {}", s),
            Some((start, end)) => Ok(PageRange {
                start: PageRef::parse(start)?,
                end: PageRef::parse(end)?,
            }),
            None => {
                let page = PageRef::parse(s)?;
                Ok(PageRange {
                    start: page,
                    end: page,
                })
            }
        }
    }

    /// Expand into 1-based page numbers, validated against `total_pages`.
    pub fn expand(&self, total_pages: u32) -> Result<Vec<u32>> {
        let start = self.start.resolve(total_pages);
        let end = self.end.resolve(total_pages);

        if start == 0 || end == 0 {
            bail!("Page numbers must be >= 1");
        }
        for page in [start, end] {
            if page > total_pages {
                bail!("Page {} exceeds total pages {}", page, total_pages);
            }
        }

        Ok(if start <= end {
            (start..=end).collect()
        } else {
            (end..=start).rev().collect()
        })
    }
}

/// Expand a comma-separated list like `1-3,7,9-end` into 1-based page numbers.
pub fn expand_page_ranges(s: &str, total_pages: u32) -> Result<Vec<u32>> {
    let mut pages = Vec::new();
    for part in s.split(',') {
        pages.extend(PageRange::parse(part)?.expand(total_pages)?);
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_page() {
        let range = PageRange::parse("5").unwrap();
        assert_eq!(range.start, PageRef::Number(5));
        assert_eq!(range.expand(10).unwrap(), vec![5]);
    }

    #[test]
    fn test_page_range() {
        assert_eq!(PageRange::parse("1-5").unwrap().expand(10).unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_reverse_range() {
        assert_eq!(PageRange::parse("5-1").unwrap().expand(10).unwrap(), vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_end_keyword() {
        assert_eq!(PageRange::parse("8-END").unwrap().expand(10).unwrap(), vec![8, 9, 10]);
    }

    #[test]
    fn test_comma_separated() {
        assert_eq!(expand_page_ranges("1-3, 7,9-10", 10).unwrap(), vec![1, 2, 3, 7, 9, 10]);
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(PageRange::parse("").is_err());
        assert!(PageRange::parse("-5").is_err());
        assert!(PageRange::parse("two").is_err());
        assert!(PageRange::parse("0").unwrap().expand(10).is_err());
        assert!(PageRange::parse("15").unwrap().expand(10).is_err());
    }
}
