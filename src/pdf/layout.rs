//! Reconstruction of horizontal text boxes from positioned glyphs.
//!
//! pdf-extract interprets the content streams and reports every glyph through
//! its `OutputDev` trait. The collector here keeps the glyph positions and
//! groups them into lines, then lines into boxes, in reading order.

use anyhow::{Context, Result};
use lopdf::Document;
use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};
use std::collections::BTreeSet;

/// Tolerance for treating a text matrix as unrotated.
const SKEW_EPSILON: f64 = 1e-3;
/// Horizontal gap (in font sizes) that reads as a word break.
const SPACE_GAP: f64 = 0.2;
/// Horizontal gap (in font sizes) that splits a row into separate lines.
const CHAR_MARGIN: f64 = 3.0;
/// Baseline distance (in line heights) still considered the same box.
const LINE_MARGIN: f64 = 1.5;
/// Horizontal slack (in line heights) when matching a line to a box.
const BOX_SLACK: f64 = 2.0;

/// A glyph in PDF user space (origin bottom-left, y grows upwards).
#[derive(Debug, Clone)]
pub struct Glyph {
    pub text: String,
    pub x: f64,
    pub y: f64,
    /// Horizontal advance, already scaled to user space.
    pub advance: f64,
    pub size: f64,
}

#[derive(Debug, Clone)]
pub struct TextLine {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    /// Baseline
    pub y: f64,
    pub height: f64,
}

#[derive(Debug, Clone)]
pub struct TextBox {
    pub lines: Vec<TextLine>,
    pub x0: f64,
    pub x1: f64,
}

impl TextBox {
    fn new(line: TextLine) -> Self {
        TextBox {
            x0: line.x0,
            x1: line.x1,
            lines: vec![line],
        }
    }

    /// Box text, one line per row.
    pub fn text(&self) -> String {
        let lines: Vec<&str> = self.lines.iter().map(|l| l.text.as_str()).collect();
        lines.join("\n")
    }

    fn accepts(&self, line: &TextLine) -> bool {
        let Some(last) = self.lines.last() else {
            return false;
        };
        let height = last.height.max(line.height);
        let drop = last.y - line.y;
        let slack = height * BOX_SLACK;

        drop > 0.0
            && drop <= height * LINE_MARGIN + f64::EPSILON
            && line.x0 <= self.x1 + slack
            && line.x1 >= self.x0 - slack
    }

    fn push(&mut self, line: TextLine) {
        self.x0 = self.x0.min(line.x0);
        self.x1 = self.x1.max(line.x1);
        self.lines.push(line);
    }
}

/// Text boxes of one page, in reading order.
#[derive(Debug, Clone)]
pub struct PageLayout {
    /// 1-based page number
    pub page: u32,
    pub boxes: Vec<TextBox>,
}

/// Group glyphs sharing a baseline into lines, ordered top to bottom.
pub fn group_lines(glyphs: Vec<Glyph>) -> Vec<TextLine> {
    let mut rows: Vec<(f64, f64, Vec<Glyph>)> = Vec::new();

    for glyph in glyphs {
        let row = rows.iter_mut().find(|(y, size, _)| {
            (glyph.y - *y).abs() <= size.max(glyph.size) * 0.5
        });
        match row {
            Some((_, size, members)) => {
                *size = size.max(glyph.size);
                members.push(glyph);
            }
            None => rows.push((glyph.y, glyph.size, vec![glyph])),
        }
    }

    let mut lines: Vec<TextLine> = rows
        .into_iter()
        .flat_map(|(y, size, members)| build_lines(y, size, members))
        .collect();

    lines.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x0.total_cmp(&b.x0)));
    lines
}

fn build_lines(y: f64, size: f64, mut glyphs: Vec<Glyph>) -> Vec<TextLine> {
    glyphs.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut lines = Vec::new();
    let mut segment: Vec<&Glyph> = Vec::new();
    for glyph in &glyphs {
        if let Some(prev) = segment.last() {
            if glyph.x - (prev.x + prev.advance) > glyph.size.max(prev.size) * CHAR_MARGIN {
                lines.extend(build_line(y, size, &segment));
                segment.clear();
            }
        }
        segment.push(glyph);
    }
    lines.extend(build_line(y, size, &segment));
    lines
}

fn build_line(y: f64, size: f64, glyphs: &[&Glyph]) -> Option<TextLine> {
    let mut text = String::new();
    let mut prev_end: Option<f64> = None;
    for glyph in glyphs {
        if let Some(end) = prev_end {
            let gap = glyph.x - end;
            if gap > glyph.size * SPACE_GAP
                && !text.ends_with(' ')
                && !glyph.text.starts_with(' ')
            {
                text.push(' ');
            }
        }
        text.push_str(&glyph.text);
        prev_end = Some(glyph.x + glyph.advance);
    }

    if text.trim().is_empty() {
        return None;
    }

    let x0 = glyphs.first().map(|g| g.x)?;
    let x1 = glyphs.last().map(|g| g.x + g.advance)?;
    Some(TextLine {
        text: text.trim_end().to_string(),
        x0,
        x1,
        y,
        height: size,
    })
}

/// Group ordered lines into boxes. A line joins the most recent box that sits
/// directly above it and overlaps horizontally, otherwise it opens a new box.
pub fn group_boxes(lines: Vec<TextLine>) -> Vec<TextBox> {
    let mut boxes: Vec<TextBox> = Vec::new();

    for line in lines {
        match boxes.iter_mut().rev().find(|b| b.accepts(&line)) {
            Some(text_box) => text_box.push(line),
            None => boxes.push(TextBox::new(line)),
        }
    }

    boxes
}

pub fn layout_page(page: u32, glyphs: Vec<Glyph>) -> PageLayout {
    PageLayout {
        page,
        boxes: group_boxes(group_lines(glyphs)),
    }
}

/// `OutputDev` that records glyph positions for the selected pages.
pub struct LayoutCollector {
    wanted: Option<BTreeSet<u32>>,
    current: Option<u32>,
    glyphs: Vec<Glyph>,
    pages: Vec<PageLayout>,
}

impl LayoutCollector {
    /// `pages` limits collection to those 1-based page numbers; `None` keeps all.
    pub fn new(pages: Option<&[u32]>) -> Self {
        LayoutCollector {
            wanted: pages.map(|p| p.iter().copied().collect()),
            current: None,
            glyphs: Vec::new(),
            pages: Vec::new(),
        }
    }

    pub fn into_pages(self) -> Vec<PageLayout> {
        self.pages
    }
}

impl OutputDev for LayoutCollector {
    fn begin_page(
        &mut self,
        page_num: u32,
        _media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        let selected = self
            .wanted
            .as_ref()
            .map_or(true, |wanted| wanted.contains(&page_num));
        self.current = selected.then_some(page_num);
        self.glyphs.clear();
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        if let Some(page) = self.current.take() {
            let glyphs = std::mem::take(&mut self.glyphs);
            self.pages.push(layout_page(page, glyphs));
        }
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> Result<(), OutputError> {
        if self.current.is_none() {
            return Ok(());
        }
        // horizontal text only
        if trm.m12.abs() > SKEW_EPSILON || trm.m21.abs() > SKEW_EPSILON || trm.m11 <= 0.0 {
            return Ok(());
        }

        let scale = (trm.m11 * trm.m22).abs().sqrt();
        let size = font_size * scale;
        self.glyphs.push(Glyph {
            text: char.to_string(),
            x: trm.m31,
            y: trm.m32,
            advance: width * size,
            size,
        });
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

/// Lay out the given pages (all pages when `pages` is `None`) of a loaded document.
pub fn collect_layouts(doc: &Document, pages: Option<&[u32]>) -> Result<Vec<PageLayout>> {
    let mut collector = LayoutCollector::new(pages);
    pdf_extract::output_doc(doc, &mut collector).context("Failed to interpret page content")?;
    Ok(collector.into_pages())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Monospaced glyphs for `text` starting at `x` on baseline `y`.
    fn word(text: &str, x: f64, y: f64, size: f64) -> Vec<Glyph> {
        let advance = size * 0.6;
        text.chars()
            .enumerate()
            .map(|(i, c)| Glyph {
                text: c.to_string(),
                x: x + i as f64 * advance,
                y,
                advance,
                size,
            })
            .collect()
    }

    #[test]
    fn test_lines_ordered_top_to_bottom() {
        let mut glyphs = word("second", 72.0, 700.0, 12.0);
        glyphs.extend(word("first", 72.0, 714.0, 12.0));

        let lines = group_lines(glyphs);
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn test_gap_becomes_space() {
        let mut glyphs = word("Overview", 72.0, 700.0, 10.0);
        glyphs.extend(word("3", 140.0, 700.0, 10.0));

        let lines = group_lines(glyphs);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Overview 3");
    }

    #[test]
    fn test_slightly_shifted_baseline_stays_on_line() {
        let mut glyphs = word("x", 72.0, 700.0, 10.0);
        glyphs.extend(word("2", 78.0, 703.0, 10.0));

        let lines = group_lines(glyphs);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "x2");
    }

    #[test]
    fn test_paragraphs_become_boxes() {
        let mut glyphs = Vec::new();
        glyphs.extend(word("Table of Contents", 72.0, 720.0, 12.0));
        glyphs.extend(word("1. Intro....3", 72.0, 680.0, 12.0));
        glyphs.extend(word("2. Terms....4", 72.0, 666.0, 12.0));

        let layout = layout_page(1, glyphs);
        assert_eq!(layout.boxes.len(), 2);
        assert_eq!(layout.boxes[0].text(), "Table of Contents");
        assert_eq!(layout.boxes[1].text(), "1. Intro....3\n2. Terms....4");
    }

    #[test]
    fn test_columns_become_separate_boxes() {
        let mut glyphs = Vec::new();
        glyphs.extend(word("left one", 72.0, 700.0, 10.0));
        glyphs.extend(word("right one", 400.0, 700.0, 10.0));
        glyphs.extend(word("left two", 72.0, 688.0, 10.0));
        glyphs.extend(word("right two", 400.0, 688.0, 10.0));

        let layout = layout_page(1, glyphs);
        let texts: Vec<_> = layout.boxes.iter().map(|b| b.text()).collect();
        assert_eq!(texts, vec!["left one\nleft two", "right one\nright two"]);
    }

    #[test]
    fn test_blank_glyphs_are_dropped() {
        let glyphs = word("   ", 72.0, 700.0, 10.0);
        assert!(layout_page(1, glyphs).boxes.is_empty());
    }
}
