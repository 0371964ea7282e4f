use std::ops::Range;

use crate::error::ExtractError;

/// Separator between pages in plain-text dumps of a report.
pub const PAGE_BREAK: char = '\u{0C}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    /// Zero-based page the line came from.
    pub page: usize,
}

/// The normalized text of one document: trimmed, non-empty lines in reading
/// order, with each page's index range retained (empty pages keep an empty range).
#[derive(Debug, Clone)]
pub struct LineStream {
    lines: Vec<Line>,
    pages: Vec<Range<usize>>,
}

impl LineStream {
    pub fn build<S: AsRef<str>>(source_ref: &str, pages: &[S]) -> Result<Self, ExtractError> {
        let mut lines = Vec::new();
        let mut ranges = Vec::with_capacity(pages.len());

        for (page, raw) in pages.iter().enumerate() {
            let start = lines.len();
            lines.extend(
                raw.as_ref()
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(|l| Line {
                        text: l.to_string(),
                        page,
                    }),
            );
            ranges.push(start..lines.len());
        }

        if lines.is_empty() {
            return Err(ExtractError::EmptyDocument {
                source_ref: source_ref.to_string(),
            });
        }

        Ok(Self {
            lines,
            pages: ranges,
        })
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_range(&self, page: usize) -> Range<usize> {
        self.pages.get(page).cloned().unwrap_or(0..0)
    }

    pub fn page_lines(&self, page: usize) -> &[Line] {
        &self.lines[self.page_range(page)]
    }

    pub fn page_of(&self, idx: usize) -> Option<usize> {
        self.lines.get(idx).map(|l| l.page)
    }

    /// Exclusive end index of the page holding `idx`; end-of-stream when out of range.
    pub fn page_end(&self, idx: usize) -> usize {
        self.page_of(idx)
            .map(|p| self.page_range(p).end)
            .unwrap_or(self.lines.len())
    }
}

/// Split a text dump into page texts on form feeds.
pub fn split_pages(blob: &str) -> Vec<&str> {
    blob.split(PAGE_BREAK).collect()
}
