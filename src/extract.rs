//! Page text extraction.
//!
//! [`resolve_page_range`] turns the user-facing page numbers into a 0-based
//! index range once the page count is known, and [`collect_text`] joins the
//! text of those pages. [`LopdfExtractor`] is the production [`TextExtractor`]
//! backed by `lopdf`.

use std::{
    ops::Range,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use lopdf::Document;

use crate::{convert::CancelToken, error::ConvertError, form::ConversionRequest};

/// A document whose pages can be read by 0-based index.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Text of the page at `index`, `None` when the page carries no text.
    fn page_text(&self, index: usize) -> Result<Option<String>, ConvertError>;
}

/// Produces the text that will be spoken for a validated request.
pub trait TextExtractor {
    fn extract(
        &self,
        request: &ConversionRequest,
        cancel: &CancelToken,
    ) -> Result<ExtractedText, ConvertError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub pages: usize,
}

/// Maps 1-based `start`/`end` to the 0-based range `[start - 1, end)`.
///
/// Both numbers must lie within `1..=total` and `start` may not exceed `end`.
pub fn resolve_page_range(start: i64, end: i64, total: usize) -> Result<Range<usize>, ConvertError> {
    let invalid = || ConvertError::InvalidPageRange { start, end, total };
    let total_pages = i64::try_from(total).map_err(|_| invalid())?;
    if start < 1 || end < 1 || start > total_pages || end > total_pages || start > end {
        return Err(invalid());
    }
    let first = usize::try_from(start - 1).map_err(|_| invalid())?;
    let last = usize::try_from(end).map_err(|_| invalid())?;
    Ok(first..last)
}

pub fn collect_text<S: PageSource + ?Sized>(
    source: &S,
    range: Range<usize>,
    cancel: &CancelToken,
) -> Result<String, ConvertError> {
    let mut text = String::new();
    for index in range {
        cancel.check()?;
        match source.page_text(index)? {
            Some(page) => text.push_str(&page),
            None => debug!("page {} has no extractable text", index + 1),
        }
    }
    Ok(text)
}

/// A PDF loaded through `lopdf`, indexed by position in the page tree.
pub struct PdfDocument {
    path: PathBuf,
    document: Document,
    page_numbers: Vec<u32>,
}

impl PdfDocument {
    pub fn open(path: &Path) -> Result<Self, ConvertError> {
        let document = Document::load(path).map_err(|err| ConvertError::Extraction {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let page_numbers = document.get_pages().into_keys().collect();
        Ok(Self {
            path: path.to_path_buf(),
            document,
            page_numbers,
        })
    }
}

impl PageSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn page_text(&self, index: usize) -> Result<Option<String>, ConvertError> {
        let Some(&number) = self.page_numbers.get(index) else {
            return Ok(None);
        };
        let text = self
            .document
            .extract_text(&[number])
            .map_err(|err| ConvertError::Extraction {
                path: self.path.clone(),
                reason: format!("page {number}: {err}"),
            })?;
        // lopdf ends every text object with a newline; page text is joined verbatim.
        let text = text.trim_end_matches('\n');
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl TextExtractor for LopdfExtractor {
    fn extract(
        &self,
        request: &ConversionRequest,
        cancel: &CancelToken,
    ) -> Result<ExtractedText, ConvertError> {
        let document = PdfDocument::open(&request.pdf_path)?;
        let total = document.page_count();
        let range = resolve_page_range(request.start_page, request.end_page, total)?;
        let pages = range.len();
        info!(
            "Extracting pages {}-{} of {} from {}",
            request.start_page,
            request.end_page,
            total,
            request.pdf_path.display()
        );
        let text = collect_text(&document, range, cancel)?;
        if text.is_empty() {
            warn!(
                "No text found in pages {}-{} of {}",
                request.start_page,
                request.end_page,
                request.pdf_path.display()
            );
        }
        Ok(ExtractedText { text, pages })
    }
}
