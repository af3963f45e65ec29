// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Separator detection by text content.

use pdfsplit_core::error::{Result, SplitError};
use tracing::{debug, warn};

use super::identifier::SplitPageIdentifier;
use crate::pdf::document::PdfDocument;
use crate::pdf::page::PdfPage;

/// Marks pages containing at least `required_count` of a set of texts.
///
/// Matching is case sensitive and by substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSplitIdentifier {
    texts: Vec<String>,
    required_count: usize,
}

impl TextSplitIdentifier {
    /// Fails when `texts` is empty, contains an empty string, or
    /// `required_count` is not in `1..=texts.len()`.
    pub fn new<I, S>(texts: I, required_count: usize) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let texts: Vec<String> = texts.into_iter().map(Into::into).collect();
        if texts.is_empty() {
            return Err(SplitError::InvalidIdentifier(
                "at least one separator text is required".into(),
            ));
        }
        if texts.iter().any(String::is_empty) {
            return Err(SplitError::InvalidIdentifier(
                "separator texts must not be empty".into(),
            ));
        }
        if required_count < 1 || required_count > texts.len() {
            return Err(SplitError::InvalidIdentifier(format!(
                "required count must be between 1 and {}, got {}",
                texts.len(),
                required_count
            )));
        }
        Ok(Self {
            texts,
            required_count,
        })
    }

    /// A single separator text.
    pub fn single(text: impl Into<String>) -> Result<Self> {
        Self::new([text.into()], 1)
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn required_count(&self) -> usize {
        self.required_count
    }

    /// Whether `text` contains enough of the separator texts.
    pub fn matches(&self, text: &str, page_index: usize) -> bool {
        let mut found = 0;
        for candidate in &self.texts {
            if text.contains(candidate.as_str()) {
                found += 1;
                if found >= self.required_count {
                    return true;
                }
            }
        }
        if found > 0 {
            debug!(
                page_index,
                found,
                of = self.texts.len(),
                required = self.required_count,
                "Partial separator text match"
            );
        }
        false
    }

    /// Native text of a page; extraction failures yield an empty string.
    pub(crate) fn native_text(document: &PdfDocument, page_index: usize) -> String {
        match document.page_text(page_index) {
            Ok(text) => text,
            Err(err) => {
                warn!(page_index, %err, "Text extraction failed");
                String::new()
            }
        }
    }
}

impl SplitPageIdentifier for TextSplitIdentifier {
    fn is_split_page(
        &mut self,
        document: &PdfDocument,
        _page: &PdfPage,
        page_index: usize,
    ) -> Result<bool> {
        let text = Self::native_text(document, page_index);
        Ok(self.matches(&text, page_index))
    }

    fn name(&self) -> &str {
        "text"
    }
}
