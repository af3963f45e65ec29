// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Separator page detection strategy.

use pdfsplit_core::error::Result;

use crate::pdf::document::PdfDocument;
use crate::pdf::page::PdfPage;

/// Decides whether a page is a separator page.
///
/// Implementations may build and cache helpers (decoders, OCR engines) on
/// first use, hence `&mut self`. The inspected document is never modified.
pub trait SplitPageIdentifier: Send {
    /// `page_index` is the 0-based position of `page` in `document`.
    ///
    /// An `Err` is not fatal: the splitter logs it and treats the page as
    /// content.
    fn is_split_page(
        &mut self,
        document: &PdfDocument,
        page: &PdfPage,
        page_index: usize,
    ) -> Result<bool>;

    /// Short name used in log output.
    fn name(&self) -> &str;
}
