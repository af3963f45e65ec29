// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filter module: whole-document transformations run before splitting.

pub mod events;
pub mod ocr;
pub mod queue;

pub use events::{DocumentFilterEvent, DocumentFilterListener, FilterListeners};
pub use ocr::OcrFilter;
pub use queue::WorkQueue;

use pdfsplit_core::error::Result;
use pdfsplit_core::types::ListenerId;

use crate::pdf::document::PdfDocument;

/// Transforms a whole document, reporting progress to listeners.
pub trait DocumentFilter {
    /// Filter `document` and return the result. Pages the filter cannot
    /// process are passed through unchanged.
    fn filter(&self, document: PdfDocument) -> Result<PdfDocument>;

    fn add_listener(&mut self, listener: Box<dyn DocumentFilterListener>) -> ListenerId;

    fn remove_listener(&mut self, id: ListenerId) -> bool;
}
