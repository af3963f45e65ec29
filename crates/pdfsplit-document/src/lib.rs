// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdfsplit-document: document processing for PDFSplit.
//
// Provides the PDF document model (page import, text extraction, content
// overlays), separator page identifiers and the splitter, scan analysis (QR
// codes, OCR engines, blank pages) and the OCR text layer filter.

pub mod filter;
pub mod pdf;
pub mod scan;
pub mod split;

// Re-export the primary structs so callers can use `pdfsplit_document::SmartSplitter` etc.
pub use filter::{DocumentFilter, OcrFilter};
pub use pdf::document::PdfDocument;
pub use pdf::page::PdfPage;
pub use pdf::render::PageRenderer;
pub use scan::blank::BlankPageChecker;
pub use scan::ocr::{OcrEngine, OcrEngineFactory};
pub use scan::qr::QrCodeExtractor;
pub use split::{
    OcrTextSplitIdentifier, OutputTarget, QrCodeIdentifier, SmartSplitter, SplitPageIdentifier,
    TextSplitIdentifier,
};

#[cfg(feature = "pdfium")]
pub use pdf::render::PdfiumRenderer;

#[cfg(feature = "ocr")]
pub use scan::ocr::{OcrsEngine, OcrsEngineFactory};
