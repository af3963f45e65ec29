// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan analysis: OCR engines, QR code extraction and blank page detection on
// rendered pages.

pub mod blank;
pub mod ocr;
pub mod qr;

pub use blank::BlankPageChecker;
pub use ocr::{OcrEngine, OcrEngineFactory, RecognizedWord, WordBox};
pub use qr::{QrCodeExtractor, QrDecoder, RqrrDecoder};
