// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rendering and OCR backends selected at build time.

use std::sync::Arc;

use pdfsplit_core::config::OcrSettings;
use pdfsplit_core::error::Result;
use pdfsplit_document::pdf::render::PageRenderer;
use pdfsplit_document::scan::ocr::OcrEngineFactory;

/// Page renderer for QR, OCR and blank page detection.
#[cfg(feature = "pdfium")]
pub fn renderer() -> Result<Arc<dyn PageRenderer>> {
    let renderer = pdfsplit_document::pdf::render::PdfiumRenderer::new()?;
    Ok(Arc::new(renderer))
}

#[cfg(not(feature = "pdfium"))]
pub fn renderer() -> Result<Arc<dyn PageRenderer>> {
    Err(pdfsplit_core::error::SplitError::Render(
        "page rendering needs a build with the `pdfium` feature".into(),
    ))
}

/// OCR engine factory. Fails early when the model files are missing.
#[cfg(feature = "ocr")]
pub fn ocr_factory(settings: &OcrSettings) -> Result<Arc<dyn OcrEngineFactory>> {
    let factory = pdfsplit_document::scan::ocr::OcrsEngineFactory::new(settings);
    factory.paths().validate()?;
    Ok(Arc::new(factory))
}

#[cfg(not(feature = "ocr"))]
pub fn ocr_factory(_settings: &OcrSettings) -> Result<Arc<dyn OcrEngineFactory>> {
    Err(pdfsplit_core::error::SplitError::Ocr(
        "OCR needs a build with the `ocr` feature".into(),
    ))
}
