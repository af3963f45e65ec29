// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Separator detection by text content, falling back to OCR for pages without
// a text layer.

use std::sync::Arc;

use pdfsplit_core::config::check_render_scale;
use pdfsplit_core::error::{Result, SplitError};
use tracing::{debug, warn};

use super::identifier::SplitPageIdentifier;
use super::text::TextSplitIdentifier;
use crate::pdf::document::PdfDocument;
use crate::pdf::page::PdfPage;
use crate::pdf::render::{PageRenderer, render_page};
use crate::scan::ocr::{OcrEngine, OcrEngineFactory};

/// Render scale for separator OCR (288 dpi).
pub const DEFAULT_OCR_IDENTIFIER_SCALE: f32 = 4.0;

/// [`TextSplitIdentifier`] that also reads text from the page image.
///
/// Pages with native text are matched on that text alone unless OCR is
/// forced. Otherwise the page is rendered and recognised, and the native text
/// and the OCR text are matched together. If OCR fails the native text is
/// used.
pub struct OcrTextSplitIdentifier {
    text: TextSplitIdentifier,
    force_ocr: bool,
    scale: f32,
    renderer: Arc<dyn PageRenderer>,
    factory: Option<Arc<dyn OcrEngineFactory>>,
    /// Created from `factory` on first use, then reused.
    engine: Option<Box<dyn OcrEngine>>,
}

impl OcrTextSplitIdentifier {
    pub fn new<I, S>(
        texts: I,
        required_count: usize,
        force_ocr: bool,
        renderer: Arc<dyn PageRenderer>,
        factory: Arc<dyn OcrEngineFactory>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            text: TextSplitIdentifier::new(texts, required_count)?,
            force_ocr,
            scale: DEFAULT_OCR_IDENTIFIER_SCALE,
            renderer,
            factory: Some(factory),
            engine: None,
        })
    }

    /// Use an already created engine instead of a factory.
    pub fn with_engine<I, S>(
        texts: I,
        required_count: usize,
        force_ocr: bool,
        renderer: Arc<dyn PageRenderer>,
        engine: Box<dyn OcrEngine>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            text: TextSplitIdentifier::new(texts, required_count)?,
            force_ocr,
            scale: DEFAULT_OCR_IDENTIFIER_SCALE,
            renderer,
            factory: None,
            engine: Some(engine),
        })
    }

    pub fn with_scale(mut self, scale: f32) -> Result<Self> {
        self.set_scale(scale)?;
        Ok(self)
    }

    /// Render scale for recognition. Out of range values are rejected and
    /// leave the current scale in place.
    pub fn set_scale(&mut self, scale: f32) -> Result<()> {
        check_render_scale("OCR identifier scale", scale)?;
        self.scale = scale;
        Ok(())
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn is_force_ocr(&self) -> bool {
        self.force_ocr
    }

    /// Replace the OCR engine.
    pub fn set_engine(&mut self, engine: Box<dyn OcrEngine>) {
        self.engine = Some(engine);
    }

    pub fn text_identifier(&self) -> &TextSplitIdentifier {
        &self.text
    }

    /// Native text, extended by OCR text where needed.
    fn page_text(&mut self, document: &PdfDocument, page_index: usize) -> String {
        let native = TextSplitIdentifier::native_text(document, page_index);
        let has_native = !native.trim().is_empty();
        if has_native && !self.force_ocr {
            return native;
        }

        match self.ocr_text(document, page_index) {
            Ok(ocr) => {
                debug!(page_index, chars = ocr.len(), "Page text recognised");
                if has_native {
                    format!("{}\n{}", native, ocr)
                } else {
                    ocr
                }
            }
            Err(err) => {
                warn!(page_index, %err, "OCR failed, using native text only");
                native
            }
        }
    }

    fn ocr_text(&mut self, document: &PdfDocument, page_index: usize) -> Result<String> {
        if self.engine.is_none() {
            let factory = self
                .factory
                .as_ref()
                .ok_or_else(|| SplitError::Ocr("no OCR engine configured".into()))?;
            self.engine = Some(factory.create()?);
        }
        let engine = self
            .engine
            .as_mut()
            .ok_or_else(|| SplitError::Ocr("no OCR engine configured".into()))?;

        let image = render_page(self.renderer.as_ref(), document, page_index, self.scale)?;
        engine.recognize_text(&image)
    }
}

impl SplitPageIdentifier for OcrTextSplitIdentifier {
    fn is_split_page(
        &mut self,
        document: &PdfDocument,
        _page: &PdfPage,
        page_index: usize,
    ) -> Result<bool> {
        let text = self.page_text(document, page_index);
        Ok(self.text.matches(&text, page_index))
    }

    fn name(&self) -> &str {
        "ocr-text"
    }
}

impl std::fmt::Debug for OcrTextSplitIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrTextSplitIdentifier")
            .field("text", &self.text)
            .field("force_ocr", &self.force_ocr)
            .field("scale", &self.scale)
            .field("engine_ready", &self.engine.is_some())
            .finish_non_exhaustive()
    }
}
