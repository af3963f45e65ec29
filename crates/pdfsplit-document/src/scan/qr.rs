// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// QR code extraction from rendered pages.

use std::sync::Arc;

use image::{GrayImage, Luma};
use pdfsplit_core::config::check_render_scale;
use pdfsplit_core::error::{Result, SplitError};
use tracing::{debug, warn};

use crate::pdf::document::PdfDocument;
use crate::pdf::render::{PageRenderer, render_page};

/// Scale QR codes are looked for at (72 dpi).
pub const DEFAULT_QR_SCALE: f32 = 1.0;

/// Finds and decodes QR symbols in a greyscale image.
pub trait QrDecoder: Send + Sync {
    /// Payloads of all symbols that could be decoded. An image without
    /// symbols yields an empty list.
    fn decode(&self, image: &GrayImage) -> Result<Vec<String>>;
}

/// [`QrDecoder`] backed by the pure-Rust `rqrr` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct RqrrDecoder;

impl QrDecoder for RqrrDecoder {
    fn decode(&self, image: &GrayImage) -> Result<Vec<String>> {
        let (width, height) = image.dimensions();
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                image.get_pixel(x as u32, y as u32).0[0]
            });

        collect_payloads(
            prepared
                .detect_grids()
                .into_iter()
                .map(|grid| grid.decode().map(|(_meta, content)| content)),
        )
    }
}

/// Payloads of the symbols that decoded. Symbols that fail are skipped,
/// unless every symbol found failed.
fn collect_payloads<E: std::fmt::Debug>(
    decoded: impl IntoIterator<Item = std::result::Result<String, E>>,
) -> Result<Vec<String>> {
    let mut payloads = Vec::new();
    let mut failed = 0usize;
    let mut last_error = None;
    for result in decoded {
        match result {
            Ok(content) => payloads.push(content),
            Err(err) => {
                warn!(error = ?err, "QR symbol found but could not be decoded");
                failed += 1;
                last_error = Some(err);
            }
        }
    }
    match last_error {
        Some(err) if payloads.is_empty() => Err(SplitError::Qr(format!(
            "none of {} symbols could be decoded, last error: {:?}",
            failed, err
        ))),
        _ => Ok(payloads),
    }
}

/// Binarise with a global Otsu threshold: pixels above the level become
/// white, the rest black.
pub fn binarize(image: &GrayImage) -> GrayImage {
    let level = imageproc::contrast::otsu_level(image);
    let (width, height) = image.dimensions();
    let mut output = GrayImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels() {
        let value = if pixel.0[0] > level { 255 } else { 0 };
        output.put_pixel(x, y, Luma([value]));
    }
    output
}

/// Renders pages and returns the payloads of the QR codes on them.
#[derive(Clone)]
pub struct QrCodeExtractor {
    renderer: Arc<dyn PageRenderer>,
    decoder: Arc<dyn QrDecoder>,
    scale: f32,
}

impl QrCodeExtractor {
    /// Extractor using [`RqrrDecoder`] at [`DEFAULT_QR_SCALE`].
    pub fn new(renderer: Arc<dyn PageRenderer>) -> Self {
        Self::with_decoder(renderer, Arc::new(RqrrDecoder))
    }

    pub fn with_decoder(renderer: Arc<dyn PageRenderer>, decoder: Arc<dyn QrDecoder>) -> Self {
        Self {
            renderer,
            decoder,
            scale: DEFAULT_QR_SCALE,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Result<Self> {
        check_render_scale("QR scale", scale)?;
        self.scale = scale;
        Ok(self)
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Payloads of all QR codes on the page at `page_index` (0-based).
    pub fn extract(&self, document: &PdfDocument, page_index: usize) -> Result<Vec<String>> {
        let rendered = render_page(self.renderer.as_ref(), document, page_index, self.scale)?;
        let gray = image::imageops::grayscale(&rendered);
        let payloads = self.decoder.decode(&binarize(&gray))?;
        debug!(page_index, codes = payloads.len(), "QR codes extracted");
        Ok(payloads)
    }
}

impl std::fmt::Debug for QrCodeExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QrCodeExtractor")
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}
