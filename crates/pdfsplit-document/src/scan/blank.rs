// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blank page detection.
//
// A page is split into a grid of blocks. A pixel counts as filled when it is
// darker than a threshold, a block when enough of its pixels are filled, and
// the page is not empty once enough blocks are filled. Scattered specks of
// scanner noise therefore do not make a page non-empty, a few lines of text
// do.

use std::sync::Arc;

use image::RgbImage;
use pdfsplit_core::config::BlankPageSettings;
use tracing::{debug, info, instrument, warn};

use crate::pdf::document::PdfDocument;
use crate::pdf::render::{PageRenderer, render_page};

/// Darkness of a pure black pixel: 3 * 255.
const MAX_DARKNESS: u32 = 765;

/// Decides whether pages are visually blank.
#[derive(Clone)]
pub struct BlankPageChecker {
    renderer: Arc<dyn PageRenderer>,
    settings: BlankPageSettings,
}

impl BlankPageChecker {
    pub fn new(renderer: Arc<dyn PageRenderer>) -> Self {
        Self::with_settings(renderer, BlankPageSettings::default())
    }

    pub fn with_settings(renderer: Arc<dyn PageRenderer>, settings: BlankPageSettings) -> Self {
        Self { renderer, settings }
    }

    pub fn settings(&self) -> &BlankPageSettings {
        &self.settings
    }

    /// Whether the page at `page_index` is blank. A page that cannot be
    /// rendered is reported as not empty.
    pub fn is_page_empty(&self, document: &PdfDocument, page_index: usize) -> bool {
        match render_page(
            self.renderer.as_ref(),
            document,
            page_index,
            self.settings.render_scale,
        ) {
            Ok(image) => is_image_empty(&image, &self.settings),
            Err(err) => {
                warn!(page_index, %err, "Cannot render page, treating it as not empty");
                false
            }
        }
    }

    /// 0-based indices of all blank pages.
    #[instrument(skip_all, fields(pages = document.page_count()))]
    pub fn empty_pages(&self, document: &PdfDocument) -> Vec<usize> {
        let empty: Vec<usize> = (0..document.page_count())
            .filter(|&index| self.is_page_empty(document, index))
            .collect();
        info!(empty = empty.len(), "Blank page check complete");
        empty
    }
}

impl std::fmt::Debug for BlankPageChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlankPageChecker")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Darkness of a pixel, 0 (white) to 765 (black).
fn darkness(pixel: &image::Rgb<u8>) -> u32 {
    let [r, g, b] = pixel.0;
    MAX_DARKNESS - r as u32 - g as u32 - b as u32
}

/// Apply the block heuristic to an already rendered page.
pub fn is_image_empty(image: &RgbImage, settings: &BlankPageSettings) -> bool {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return true;
    }

    let pixel_threshold = settings.pixel_threshold * MAX_DARKNESS / 100;
    let blocks_x = settings.blocks_horizontal.clamp(1, width);
    let blocks_y = settings.blocks_vertical.clamp(1, height);
    let block_width = (width / blocks_x).max(1);
    let block_height = (height / blocks_y).max(1);
    let block_pixels = (block_width * block_height) as f64;
    let block_threshold = settings.block_threshold as f64 * block_pixels / 100.0;

    let mut filled_blocks = 0u32;
    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            let x0 = bx * block_width;
            let y0 = by * block_height;
            let mut filled_pixels = 0u32;
            for y in y0..(y0 + block_height).min(height) {
                for x in x0..(x0 + block_width).min(width) {
                    if darkness(image.get_pixel(x, y)) > pixel_threshold {
                        filled_pixels += 1;
                    }
                }
            }
            if filled_pixels as f64 > block_threshold {
                filled_blocks += 1;
                if filled_blocks >= settings.page_threshold {
                    debug!(filled_blocks, "Page has content");
                    return false;
                }
            }
        }
    }
    debug!(filled_blocks, "Page is blank");
    true
}
