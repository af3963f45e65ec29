// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared fixtures for the integration tests: synthetic documents and scripted
// renderer, QR decoder and OCR engines.
//
// Pages are told apart in rendered images by their width: the page at index
// `i` renders as a `BASE_WIDTH + i` pixel wide image. The scripted decoder and
// OCR engines map the width back to the page index.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use image::{GrayImage, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use pdfsplit_core::error::{Result, SplitError};
use pdfsplit_document::pdf::document::PdfDocument;
use pdfsplit_document::pdf::render::PageRenderer;
use pdfsplit_document::scan::ocr::{OcrEngine, OcrEngineFactory, RecognizedWord, WordBox};
use pdfsplit_document::scan::qr::QrDecoder;

pub const SEPARATOR: &str = "===SPLIT===";
pub const BASE_WIDTH: u32 = 100;
pub const IMAGE_HEIGHT: u32 = 120;

// -- Documents ----------------------------------------------------------------

/// Letter sized document with one page per entry. Lines of an entry become
/// separate text lines; an empty entry becomes a page with a drawn rectangle
/// and no text layer.
pub fn document(pages: &[&str]) -> PdfDocument {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => Object::Reference(font_id) },
    });

    let mut kids = Vec::with_capacity(pages.len());
    for text in pages {
        let content = page_content(text);
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
            "Resources" => Object::Reference(resources_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Scan batch"),
        "Producer" => Object::string_literal("fixture"),
    });
    doc.trailer.set("Info", Object::Reference(info_id));
    PdfDocument::from_lopdf(doc)
}

fn page_content(text: &str) -> Content {
    if text.is_empty() {
        return Content {
            operations: vec![
                Operation::new("re", vec![72.into(), 72.into(), 200.into(), 100.into()]),
                Operation::new("f", vec![]),
            ],
        };
    }
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), Object::Integer(18)]),
        Operation::new("Td", vec![Object::Integer(72), Object::Integer(700)]),
    ];
    for (line_no, line) in text.lines().enumerate() {
        if line_no > 0 {
            operations.push(Operation::new(
                "Td",
                vec![Object::Integer(0), Object::Integer(-24)],
            ));
        }
        operations.push(Operation::new("Tj", vec![Object::string_literal(line)]));
    }
    operations.push(Operation::new("ET", vec![]));
    Content { operations }
}

/// Trimmed text of every page.
pub fn page_texts(document: &PdfDocument) -> Vec<String> {
    (0..document.page_count())
        .map(|index| {
            document
                .page_text(index)
                .expect("page text")
                .trim()
                .to_string()
        })
        .collect()
}

/// Page index a rendered fixture image belongs to.
pub fn page_of(width: u32) -> usize {
    width.saturating_sub(BASE_WIDTH) as usize
}

// -- Renderer -----------------------------------------------------------------

/// Renders white pages; inked pages are black, failing pages return an error.
#[derive(Default)]
pub struct ScriptedRenderer {
    pub inked: HashSet<usize>,
    pub failing: HashSet<usize>,
    pub calls: AtomicUsize,
    pub scales: Mutex<Vec<f32>>,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inked(mut self, pages: &[usize]) -> Self {
        self.inked.extend(pages);
        self
    }

    pub fn failing(mut self, pages: &[usize]) -> Self {
        self.failing.extend(pages);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PageRenderer for ScriptedRenderer {
    fn render(&self, document: &PdfDocument, page_index: usize, scale: f32) -> Result<RgbImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.scales.lock().unwrap().push(scale);
        if page_index >= document.page_count() {
            return Err(SplitError::Render(format!("no page {page_index}")));
        }
        if self.failing.contains(&page_index) {
            return Err(SplitError::Render(format!("page {page_index} is broken")));
        }
        let shade = if self.inked.contains(&page_index) { 0 } else { 255 };
        Ok(RgbImage::from_pixel(
            BASE_WIDTH + page_index as u32,
            IMAGE_HEIGHT,
            Rgb([shade, shade, shade]),
        ))
    }
}

// -- QR decoder ---------------------------------------------------------------

/// Returns fixed payloads per page.
#[derive(Default)]
pub struct ScriptedQrDecoder {
    pub codes: HashMap<usize, Vec<String>>,
}

impl ScriptedQrDecoder {
    pub fn with_code(mut self, page_index: usize, payload: &str) -> Self {
        self.codes
            .entry(page_index)
            .or_default()
            .push(payload.to_string());
        self
    }
}

impl QrDecoder for ScriptedQrDecoder {
    fn decode(&self, image: &GrayImage) -> Result<Vec<String>> {
        Ok(self
            .codes
            .get(&page_of(image.width()))
            .cloned()
            .unwrap_or_default())
    }
}

// -- OCR ----------------------------------------------------------------------

/// Word boxes of one recognised page, in rendered image pixels.
pub type PageWords = Vec<(String, WordBox)>;

/// Engine returning scripted words per page.
pub struct ScriptedOcrEngine {
    words: Arc<HashMap<usize, PageWords>>,
    recognized: Arc<AtomicUsize>,
    /// Waited on once, before the first page is recognised.
    rendezvous: Option<Arc<Barrier>>,
}

impl OcrEngine for ScriptedOcrEngine {
    fn recognize_words(&mut self, image: &RgbImage) -> Result<Vec<RecognizedWord>> {
        if let Some(barrier) = self.rendezvous.take() {
            barrier.wait();
        }
        self.recognized.fetch_add(1, Ordering::SeqCst);
        let page = page_of(image.width());
        Ok(self
            .words
            .get(&page)
            .map(|words| {
                words
                    .iter()
                    .map(|(text, bbox)| RecognizedWord {
                        text: text.clone(),
                        bbox: *bbox,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Factory handing out [`ScriptedOcrEngine`]s and counting them.
#[derive(Default)]
pub struct ScriptedOcrFactory {
    words: Arc<HashMap<usize, PageWords>>,
    pub created: AtomicUsize,
    pub recognized: Arc<AtomicUsize>,
    pub fail: bool,
    rendezvous: Option<Arc<Barrier>>,
}

impl ScriptedOcrFactory {
    pub fn new(words: HashMap<usize, PageWords>) -> Self {
        Self {
            words: Arc::new(words),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Hold every engine at its first page until `engines` engines have
    /// reached theirs, so each of that many workers claims a page.
    pub fn with_rendezvous(mut self, engines: usize) -> Self {
        self.rendezvous = Some(Arc::new(Barrier::new(engines)));
        self
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn recognized(&self) -> usize {
        self.recognized.load(Ordering::SeqCst)
    }
}

impl OcrEngineFactory for ScriptedOcrFactory {
    fn create(&self) -> Result<Box<dyn OcrEngine>> {
        if self.fail {
            return Err(SplitError::Ocr("models missing".into()));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedOcrEngine {
            words: Arc::clone(&self.words),
            recognized: Arc::clone(&self.recognized),
            rendezvous: self.rendezvous.clone(),
        }))
    }
}

/// A single word box covering `text` at render scale 3.
pub fn word(text: &str, x: f32, y: f32) -> (String, WordBox) {
    (
        text.to_string(),
        WordBox {
            x,
            y,
            width: 60.0 * text.len() as f32,
            height: 45.0,
        },
    )
}
