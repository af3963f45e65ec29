// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Invisible OCR text layer.
//
// Pages without a text layer (typically scans) are rendered and recognised by
// a pool of worker threads, each with its own OCR engine. Once all workers are
// done the recognised words are written onto the pages as invisible text, so
// the document becomes searchable and text based separator detection works
// on it, without any visual change.

use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};
use pdfsplit_core::config::check_render_scale;
use pdfsplit_core::error::{Result, SplitError};
use pdfsplit_core::types::{AbortHandle, FilterEventKind, ListenerId};
use tracing::{debug, error, info, instrument, warn};

use super::events::{DocumentFilterEvent, DocumentFilterListener, FilterListeners};
use super::queue::WorkQueue;
use super::DocumentFilter;
use crate::pdf::document::{OVERLAY_FONT_NAME, PdfDocument};
use crate::pdf::font;
use crate::pdf::page::PdfPage;
use crate::pdf::render::{PageRenderer, render_page};
use crate::scan::ocr::{OcrEngine, OcrEngineFactory, RecognizedWord};

/// Default number of OCR worker threads.
pub const DEFAULT_THREAD_COUNT: usize = 4;

/// Default render scale for OCR (216 dpi).
pub const DEFAULT_OCR_SCALE: f32 = 3.0;

/// Text rendering mode 3: neither fill nor stroke.
const INVISIBLE_TEXT: i64 = 3;

/// Adds an invisible text layer to pages that have none.
pub struct OcrFilter {
    factory: Arc<dyn OcrEngineFactory>,
    renderer: Arc<dyn PageRenderer>,
    thread_count: usize,
    scale: f32,
    force: bool,
    listeners: FilterListeners,
    abort: Option<AbortHandle>,
}

impl OcrFilter {
    pub fn new(factory: Arc<dyn OcrEngineFactory>, renderer: Arc<dyn PageRenderer>) -> Self {
        Self {
            factory,
            renderer,
            thread_count: DEFAULT_THREAD_COUNT,
            scale: DEFAULT_OCR_SCALE,
            force: false,
            listeners: FilterListeners::default(),
            abort: None,
        }
    }

    /// Maximum number of worker threads. Values below 1 run on the calling
    /// thread.
    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    /// Render scale for recognition. Scales outside the accepted render
    /// range are rejected.
    pub fn with_scale(mut self, scale: f32) -> Result<Self> {
        check_render_scale("OCR filter scale", scale)?;
        self.scale = scale;
        Ok(self)
    }

    /// Recognise every page, including pages that already have text.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Stop claiming further pages once `abort` is set. Pages recognised so
    /// far still get their text layer.
    pub fn with_abort(mut self, abort: AbortHandle) -> Self {
        self.abort = Some(abort);
        self
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn is_force(&self) -> bool {
        self.force
    }

    fn notify(&self, kind: FilterEventKind, page_count: usize, page_index: Option<usize>) {
        self.listeners.notify(&DocumentFilterEvent {
            kind,
            page_count,
            page_index,
        });
    }

    /// Recognise words on all pages that need it. The result is aligned with
    /// `pages`; `None` marks pages left untouched.
    fn recognize_pages(
        &self,
        document: &PdfDocument,
        pages: &[PdfPage],
    ) -> Vec<Option<Vec<RecognizedWord>>> {
        let mut queue = WorkQueue::new(pages);
        if let Some(abort) = &self.abort {
            queue = queue.with_abort(abort.clone());
        }
        let queue = &queue;
        let threads = self.thread_count.min(pages.len());

        let recognized: Vec<(usize, Vec<RecognizedWord>)> = if threads <= 1 {
            debug!("Recognising pages on the calling thread");
            self.run_worker(document, queue)
        } else {
            debug!(threads, "Starting OCR workers");
            std::thread::scope(|scope| {
                let handles: Vec<_> = (0..threads)
                    .filter_map(|worker| {
                        std::thread::Builder::new()
                            .name(format!("ocr-filter-{}", worker))
                            .spawn_scoped(scope, move || self.run_worker(document, queue))
                            .map_err(|err| warn!(worker, %err, "Cannot start OCR worker"))
                            .ok()
                    })
                    .collect();

                let mut recognized = Vec::new();
                if handles.is_empty() {
                    recognized.extend(self.run_worker(document, queue));
                }
                for handle in handles {
                    match handle.join() {
                        Ok(results) => recognized.extend(results),
                        Err(_) => error!("OCR worker panicked; its pages stay untouched"),
                    }
                }
                recognized
            })
        };

        let mut aligned: Vec<Option<Vec<RecognizedWord>>> = vec![None; pages.len()];
        for (slot, words) in recognized {
            aligned[slot] = Some(words);
        }
        aligned
    }

    /// Claim pages until the queue is empty. The engine is created for the
    /// first page that needs recognition and lives until this call returns;
    /// a failed creation is not retried.
    fn run_worker(
        &self,
        document: &PdfDocument,
        queue: &WorkQueue<'_, PdfPage>,
    ) -> Vec<(usize, Vec<RecognizedWord>)> {
        let page_count = queue.len();
        let mut engine: Option<Box<dyn OcrEngine>> = None;
        let mut engine_failed = false;

        let mut results = Vec::new();
        while let Some((slot, page)) = queue.next_item() {
            self.notify(FilterEventKind::NextPage, page_count, Some(page.index));

            if !self.force && document.page_has_text(page.index) {
                debug!(page_index = page.index, "Page has text, skipping OCR");
                self.notify(FilterEventKind::PageIgnored, page_count, Some(page.index));
                continue;
            }

            if engine.is_none() && !engine_failed {
                match self.factory.create() {
                    Ok(created) => engine = Some(created),
                    Err(err) => {
                        warn!(%err, "Cannot create OCR engine; pages claimed by this worker stay untouched");
                        engine_failed = true;
                    }
                }
            }
            match engine.as_deref_mut() {
                Some(engine) => match self.recognize_page(engine, document, page.index) {
                    Ok(words) => {
                        debug!(page_index = page.index, words = words.len(), "Page recognised");
                        results.push((slot, words));
                    }
                    Err(err) => warn!(page_index = page.index, %err, "OCR failed for page"),
                },
                None => warn!(page_index = page.index, "No OCR engine, page left untouched"),
            }
            self.notify(FilterEventKind::PageDone, page_count, Some(page.index));
        }
        results
    }

    fn recognize_page(
        &self,
        engine: &mut dyn OcrEngine,
        document: &PdfDocument,
        page_index: usize,
    ) -> Result<Vec<RecognizedWord>> {
        let image = render_page(self.renderer.as_ref(), document, page_index, self.scale)?;
        engine.recognize_words(&image)
    }

    /// Write recognised words onto a page. Returns the number of words
    /// written.
    fn apply_words(
        &self,
        document: &mut PdfDocument,
        page: &PdfPage,
        words: &[RecognizedWord],
    ) -> Result<usize> {
        let operations = text_layer_operations(page, words, self.scale);
        let written = operations.len() / OPERATIONS_PER_WORD;
        if written == 0 {
            return Ok(0);
        }

        let content = Content { operations }
            .encode()
            .map_err(|err| SplitError::Pdf(format!("cannot encode text layer: {}", err)))?;
        let font_id = document.ensure_overlay_font();
        document.add_page_font(page, OVERLAY_FONT_NAME, font_id)?;
        document.append_page_content(page, content)?;
        Ok(written)
    }
}

impl DocumentFilter for OcrFilter {
    #[instrument(skip_all, fields(pages = document.page_count(), threads = self.thread_count))]
    fn filter(&self, mut document: PdfDocument) -> Result<PdfDocument> {
        let page_count = document.page_count();
        self.notify(FilterEventKind::NewDocument, page_count, None);

        let pages = document.pages();
        let recognized = self.recognize_pages(&document, &pages);

        let mut pages_changed = 0;
        for (page, words) in pages.iter().zip(recognized) {
            let Some(words) = words else { continue };
            match self.apply_words(&mut document, page, &words) {
                Ok(0) => {}
                Ok(written) => {
                    debug!(page_index = page.index, written, "Text layer added");
                    pages_changed += 1;
                }
                Err(err) => warn!(page_index = page.index, %err, "Cannot add text layer to page"),
            }
        }

        self.notify(FilterEventKind::DocumentDone, page_count, None);
        info!(pages_changed, "OCR text layer complete");
        Ok(document)
    }

    fn add_listener(&mut self, listener: Box<dyn DocumentFilterListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

impl std::fmt::Debug for OcrFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrFilter")
            .field("thread_count", &self.thread_count)
            .field("scale", &self.scale)
            .field("force", &self.force)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

/// BT, Tf, Tr, Td, Tj, ET.
const OPERATIONS_PER_WORD: usize = 6;

/// Content stream operations placing each word as invisible text over the
/// area it was recognised in. `scale` is the render scale the word boxes are
/// measured at.
pub fn text_layer_operations(page: &PdfPage, words: &[RecognizedWord], scale: f32) -> Vec<Operation> {
    let mut operations = Vec::with_capacity(words.len() * OPERATIONS_PER_WORD);
    for word in words {
        let text = font::clean_for_encoding(&word.text);
        if text.trim().is_empty() {
            continue;
        }

        let x = word.bbox.x / scale;
        let y = word.bbox.y / scale;
        let width = word.bbox.width / scale;
        let height = word.bbox.height / scale;
        let size = font::fit_font_size(&text, width, height);

        // Renderings show the crop box. Image rows grow downwards, PDF user
        // space upwards.
        let left = page.crop_box.llx + x;
        let baseline = page.crop_box.ury - (y + height);

        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(OVERLAY_FONT_NAME.as_bytes().to_vec()), size.into()],
            ),
            Operation::new("Tr", vec![Object::Integer(INVISIBLE_TEXT)]),
            Operation::new("Td", vec![left.into(), baseline.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(font::encode(&text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }
    operations
}
