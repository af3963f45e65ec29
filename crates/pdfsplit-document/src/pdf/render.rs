// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasterisation.
//
// Everything that looks at pixels (QR detection, OCR, blank page detection)
// goes through the `PageRenderer` trait. The PDFium backend is only available
// with the `pdfium` feature:
//
// ```toml
// pdfsplit-document = { path = "crates/pdfsplit-document", features = ["pdfium"] }
// ```

use image::RgbImage;
use pdfsplit_core::error::{Result, SplitError};

use super::document::PdfDocument;

/// Renders single pages of a document to RGB images.
///
/// `scale` is relative to 72 dpi, so 1.0 renders one pixel per point.
pub trait PageRenderer: Send + Sync {
    fn render(&self, document: &PdfDocument, page_index: usize, scale: f32) -> Result<RgbImage>;
}

/// Render a page while holding the document's render lock. Renderings
/// without pixels are rejected.
pub fn render_page(
    renderer: &dyn PageRenderer,
    document: &PdfDocument,
    page_index: usize,
    scale: f32,
) -> Result<RgbImage> {
    let image = {
        let _guard = document.render_lock();
        renderer.render(document, page_index, scale)?
    };
    if image.width() == 0 || image.height() == 0 {
        return Err(SplitError::Image(format!(
            "page {} rendered to an empty {}x{} image",
            page_index,
            image.width(),
            image.height()
        )));
    }
    Ok(image)
}


#[cfg(feature = "pdfium")]
pub use self::pdfium::PdfiumRenderer;

#[cfg(feature = "pdfium")]
mod pdfium {
    use std::path::{Path, PathBuf};
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::sync::{Arc, Mutex, PoisonError};
    use std::thread::JoinHandle;

    use image::RgbImage;
    use pdfium_render::prelude::{PdfRenderConfig, Pdfium};
    use pdfsplit_core::error::{Result, SplitError};
    use tracing::{debug, info, warn};
    use uuid::Uuid;

    use super::PageRenderer;
    use crate::pdf::document::PdfDocument;

    struct RenderRequest {
        bytes: Arc<Vec<u8>>,
        page_index: usize,
        scale: f32,
        reply: Sender<Result<RgbImage>>,
    }

    /// Serialised bytes of the last rendered document revision.
    struct Snapshot {
        document: Uuid,
        revision: u64,
        bytes: Arc<Vec<u8>>,
    }

    /// Renders pages with PDFium.
    ///
    /// The PDFium bindings live on a dedicated thread; callers on any thread
    /// send requests to it. Documents are handed over as serialised bytes,
    /// cached per document revision.
    pub struct PdfiumRenderer {
        requests: Option<Sender<RenderRequest>>,
        worker: Option<JoinHandle<()>>,
        snapshot: Mutex<Option<Snapshot>>,
    }

    impl PdfiumRenderer {
        /// Bind to PDFium, searching the usual library locations.
        pub fn new() -> Result<Self> {
            Self::start(None)
        }

        /// Bind to the PDFium library in `dir`.
        pub fn with_library_dir(dir: impl Into<PathBuf>) -> Result<Self> {
            Self::start(Some(dir.into()))
        }

        fn start(library_dir: Option<PathBuf>) -> Result<Self> {
            let (requests, inbox) = mpsc::channel::<RenderRequest>();
            let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

            let worker = std::thread::Builder::new()
                .name("pdfium-render".to_string())
                .spawn(move || {
                    let pdfium = match bind(library_dir.as_deref()) {
                        Ok(pdfium) => {
                            let _ = ready_tx.send(Ok(()));
                            pdfium
                        }
                        Err(err) => {
                            let _ = ready_tx.send(Err(err));
                            return;
                        }
                    };
                    serve(&pdfium, inbox);
                })?;

            ready_rx
                .recv()
                .map_err(|_| SplitError::Render("render thread exited during start-up".into()))??;
            info!("PDFium renderer ready");

            Ok(Self {
                requests: Some(requests),
                worker: Some(worker),
                snapshot: Mutex::new(None),
            })
        }

        fn document_bytes(&self, document: &PdfDocument) -> Result<Arc<Vec<u8>>> {
            let mut cached = self
                .snapshot
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(snapshot) = cached.as_ref() {
                if snapshot.document == document.id() && snapshot.revision == document.revision() {
                    return Ok(Arc::clone(&snapshot.bytes));
                }
            }
            let bytes = Arc::new(document.snapshot_bytes()?);
            debug!(bytes = bytes.len(), revision = document.revision(), "Document snapshot taken");
            *cached = Some(Snapshot {
                document: document.id(),
                revision: document.revision(),
                bytes: Arc::clone(&bytes),
            });
            Ok(bytes)
        }
    }

    impl PageRenderer for PdfiumRenderer {
        fn render(&self, document: &PdfDocument, page_index: usize, scale: f32) -> Result<RgbImage> {
            let bytes = self.document_bytes(document)?;
            let requests = self
                .requests
                .as_ref()
                .ok_or_else(|| SplitError::Render("renderer has been shut down".into()))?;

            let (reply, response) = mpsc::channel();
            requests
                .send(RenderRequest {
                    bytes,
                    page_index,
                    scale,
                    reply,
                })
                .map_err(|_| SplitError::Render("render thread is not running".into()))?;
            response
                .recv()
                .map_err(|_| SplitError::Render("render thread dropped the request".into()))?
        }
    }

    impl Drop for PdfiumRenderer {
        fn drop(&mut self) {
            // Closing the channel ends the worker loop.
            self.requests.take();
            if let Some(worker) = self.worker.take() {
                if worker.join().is_err() {
                    warn!("PDFium render thread panicked");
                }
            }
        }
    }

    fn bind(library_dir: Option<&Path>) -> Result<Pdfium> {
        let bindings = match library_dir {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| {
                    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("/usr/lib"))
                })
                .or_else(|_| {
                    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                        "/usr/local/lib",
                    ))
                })
                .or_else(|_| {
                    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                        "/opt/homebrew/lib",
                    ))
                })
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|err| SplitError::Render(format!("could not find PDFium library: {}", err)))?;
        Ok(Pdfium::new(bindings))
    }

    fn serve(pdfium: &Pdfium, inbox: Receiver<RenderRequest>) {
        for request in inbox {
            let result = render_with(pdfium, &request.bytes, request.page_index, request.scale);
            let _ = request.reply.send(result);
        }
        debug!("PDFium render thread stopped");
    }

    fn render_with(pdfium: &Pdfium, bytes: &[u8], page_index: usize, scale: f32) -> Result<RgbImage> {
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|err| SplitError::Render(format!("PDFium could not load document: {}", err)))?;

        let index = u16::try_from(page_index)
            .map_err(|_| SplitError::Render(format!("page index {} too large", page_index)))?;
        let page = document
            .pages()
            .get(index)
            .map_err(|err| SplitError::Render(format!("page {}: {}", page_index, err)))?;

        // Points are 1/72 inch; scale 1.0 renders at 72 dpi.
        let width_px = ((page.width().value * scale).round() as i32).max(1);
        let height_px = ((page.height().value * scale).round() as i32).max(1);

        let render_config = PdfRenderConfig::new()
            .set_target_width(width_px)
            .set_target_height(height_px)
            .render_form_data(true)
            .render_annotations(true);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|err| SplitError::Render(format!("page {}: {}", page_index, err)))?;

        debug!(page_index, width_px, height_px, "Page rendered");
        Ok(bitmap.as_image().to_rgb8())
    }
}
