// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Splitting a document on separator pages.

use std::path::{Path, PathBuf};

use pdfsplit_core::error::{Result, SplitError};
use pdfsplit_core::types::{AbortHandle, ListenerId, SplitEventKind};
use tracing::{debug, info, instrument, warn};

use super::events::{SplitListeners, SplitStatusEvent, SplitStatusListener};
use super::identifier::SplitPageIdentifier;
use super::output::OutputTarget;
use crate::pdf::document::PdfDocument;
use crate::pdf::page::PdfPage;

/// One output document of a split run.
#[derive(Debug)]
pub struct SplitDocument {
    pub document: PdfDocument,
    /// File the document was written to, if an [`OutputTarget`] was set.
    pub path: Option<PathBuf>,
}

/// Splits a document into several documents at separator pages.
///
/// Pages are classified by the registered [`SplitPageIdentifier`]s in
/// registration order; the first identifier reporting a separator wins.
/// Separator pages end the current output document and are themselves
/// dropped. Content pages are appended to the current output document,
/// opening a new one if needed.
pub struct SmartSplitter {
    identifiers: Vec<Box<dyn SplitPageIdentifier>>,
    listeners: SplitListeners,
    start_page: usize,
    end_page: usize,
    output: Option<OutputTarget>,
    abort: AbortHandle,
    documents_finished: usize,
}

impl Default for SmartSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl SmartSplitter {
    pub fn new() -> Self {
        Self {
            identifiers: Vec::new(),
            listeners: SplitListeners::default(),
            start_page: 0,
            end_page: usize::MAX,
            output: None,
            abort: AbortHandle::new(),
            documents_finished: 0,
        }
    }

    // -- Identifiers ----------------------------------------------------------

    pub fn add_identifier(&mut self, identifier: Box<dyn SplitPageIdentifier>) {
        self.identifiers.push(identifier);
    }

    /// Remove the identifier at `index` (registration order).
    pub fn remove_identifier(&mut self, index: usize) -> Option<Box<dyn SplitPageIdentifier>> {
        if index < self.identifiers.len() {
            Some(self.identifiers.remove(index))
        } else {
            None
        }
    }

    /// Names of the registered identifiers, in evaluation order.
    pub fn identifier_names(&self) -> Vec<&str> {
        self.identifiers.iter().map(|id| id.name()).collect()
    }

    pub fn identifier_count(&self) -> usize {
        self.identifiers.len()
    }

    // -- Listeners ------------------------------------------------------------

    pub fn add_listener(&mut self, listener: impl SplitStatusListener + 'static) -> ListenerId {
        self.listeners.add(Box::new(listener))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn listener_ids(&self) -> Vec<ListenerId> {
        self.listeners.ids()
    }

    // -- Configuration --------------------------------------------------------

    /// First page (0-based) to process.
    pub fn set_start_page(&mut self, start: usize) {
        self.start_page = start;
    }

    /// Page (0-based, exclusive) at which processing stops.
    pub fn set_end_page(&mut self, end: usize) {
        self.end_page = end;
    }

    /// Set both bounds at once; `end` must not be before `start`.
    pub fn set_page_range(&mut self, start: usize, end: usize) -> Result<()> {
        if end < start {
            return Err(SplitError::InvalidPageRange(format!(
                "end page {} is before start page {}",
                end, start
            )));
        }
        self.start_page = start;
        self.end_page = end;
        Ok(())
    }

    pub fn start_page(&self) -> usize {
        self.start_page
    }

    pub fn end_page(&self) -> usize {
        self.end_page
    }

    /// Write finished documents to files. Without a target documents are only
    /// returned in memory.
    pub fn set_output_target(&mut self, target: Option<OutputTarget>) {
        self.output = target;
    }

    pub fn output_target(&self) -> Option<&OutputTarget> {
        self.output.as_ref()
    }

    /// Handle to stop a running split from another thread.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Request the running split to stop before the next page.
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Output documents finished by the current or last run.
    pub fn target_documents_count(&self) -> usize {
        self.documents_finished
    }

    // -- Splitting ------------------------------------------------------------

    /// Split `source` and return the output documents in order.
    ///
    /// An abort request stops the run before the next page; the document
    /// open at that point is still finished. Failing to write an output file
    /// ends the run with an error.
    #[instrument(skip_all, fields(pages = source.page_count()))]
    pub fn split(&mut self, source: &PdfDocument) -> Result<Vec<SplitDocument>> {
        self.abort.reset();
        self.documents_finished = 0;

        let page_count = source.page_count();
        let start = self.start_page;
        let end = self.end_page.min(page_count);
        info!(start, end, identifiers = self.identifiers.len(), "Splitting PDF");

        let mut outputs: Vec<SplitDocument> = Vec::new();
        let mut current_page = None;
        self.notify(&SplitStatusEvent {
            kind: SplitEventKind::SplittingStarted,
            page_count,
            current_page,
            document_count: 0,
            document: Some(source),
            file: None,
        });

        let mut open: Option<PdfDocument> = None;
        for page in source.pages().iter().take(end).skip(start) {
            if self.abort.is_aborted() {
                info!(page_index = page.index, "Split aborted");
                break;
            }
            current_page = Some(page.index);

            if self.is_split_page(source, page) {
                debug!(page_index = page.index, "Separator page");
                if let Some(document) = open.take() {
                    self.finish_document(document, &mut outputs, page_count, current_page)?;
                }
                continue;
            }

            if open.is_none() {
                let document = PdfDocument::new_like(source);
                self.notify(&SplitStatusEvent {
                    kind: SplitEventKind::NewDocument,
                    page_count,
                    current_page,
                    document_count: outputs.len(),
                    document: Some(&document),
                    file: None,
                });
                open = Some(document);
            }
            if let Some(document) = open.as_mut() {
                document.import_page(source, page)?;
            }
            self.notify(&SplitStatusEvent {
                kind: SplitEventKind::NextPage,
                page_count,
                current_page,
                document_count: outputs.len(),
                document: Some(source),
                file: None,
            });
        }

        if let Some(document) = open.take() {
            self.finish_document(document, &mut outputs, page_count, current_page)?;
        }

        self.notify(&SplitStatusEvent {
            kind: SplitEventKind::SplittingFinished,
            page_count,
            current_page,
            document_count: outputs.len(),
            document: Some(source),
            file: None,
        });
        info!(documents = outputs.len(), "Split complete");
        Ok(outputs)
    }

    // -- Helpers --------------------------------------------------------------

    /// First identifier wins; identifier errors count as "not a separator".
    fn is_split_page(&mut self, source: &PdfDocument, page: &PdfPage) -> bool {
        for identifier in &mut self.identifiers {
            match identifier.is_split_page(source, page, page.index) {
                Ok(true) => return true,
                Ok(false) => {}
                Err(err) => {
                    warn!(
                        identifier = identifier.name(),
                        page_index = page.index,
                        %err,
                        "Separator check failed"
                    );
                }
            }
        }
        false
    }

    fn finish_document(
        &mut self,
        mut document: PdfDocument,
        outputs: &mut Vec<SplitDocument>,
        page_count: usize,
        current_page: Option<usize>,
    ) -> Result<()> {
        let path = match &self.output {
            Some(target) => {
                let path = target.claim_next_file()?;
                if let Err(err) = document.save(&path) {
                    remove_unfinished(&path);
                    return Err(err);
                }
                Some(path)
            }
            None => None,
        };
        debug!(
            pages = document.page_count(),
            path = ?path.as_deref().map(Path::display),
            "Output document finished"
        );

        outputs.push(SplitDocument { document, path });
        self.documents_finished = outputs.len();

        if let Some(finished) = outputs.last() {
            self.notify(&SplitStatusEvent {
                kind: SplitEventKind::DocumentFinished,
                page_count,
                current_page,
                document_count: outputs.len(),
                document: Some(&finished.document),
                file: finished.path.as_deref(),
            });
        }
        Ok(())
    }

    fn notify(&mut self, event: &SplitStatusEvent<'_>) {
        self.listeners.notify(event);
    }
}

/// Remove a claimed output file whose document could not be written.
/// Returns whether the file is gone.
fn remove_unfinished(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => true,
        Err(err) => {
            warn!(path = %path.display(), %err, "Cannot remove unfinished output file");
            false
        }
    }
}

impl std::fmt::Debug for SmartSplitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartSplitter")
            .field("identifiers", &self.identifier_names())
            .field("listeners", &self.listeners.len())
            .field("start_page", &self.start_page)
            .field("end_page", &self.end_page)
            .field("output", &self.output)
            .finish()
    }
}
