// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for PDFSplit.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Progress notifications emitted by the splitter while it walks the source
/// document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitEventKind {
    /// A split run started. Sent once, before the first page.
    SplittingStarted,
    /// A content page was imported into the open target document.
    NextPage,
    /// A new target document was opened (before its first page is imported).
    NewDocument,
    /// A target document was finalised, either on a separator page or after
    /// the last page.
    DocumentFinished,
    /// The split run ended (normally or through an abort request).
    SplittingFinished,
}

impl std::fmt::Display for SplitEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::SplittingStarted => "splitting-started",
            Self::NextPage => "next-page",
            Self::NewDocument => "new-document",
            Self::DocumentFinished => "document-finished",
            Self::SplittingFinished => "splitting-finished",
        };
        f.write_str(label)
    }
}

/// Progress notifications emitted by document filters (e.g. the OCR pass).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterEventKind {
    /// The filter started on a document.
    NewDocument,
    /// A worker picked up the next page.
    NextPage,
    /// The page does not need processing (e.g. it already carries text).
    PageIgnored,
    /// A page was processed, successfully or not.
    PageDone,
    /// The filter finished the document.
    DocumentDone,
}

/// Cooperative cancellation flag shared between a long running operation and
/// any other thread (typically a UI or signal handler).
///
/// Cloning the handle shares the same flag.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the operation to stop at the next page boundary.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear a previous abort request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Identifies a registered listener so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocate a process-wide unique listener id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}
