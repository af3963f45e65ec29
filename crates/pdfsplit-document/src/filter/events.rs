// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document filter progress events and listeners.

use std::panic::{AssertUnwindSafe, catch_unwind};

use pdfsplit_core::types::{FilterEventKind, ListenerId};
use tracing::error;

/// A progress notification of a document filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentFilterEvent {
    pub kind: FilterEventKind,
    pub page_count: usize,
    /// 0-based page index; `None` for document level events.
    pub page_index: Option<usize>,
}

/// Receives [`DocumentFilterEvent`]s, possibly from several worker threads at
/// once. Closures taking `&DocumentFilterEvent` implement this trait.
pub trait DocumentFilterListener: Send + Sync {
    fn document_filter_update(&self, event: &DocumentFilterEvent);
}

impl<F> DocumentFilterListener for F
where
    F: Fn(&DocumentFilterEvent) + Send + Sync,
{
    fn document_filter_update(&self, event: &DocumentFilterEvent) {
        self(event)
    }
}

/// Registered filter listeners, notified in registration order.
#[derive(Default)]
pub struct FilterListeners {
    entries: Vec<(ListenerId, Box<dyn DocumentFilterListener>)>,
}

impl FilterListeners {
    pub fn add(&mut self, listener: Box<dyn DocumentFilterListener>) -> ListenerId {
        let id = ListenerId::next();
        self.entries.push((id, listener));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deliver `event` to every listener, isolating listener panics.
    pub fn notify(&self, event: &DocumentFilterEvent) {
        for (id, listener) in &self.entries {
            let delivered = catch_unwind(AssertUnwindSafe(|| listener.document_filter_update(event)));
            if delivered.is_err() {
                error!(listener = %id, kind = ?event.kind, "Document filter listener panicked");
            }
        }
    }
}

impl std::fmt::Debug for FilterListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(id, _)| id))
            .finish()
    }
}
