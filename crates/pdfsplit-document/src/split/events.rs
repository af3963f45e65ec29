// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Split progress events and listeners.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

use pdfsplit_core::types::{ListenerId, SplitEventKind};
use tracing::error;

use crate::pdf::document::PdfDocument;

/// A progress notification of a split run.
#[derive(Debug, Clone, Copy)]
pub struct SplitStatusEvent<'a> {
    pub kind: SplitEventKind,
    /// Pages in the source document.
    pub page_count: usize,
    /// 0-based index of the page being processed; `None` before the first.
    pub current_page: Option<usize>,
    /// Output documents finished so far.
    pub document_count: usize,
    /// The source document, or for `NewDocument` / `DocumentFinished` the
    /// output document concerned.
    pub document: Option<&'a PdfDocument>,
    /// File an output document was written to.
    pub file: Option<&'a Path>,
}

/// Receives [`SplitStatusEvent`]s. Closures taking `&SplitStatusEvent`
/// implement this trait.
pub trait SplitStatusListener: Send {
    fn split_status_update(&mut self, event: &SplitStatusEvent<'_>);
}

impl<F> SplitStatusListener for F
where
    F: FnMut(&SplitStatusEvent<'_>) + Send,
{
    fn split_status_update(&mut self, event: &SplitStatusEvent<'_>) {
        (*self)(event)
    }
}

/// Registered listeners, notified in registration order.
#[derive(Default)]
pub(crate) struct SplitListeners {
    entries: Vec<(ListenerId, Box<dyn SplitStatusListener>)>,
}

impl SplitListeners {
    pub fn add(&mut self, listener: Box<dyn SplitStatusListener>) -> ListenerId {
        let id = ListenerId::next();
        self.entries.push((id, listener));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn ids(&self) -> Vec<ListenerId> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Deliver `event` to every listener. A panicking listener is logged and
    /// does not keep the others from being notified.
    pub fn notify(&mut self, event: &SplitStatusEvent<'_>) {
        for (id, listener) in &mut self.entries {
            let delivered = catch_unwind(AssertUnwindSafe(|| listener.split_status_update(event)));
            if delivered.is_err() {
                error!(listener = %id, kind = %event.kind, "Split status listener panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn event(kind: SplitEventKind) -> SplitStatusEvent<'static> {
        SplitStatusEvent {
            kind,
            page_count: 3,
            current_page: None,
            document_count: 0,
            document: None,
            file: None,
        }
    }

    #[test]
    fn listeners_are_notified_in_order_and_removable() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut listeners = SplitListeners::default();

        let first = Arc::clone(&seen);
        let a = listeners.add(Box::new(move |e: &SplitStatusEvent<'_>| {
            first.lock().unwrap().push(("a", e.kind));
        }));
        let second = Arc::clone(&seen);
        listeners.add(Box::new(move |e: &SplitStatusEvent<'_>| {
            second.lock().unwrap().push(("b", e.kind));
        }));

        listeners.notify(&event(SplitEventKind::SplittingStarted));
        assert!(listeners.remove(a));
        assert!(!listeners.remove(a));
        listeners.notify(&event(SplitEventKind::SplittingFinished));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("a", SplitEventKind::SplittingStarted),
                ("b", SplitEventKind::SplittingStarted),
                ("b", SplitEventKind::SplittingFinished),
            ]
        );
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn panicking_listener_does_not_stop_others() {
        let count = Arc::new(Mutex::new(0));
        let mut listeners = SplitListeners::default();
        listeners.add(Box::new(|_: &SplitStatusEvent<'_>| panic!("listener failure")));
        let counter = Arc::clone(&count);
        listeners.add(Box::new(move |_: &SplitStatusEvent<'_>| {
            *counter.lock().unwrap() += 1;
        }));

        listeners.notify(&event(SplitEventKind::NextPage));
        listeners.notify(&event(SplitEventKind::NextPage));
        assert_eq!(*count.lock().unwrap(), 2);
    }
}
