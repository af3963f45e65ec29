// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Work distribution for filter worker pools.

use std::sync::{Mutex, PoisonError};

use pdfsplit_core::types::AbortHandle;

/// Hands out the items of a slice to any number of workers, each item exactly
/// once, in order.
#[derive(Debug)]
pub struct WorkQueue<'a, T> {
    items: &'a [T],
    cursor: Mutex<usize>,
    abort: Option<AbortHandle>,
}

impl<'a, T> WorkQueue<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Self {
            items,
            cursor: Mutex::new(0),
            abort: None,
        }
    }

    /// Stop handing out items once `abort` is set.
    pub fn with_abort(mut self, abort: AbortHandle) -> Self {
        self.abort = Some(abort);
        self
    }

    /// Claim the next item, returning its position and the item.
    pub fn next_item(&self) -> Option<(usize, &'a T)> {
        if self.abort.as_ref().is_some_and(AbortHandle::is_aborted) {
            return None;
        }
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let index = *cursor;
        let item = self.items.get(index)?;
        *cursor += 1;
        Some((index, item))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
