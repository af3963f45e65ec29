// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: document model, page handles, rendering and the text layer font.

pub mod document;
pub mod font;
pub mod page;
pub mod render;

pub use document::PdfDocument;
pub use page::{PageBox, PdfPage};
pub use render::PageRenderer;
