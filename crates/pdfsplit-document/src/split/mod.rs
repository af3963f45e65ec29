// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Split module: separator page identifiers and the splitting engine.

pub mod events;
pub mod identifier;
pub mod ocr_text;
pub mod output;
pub mod qr;
pub mod splitter;
pub mod text;

pub use events::{SplitStatusEvent, SplitStatusListener};
pub use identifier::SplitPageIdentifier;
pub use ocr_text::OcrTextSplitIdentifier;
pub use output::OutputTarget;
pub use qr::QrCodeIdentifier;
pub use splitter::{SmartSplitter, SplitDocument};
pub use text::TextSplitIdentifier;
