// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Separator detection by QR code.

use pdfsplit_core::error::{Result, SplitError};
use tracing::debug;

use super::identifier::SplitPageIdentifier;
use crate::pdf::document::PdfDocument;
use crate::pdf::page::PdfPage;
use crate::scan::qr::QrCodeExtractor;

/// Marks pages carrying a QR code whose payload equals a target string.
#[derive(Debug, Clone)]
pub struct QrCodeIdentifier {
    target: String,
    extractor: QrCodeExtractor,
}

impl QrCodeIdentifier {
    pub fn new(target: impl Into<String>, extractor: QrCodeExtractor) -> Result<Self> {
        let target = target.into();
        if target.is_empty() {
            return Err(SplitError::InvalidIdentifier(
                "QR code payload must not be empty".into(),
            ));
        }
        Ok(Self { target, extractor })
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl SplitPageIdentifier for QrCodeIdentifier {
    fn is_split_page(
        &mut self,
        document: &PdfDocument,
        _page: &PdfPage,
        page_index: usize,
    ) -> Result<bool> {
        let payloads = self.extractor.extract(document, page_index)?;
        let found = payloads.iter().any(|payload| *payload == self.target);
        if !found && !payloads.is_empty() {
            debug!(page_index, codes = payloads.len(), "QR codes present, none match");
        }
        Ok(found)
    }

    fn name(&self) -> &str {
        "qr-code"
    }
}
