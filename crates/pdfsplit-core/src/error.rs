// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for PDFSplit.

use thiserror::Error;

/// Top-level error type for all PDFSplit operations.
#[derive(Debug, Error)]
pub enum SplitError {
    // -- Precondition violations --
    #[error("invalid split page identifier: {0}")]
    InvalidIdentifier(String),

    #[error("invalid page range: {0}")]
    InvalidPageRange(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Document errors --
    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("page rendering failed: {0}")]
    Render(String),

    #[error("image processing failed: {0}")]
    Image(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("QR code decoding failed: {0}")]
    Qr(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SplitError>;
