// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output file naming for split documents.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use pdfsplit_core::error::{Result, SplitError};
use tracing::{debug, warn};
use uuid::Uuid;

/// Number of indices tried when filling a name pattern.
pub const MAX_NAME_ATTEMPTS: usize = 5000;

/// Prefix of fallback file names.
pub const FALLBACK_PREFIX: &str = "pdfsplit_";

/// Where finished output documents are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub directory: PathBuf,
    /// File name with a `{0}` or `{}` placeholder for a running number.
    pub name_pattern: Option<String>,
}

impl OutputTarget {
    /// Target without a pattern; files get unique fallback names.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            name_pattern: None,
        }
    }

    pub fn with_pattern(directory: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            name_pattern: Some(pattern.into()),
        }
    }

    /// Create the next free output file and return its path.
    ///
    /// Pattern indices `0..MAX_NAME_ATTEMPTS` are tried in order; a name is
    /// claimed by creating the file exclusively, so two concurrent runs never
    /// get the same file. If no pattern is set or no name can be claimed, a
    /// unique `pdfsplit_<uuid>.pdf` is created in the directory, or in the
    /// system temp directory if that fails too.
    pub fn claim_next_file(&self) -> Result<PathBuf> {
        if let Some(pattern) = &self.name_pattern {
            if let Some(path) = self.claim_from_pattern(pattern) {
                return Ok(path);
            }
        }
        self.claim_fallback()
    }

    fn claim_from_pattern(&self, pattern: &str) -> Option<PathBuf> {
        let has_placeholder = format_name(pattern, 0).is_some();
        let attempts = if has_placeholder { MAX_NAME_ATTEMPTS } else { 1 };

        for index in 0..attempts {
            let name = format_name(pattern, index).unwrap_or_else(|| pattern.to_string());
            let path = self.directory.join(name);
            match create_new(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "Output file claimed");
                    return Some(path);
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => {
                    // Not a name clash; other indices will fail the same way.
                    warn!(path = %path.display(), %err, "Cannot create output file");
                    return None;
                }
            }
        }
        warn!(pattern, "No free file name for output pattern");
        None
    }

    fn claim_fallback(&self) -> Result<PathBuf> {
        let temp = std::env::temp_dir();
        let mut last_error = None;
        for directory in [self.directory.as_path(), temp.as_path()] {
            let path = directory.join(format!("{}{}.pdf", FALLBACK_PREFIX, Uuid::new_v4().simple()));
            match create_new(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "Fallback output file claimed");
                    return Ok(path);
                }
                Err(err) => {
                    warn!(path = %path.display(), %err, "Cannot create fallback output file");
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.map(SplitError::Io).unwrap_or_else(|| {
            SplitError::Pdf("no output file could be created".to_string())
        }))
    }
}

/// Substitute `index` for the first `{0}` or `{}` in `pattern`. `None` when
/// the pattern has no placeholder.
pub fn format_name(pattern: &str, index: usize) -> Option<String> {
    for placeholder in ["{0}", "{}"] {
        if let Some(position) = pattern.find(placeholder) {
            let mut name = String::with_capacity(pattern.len() + 4);
            name.push_str(&pattern[..position]);
            name.push_str(&index.to_string());
            name.push_str(&pattern[position + placeholder.len()..]);
            return Some(name);
        }
    }
    None
}

fn create_new(path: &Path) -> std::io::Result<()> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map(|_| ())
}
