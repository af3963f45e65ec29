// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.
//
// Settings are stored as JSON. Every field has a default, so a config file only
// needs to name the values it overrides. Several files can be layered: later
// files win over earlier ones.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SplitError};

/// Default separator texts. Any one of them marks a separator page.
pub const DEFAULT_SEPARATOR_TEXTS: [&str; 3] = [
    "$PWKM%U?5X4$",
    "PDF-SPLIT-SPLIT-PAGE",
    "PDF-SPLIT-TRENNSEITE",
];

/// Default payload of a separator QR code.
pub const DEFAULT_QR_CODE: &str = "https://github.com/MiBiMiFlo/PDFSplit";

/// Default output file name pattern.
pub const DEFAULT_NAME_PATTERN: &str = "split_{0}.pdf";

/// Smallest accepted render scale (7.2 dpi).
pub const MIN_RENDER_SCALE: f32 = 0.1;

/// Largest accepted render scale (720 dpi).
pub const MAX_RENDER_SCALE: f32 = 10.0;

/// File name of the configuration file looked up by [`default_config_paths`].
pub const CONFIG_FILE: &str = "pdfsplit.json";

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Directory a file dialog or the CLI starts in.
    pub open_directory: Option<PathBuf>,
    /// Directory split documents are written to. `None` means next to the
    /// input file.
    pub save_directory: Option<PathBuf>,
    /// Output file name pattern; `{0}` is replaced by a running number.
    pub name_pattern: String,

    /// Use the text based separator identifier.
    pub use_text: bool,
    /// Texts that identify a separator page.
    pub separator_texts: Vec<String>,
    /// Number of `separator_texts` that must be present on a separator page.
    pub match_count: usize,
    /// Use the QR code based separator identifier.
    pub use_qr: bool,
    /// QR code payload that identifies a separator page.
    pub qr_code: String,
    /// Run OCR on pages without text when looking for separator texts.
    pub ocr_enabled: bool,
    /// Run OCR on every page, even those with text.
    pub ocr_force: bool,

    /// Add an invisible OCR text layer to image-only pages before splitting.
    pub filter_ocr: bool,
    /// Report visually blank pages.
    pub filter_empty_pages: bool,
    /// Thresholds of the blank page heuristic.
    pub blank_page: BlankPageSettings,

    /// OCR engine settings.
    pub ocr: OcrSettings,
    /// Render scale for OCR (1.0 = 72 dpi).
    pub ocr_scale: f32,
    /// Maximum number of OCR worker threads.
    pub ocr_threads: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            open_directory: None,
            save_directory: None,
            name_pattern: DEFAULT_NAME_PATTERN.to_string(),
            use_text: true,
            separator_texts: DEFAULT_SEPARATOR_TEXTS.iter().map(|s| s.to_string()).collect(),
            match_count: 1,
            use_qr: false,
            qr_code: DEFAULT_QR_CODE.to_string(),
            ocr_enabled: false,
            ocr_force: false,
            filter_ocr: false,
            filter_empty_pages: false,
            blank_page: BlankPageSettings::default(),
            ocr: OcrSettings::default(),
            ocr_scale: 3.0,
            ocr_threads: 4,
        }
    }
}

impl SplitConfig {
    /// Load a single config file. Fields missing from the file keep their
    /// defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&data)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load and merge several config files in order. Files that do not exist
    /// are skipped; values in later files override earlier ones.
    pub fn load_layered<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;
        for path in paths {
            let path = path.as_ref();
            if !path.is_file() {
                debug!(path = %path.display(), "Config file not present, skipping");
                continue;
            }
            let data = std::fs::read_to_string(path)?;
            let layer: serde_json::Value = serde_json::from_str(&data)?;
            merge_json(&mut merged, layer);
            info!(path = %path.display(), "Loaded configuration layer");
        }
        Ok(serde_json::from_value(merged)?)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.ocr_enabled && !self.use_text {
            return Err(SplitError::Config(
                "ocr_enabled reads separator texts and needs use_text".into(),
            ));
        }
        if self.use_text {
            if self.separator_texts.is_empty() {
                return Err(SplitError::Config(
                    "text separator enabled but no separator texts configured".into(),
                ));
            }
            if self.match_count == 0 || self.match_count > self.separator_texts.len() {
                return Err(SplitError::Config(format!(
                    "match_count must be between 1 and {}, got {}",
                    self.separator_texts.len(),
                    self.match_count
                )));
            }
        }
        if self.use_qr && self.qr_code.is_empty() {
            return Err(SplitError::Config(
                "QR separator enabled but qr_code is empty".into(),
            ));
        }
        if self.ocr_threads == 0 {
            return Err(SplitError::Config("ocr_threads must be at least 1".into()));
        }
        check_render_scale("ocr_scale", self.ocr_scale)?;
        self.blank_page.validate()
    }
}

/// Thresholds for the blank page heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlankPageSettings {
    /// Darkness (in %, 0 = white, 100 = black) above which a pixel counts as
    /// filled.
    pub pixel_threshold: u32,
    /// Share of filled pixels (in %) above which a block counts as filled.
    pub block_threshold: u32,
    /// Number of filled blocks at which a page counts as not empty.
    pub page_threshold: u32,
    /// Number of blocks across the page.
    pub blocks_horizontal: u32,
    /// Number of blocks down the page.
    pub blocks_vertical: u32,
    /// Render scale used for the check (1.0 = 72 dpi).
    pub render_scale: f32,
}

impl Default for BlankPageSettings {
    fn default() -> Self {
        Self {
            pixel_threshold: 25,
            block_threshold: 2,
            page_threshold: 6,
            blocks_horizontal: 10,
            blocks_vertical: 10,
            render_scale: 1.0,
        }
    }
}

impl BlankPageSettings {
    pub fn validate(&self) -> Result<()> {
        if self.blocks_horizontal == 0 || self.blocks_vertical == 0 {
            return Err(SplitError::Config(
                "blank page block counts must be at least 1".into(),
            ));
        }
        if self.pixel_threshold > 100 || self.block_threshold > 100 {
            return Err(SplitError::Config(
                "blank page pixel/block thresholds are percentages (0..=100)".into(),
            ));
        }
        check_render_scale("blank page render_scale", self.render_scale)
    }
}

/// Settings handed to every OCR engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Language the documents are expected to be in.
    pub language: String,
    /// Directory holding the recognition models.
    pub data_path: PathBuf,
    /// Engine mode (backend specific).
    pub engine_mode: i32,
    /// Page segmentation mode (backend specific).
    pub page_segmentation_mode: i32,
    /// Free-form backend variables.
    pub variables: BTreeMap<String, String>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            data_path: default_model_dir(),
            engine_mode: 3,
            page_segmentation_mode: 1,
            variables: BTreeMap::new(),
        }
    }
}

impl OcrSettings {
    /// Look up a backend variable.
    pub fn variable(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }
}

/// Reject render scales outside [`MIN_RENDER_SCALE`]..=[`MAX_RENDER_SCALE`],
/// including NaN.
pub fn check_render_scale(name: &str, scale: f32) -> Result<()> {
    if (MIN_RENDER_SCALE..=MAX_RENDER_SCALE).contains(&scale) {
        Ok(())
    } else {
        Err(SplitError::Config(format!(
            "{} must be between {} and {}, got {}",
            name, MIN_RENDER_SCALE, MAX_RENDER_SCALE, scale
        )))
    }
}

/// Default directory for cached OCR model files.
///
/// `$XDG_CACHE_HOME/ocrs`, falling back to `~/.cache/ocrs`.
pub fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Config files consulted by the CLI, lowest priority first.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE)];
    for var in ["HOME", "USERPROFILE"] {
        if let Ok(dir) = std::env::var(var) {
            let dir = PathBuf::from(dir);
            paths.push(dir.join(format!(".{CONFIG_FILE}")));
            paths.push(dir.join(CONFIG_FILE));
        }
    }
    paths
}

/// Recursively overlay `layer` onto `base`. Objects are merged key by key,
/// everything else is replaced.
fn merge_json(base: &mut serde_json::Value, layer: serde_json::Value) {
    match (base, layer) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(layer_map)) => {
            for (key, value) in layer_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}
