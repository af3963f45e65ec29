// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR (Optical Character Recognition) engine abstraction.
//
// Separator detection and the text layer filter only see the `OcrEngine`
// trait. Engines are not shared between threads: every worker asks an
// `OcrEngineFactory` for its own instance and drops it when done.
//
// # Feature Gate
//
// The `ocrs` backend is only available when the `ocr` feature is enabled:
//
// ```toml
// pdfsplit-document = { path = "crates/pdfsplit-document", features = ["ocr"] }
// ```
//
// # Model Setup
//
// The `ocrs` backend requires two model files:
//
// - **Detection model** (`text-detection.rten`): locates text regions in the image.
// - **Recognition model** (`text-recognition.rten`): decodes characters from detected regions.
//
// They are looked up in `OcrSettings::data_path`, which defaults to
// `$XDG_CACHE_HOME/ocrs` (typically `~/.cache/ocrs`), the directory `ocrs-cli`
// downloads them to. The `detection_model` and `recognition_model` variables
// point at other files.

use std::path::PathBuf;

use image::RgbImage;
use pdfsplit_core::config::OcrSettings;
use pdfsplit_core::error::{Result, SplitError};

/// Well-known filenames for the detection and recognition models.
pub const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
pub const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Settings variable overriding the detection model path.
pub const DETECTION_MODEL_VARIABLE: &str = "detection_model";
/// Settings variable overriding the recognition model path.
pub const RECOGNITION_MODEL_VARIABLE: &str = "recognition_model";

/// Axis-aligned word bounds in image pixels, origin top left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One recognised word and where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedWord {
    pub text: String,
    pub bbox: WordBox,
}

/// A text recogniser instance. Owned by one thread at a time.
pub trait OcrEngine: Send {
    /// Recognise individual words with their bounding boxes.
    fn recognize_words(&mut self, image: &RgbImage) -> Result<Vec<RecognizedWord>>;

    /// Recognise all text on the image, lines separated by newlines.
    fn recognize_text(&mut self, image: &RgbImage) -> Result<String> {
        Ok(words_to_text(&self.recognize_words(image)?))
    }
}

/// Creates [`OcrEngine`] instances on demand.
pub trait OcrEngineFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn OcrEngine>>;
}

/// Paths of the two model files the `ocrs` backend needs.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrModelPaths {
    pub detection: PathBuf,
    pub recognition: PathBuf,
}

impl OcrModelPaths {
    /// Resolve model paths from settings. Variables win over `data_path`.
    pub fn from_settings(settings: &OcrSettings) -> Self {
        let detection = settings
            .variable(DETECTION_MODEL_VARIABLE)
            .map(PathBuf::from)
            .unwrap_or_else(|| settings.data_path.join(DETECTION_MODEL_FILENAME));
        let recognition = settings
            .variable(RECOGNITION_MODEL_VARIABLE)
            .map(PathBuf::from)
            .unwrap_or_else(|| settings.data_path.join(RECOGNITION_MODEL_FILENAME));
        Self {
            detection,
            recognition,
        }
    }

    /// Verify that both model files exist.
    pub fn validate(&self) -> Result<()> {
        for (kind, path) in [("detection", &self.detection), ("recognition", &self.recognition)] {
            if !path.exists() {
                return Err(SplitError::Ocr(format!(
                    "{} model not found at {}; run `ocrs-cli` once to download models",
                    kind,
                    path.display()
                )));
            }
        }
        Ok(())
    }

    pub fn available(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Join recognised words into lines of text, breaking where a word starts
/// below the previous word's vertical centre.
pub fn words_to_text(words: &[RecognizedWord]) -> String {
    let mut text = String::new();
    let mut previous: Option<&WordBox> = None;
    for word in words {
        if let Some(prev) = previous {
            if word.bbox.y > prev.y + prev.height / 2.0 {
                text.push('\n');
            } else {
                text.push(' ');
            }
        }
        text.push_str(&word.text);
        previous = Some(&word.bbox);
    }
    text
}

#[cfg(feature = "ocr")]
pub use self::ocrs_backend::{OcrsEngine, OcrsEngineFactory};

#[cfg(feature = "ocr")]
mod ocrs_backend {
    use image::RgbImage;
    use ocrs::{ImageSource, OcrEngine as OcrsInner, OcrEngineParams, OcrInput, TextItem};
    use pdfsplit_core::config::OcrSettings;
    use pdfsplit_core::error::{Result, SplitError};
    use rten::Model;
    use tracing::{debug, info, instrument, warn};

    use super::{OcrEngine, OcrEngineFactory, OcrModelPaths, RecognizedWord, WordBox};

    /// OCR engine backed by the pure-Rust `ocrs` crate.
    ///
    /// **Important:** `ocrs` and `rten` are 10-100x slower in debug builds.
    pub struct OcrsEngine {
        engine: OcrsInner,
    }

    impl OcrsEngine {
        /// Load the models named by `paths`.
        #[instrument(skip_all, fields(
            detection = %paths.detection.display(),
            recognition = %paths.recognition.display(),
        ))]
        pub fn new(paths: &OcrModelPaths) -> Result<Self> {
            paths.validate()?;

            info!("Loading OCR detection model");
            let detection_model = Model::load_file(&paths.detection).map_err(|err| {
                SplitError::Ocr(format!(
                    "failed to load detection model from {}: {}",
                    paths.detection.display(),
                    err
                ))
            })?;

            info!("Loading OCR recognition model");
            let recognition_model = Model::load_file(&paths.recognition).map_err(|err| {
                SplitError::Ocr(format!(
                    "failed to load recognition model from {}: {}",
                    paths.recognition.display(),
                    err
                ))
            })?;

            let engine = OcrsInner::new(OcrEngineParams {
                detection_model: Some(detection_model),
                recognition_model: Some(recognition_model),
                ..Default::default()
            })
            .map_err(|err| SplitError::Ocr(format!("failed to initialise OCR engine: {}", err)))?;

            Ok(Self { engine })
        }

        fn prepare(&self, image: &RgbImage) -> Result<OcrInput> {
            let (width, height) = image.dimensions();
            let source = ImageSource::from_bytes(image.as_raw(), (width, height)).map_err(|err| {
                SplitError::Image(format!(
                    "failed to create image source ({}x{}): {}",
                    width, height, err
                ))
            })?;
            self.engine
                .prepare_input(source)
                .map_err(|err| SplitError::Ocr(format!("OCR preprocessing failed: {}", err)))
        }
    }

    impl OcrEngine for OcrsEngine {
        #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
        fn recognize_words(&mut self, image: &RgbImage) -> Result<Vec<RecognizedWord>> {
            let input = self.prepare(image)?;

            let word_rects = self
                .engine
                .detect_words(&input)
                .map_err(|err| SplitError::Ocr(format!("word detection failed: {}", err)))?;
            let line_rects = self.engine.find_text_lines(&input, &word_rects);
            let lines = self
                .engine
                .recognize_text(&input, &line_rects)
                .map_err(|err| SplitError::Ocr(format!("line recognition failed: {}", err)))?;

            let mut words = Vec::new();
            for line in lines.iter().flatten() {
                for word in line.words() {
                    let text: String = word.chars().iter().map(|c| c.char).collect();
                    let text = text.trim().to_string();
                    if text.is_empty() {
                        continue;
                    }
                    let rect = word.bounding_rect();
                    words.push(RecognizedWord {
                        text,
                        bbox: WordBox {
                            x: rect.left() as f32,
                            y: rect.top() as f32,
                            width: rect.width() as f32,
                            height: rect.height() as f32,
                        },
                    });
                }
            }

            debug!(word_count = words.len(), "Word recognition complete");
            Ok(words)
        }

        #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
        fn recognize_text(&mut self, image: &RgbImage) -> Result<String> {
            let input = self.prepare(image)?;
            let text = self
                .engine
                .get_text(&input)
                .map_err(|err| SplitError::Ocr(format!("OCR text recognition failed: {}", err)))?;
            debug!(line_count = text.lines().count(), "OCR recognition complete");
            Ok(text)
        }
    }

    /// Creates [`OcrsEngine`]s from [`OcrSettings`].
    #[derive(Debug, Clone)]
    pub struct OcrsEngineFactory {
        paths: OcrModelPaths,
    }

    impl OcrsEngineFactory {
        pub fn new(settings: &OcrSettings) -> Self {
            if settings.language != "eng" {
                warn!(
                    language = %settings.language,
                    "ocrs models recognise Latin script only; language setting ignored"
                );
            }
            Self {
                paths: OcrModelPaths::from_settings(settings),
            }
        }

        pub fn paths(&self) -> &OcrModelPaths {
            &self.paths
        }
    }

    impl OcrEngineFactory for OcrsEngineFactory {
        fn create(&self) -> Result<Box<dyn OcrEngine>> {
            Ok(Box::new(OcrsEngine::new(&self.paths)?))
        }
    }
}
