// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDFSplit: split scanned PDF batches on separator pages.
//
// Entry point. Initialises logging, loads the layered configuration, applies
// command line overrides and runs the requested command.

mod backend;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use pdfsplit_core::config::{DEFAULT_NAME_PATTERN, SplitConfig, default_config_paths};
use pdfsplit_core::error::{Result, SplitError};
use pdfsplit_core::types::{FilterEventKind, SplitEventKind};
use pdfsplit_document::filter::{DocumentFilter, DocumentFilterEvent, OcrFilter};
use pdfsplit_document::pdf::document::PdfDocument;
use pdfsplit_document::pdf::render::PageRenderer;
use pdfsplit_document::scan::{BlankPageChecker, OcrEngineFactory, QrCodeExtractor};
use pdfsplit_document::split::{
    OcrTextSplitIdentifier, OutputTarget, QrCodeIdentifier, SmartSplitter, SplitStatusEvent,
    TextSplitIdentifier,
};
use tracing::{debug, error, info};

#[derive(Debug, Parser)]
#[command(name = "pdfsplit", version, about = "Split scanned PDF batches on separator pages")]
struct Cli {
    /// Configuration file. Without it ./pdfsplit.json, ~/.pdfsplit.json and
    /// ~/pdfsplit.json are merged, later files winning.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Split a PDF into several documents at separator pages.
    Split(SplitArgs),
    /// List the pages of a PDF that look blank.
    Blank {
        /// PDF file to check.
        input: PathBuf,
    },
}

#[derive(Debug, Args)]
struct SplitArgs {
    /// PDF file to split.
    input: PathBuf,

    /// Separator text; repeat for several. Replaces the configured texts.
    #[arg(long = "separator", value_name = "TEXT")]
    separators: Vec<String>,

    /// Number of separator texts a separator page must contain.
    #[arg(long, value_name = "N")]
    match_count: Option<usize>,

    /// Detect separator pages by QR code, optionally with a payload other
    /// than the configured one.
    #[arg(long, value_name = "TEXT", num_args = 0..=1)]
    qr: Option<Option<String>>,

    /// Read separator texts from page images where pages have no text.
    #[arg(long)]
    ocr: bool,

    /// Read separator texts from page images on every page.
    #[arg(long)]
    force_ocr: bool,

    /// Add an invisible OCR text layer to scanned pages before splitting.
    #[arg(long)]
    ocr_filter: bool,

    /// Number of OCR worker threads.
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Directory for the output files. Defaults to the input's directory.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Output file name pattern; `{0}` is replaced by a running number.
    /// Defaults to `<input name>_{0}.pdf`.
    #[arg(long, value_name = "PATTERN")]
    pattern: Option<String>,

    /// First page to process (1-based).
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    start: Option<u32>,

    /// Last page to process (1-based, inclusive).
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    end: Option<u32>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "pdfsplit failed");
            eprintln!("pdfsplit: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => SplitConfig::load(path)?,
        None => SplitConfig::load_layered(&default_config_paths())?,
    };
    match cli.command {
        Command::Split(args) => split(config, args),
        Command::Blank { input } => blank(config, &input),
    }
}

/// Apply command line overrides to the loaded configuration.
fn apply_overrides(config: &mut SplitConfig, args: &SplitArgs) {
    if !args.separators.is_empty() {
        config.separator_texts = args.separators.clone();
        config.use_text = true;
    }
    if let Some(count) = args.match_count {
        config.match_count = count;
    }
    if let Some(qr) = &args.qr {
        config.use_qr = true;
        if let Some(payload) = qr {
            config.qr_code = payload.clone();
        }
    }
    if args.ocr || args.force_ocr {
        config.ocr_enabled = true;
    }
    if args.force_ocr {
        config.ocr_force = true;
    }
    if args.ocr_filter {
        config.filter_ocr = true;
    }
    if let Some(threads) = args.threads {
        config.ocr_threads = threads;
    }
}

/// Renderer and OCR factory, created on first use.
#[derive(Default)]
struct Backends {
    renderer: Option<Arc<dyn PageRenderer>>,
    ocr: Option<Arc<dyn OcrEngineFactory>>,
}

impl Backends {
    fn renderer(&mut self) -> Result<Arc<dyn PageRenderer>> {
        if let Some(renderer) = &self.renderer {
            return Ok(Arc::clone(renderer));
        }
        let renderer = backend::renderer()?;
        self.renderer = Some(Arc::clone(&renderer));
        Ok(renderer)
    }

    fn ocr(&mut self, config: &SplitConfig) -> Result<Arc<dyn OcrEngineFactory>> {
        if let Some(factory) = &self.ocr {
            return Ok(Arc::clone(factory));
        }
        let factory = backend::ocr_factory(&config.ocr)?;
        self.ocr = Some(Arc::clone(&factory));
        Ok(factory)
    }
}

fn split(mut config: SplitConfig, args: SplitArgs) -> Result<()> {
    apply_overrides(&mut config, &args);
    config.validate()?;

    let mut backends = Backends::default();
    let mut splitter = build_splitter(&config, &mut backends)?;
    if let (Some(start), Some(end)) = (args.start, args.end) {
        splitter.set_page_range(start as usize - 1, end as usize)?;
    } else {
        if let Some(start) = args.start {
            splitter.set_start_page(start as usize - 1);
        }
        if let Some(end) = args.end {
            splitter.set_end_page(end as usize);
        }
    }

    let mut document = PdfDocument::open(&args.input)?;
    info!(path = %args.input.display(), pages = document.page_count(), "Opened input");

    if config.filter_ocr {
        let mut filter = OcrFilter::new(backends.ocr(&config)?, backends.renderer()?)
            .with_thread_count(config.ocr_threads)
            .with_scale(config.ocr_scale)?
            .with_force(config.ocr_force)
            .with_abort(splitter.abort_handle());
        filter.add_listener(Box::new(log_filter_event));
        document = filter.filter(document)?;
    }

    if config.filter_empty_pages {
        let checker = BlankPageChecker::with_settings(backends.renderer()?, config.blank_page.clone());
        let blank: Vec<usize> = checker
            .empty_pages(&document)
            .into_iter()
            .map(|index| index + 1)
            .collect();
        if !blank.is_empty() {
            info!(pages = ?blank, "Blank pages in input");
        }
    }

    let directory = output_directory(&config, &args);
    let pattern = output_pattern(&config, &args);
    info!(directory = %directory.display(), pattern, "Writing split documents");
    splitter.set_output_target(Some(OutputTarget::with_pattern(directory, pattern)));
    splitter.add_listener(log_split_event);

    let outputs = splitter.split(&document)?;
    for output in &outputs {
        if let Some(path) = &output.path {
            println!("{}", path.display());
        }
    }
    info!(documents = outputs.len(), "Done");
    Ok(())
}

/// Print the 1-based numbers of the blank pages of `input`, one per line.
fn blank(config: SplitConfig, input: &Path) -> Result<()> {
    config.blank_page.validate()?;
    let document = PdfDocument::open(input)?;
    let checker = BlankPageChecker::with_settings(backend::renderer()?, config.blank_page);
    let blank = checker.empty_pages(&document);
    info!(blank = blank.len(), pages = document.page_count(), "Blank page check finished");
    for index in blank {
        println!("{}", index + 1);
    }
    Ok(())
}

fn build_splitter(config: &SplitConfig, backends: &mut Backends) -> Result<SmartSplitter> {
    let mut splitter = SmartSplitter::new();
    if config.use_text {
        let texts = config.separator_texts.iter().cloned();
        if config.ocr_enabled {
            let identifier = OcrTextSplitIdentifier::new(
                texts,
                config.match_count,
                config.ocr_force,
                backends.renderer()?,
                backends.ocr(config)?,
            )?;
            splitter.add_identifier(Box::new(identifier));
        } else {
            splitter.add_identifier(Box::new(TextSplitIdentifier::new(
                texts,
                config.match_count,
            )?));
        }
    }
    if config.use_qr {
        let extractor = QrCodeExtractor::new(backends.renderer()?);
        splitter.add_identifier(Box::new(QrCodeIdentifier::new(
            config.qr_code.clone(),
            extractor,
        )?));
    }
    if splitter.identifier_count() == 0 {
        return Err(SplitError::Config(
            "no separator detection enabled (text or QR code)".into(),
        ));
    }
    debug!(identifiers = ?splitter.identifier_names(), "Splitter ready");
    Ok(splitter)
}

fn output_directory(config: &SplitConfig, args: &SplitArgs) -> PathBuf {
    args.output_dir
        .clone()
        .or_else(|| config.save_directory.clone())
        .or_else(|| {
            args.input
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(Path::to_path_buf)
        })
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Explicit pattern, then a configured non-default pattern, then
/// `<input name>_{0}.pdf`.
fn output_pattern(config: &SplitConfig, args: &SplitArgs) -> String {
    if let Some(pattern) = &args.pattern {
        return pattern.clone();
    }
    if config.name_pattern != DEFAULT_NAME_PATTERN {
        return config.name_pattern.clone();
    }
    match args.input.file_stem() {
        Some(stem) => format!("{}_{{0}}.pdf", stem.to_string_lossy()),
        None => DEFAULT_NAME_PATTERN.to_string(),
    }
}

fn log_split_event(event: &SplitStatusEvent<'_>) {
    match event.kind {
        SplitEventKind::DocumentFinished => info!(
            documents = event.document_count,
            path = ?event.file,
            "Document written"
        ),
        SplitEventKind::NextPage => debug!(
            page = event.current_page.map(|index| index + 1),
            of = event.page_count,
            "Page added"
        ),
        kind => debug!(%kind, "Split progress"),
    }
}

fn log_filter_event(event: &DocumentFilterEvent) {
    match event.kind {
        FilterEventKind::PageDone => debug!(
            page = event.page_index.map(|index| index + 1),
            of = event.page_count,
            "OCR page done"
        ),
        FilterEventKind::DocumentDone => info!(pages = event.page_count, "OCR text layer added"),
        _ => {}
    }
}
