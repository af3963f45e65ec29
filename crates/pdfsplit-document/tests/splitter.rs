// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end splitting of synthetic documents.

mod common;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use common::{SEPARATOR, document, page_texts};
use pdfsplit_core::error::{Result, SplitError};
use pdfsplit_core::types::SplitEventKind;
use pdfsplit_document::pdf::document::PdfDocument;
use pdfsplit_document::pdf::page::PdfPage;
use pdfsplit_document::split::{
    OutputTarget, SmartSplitter, SplitDocument, SplitPageIdentifier, SplitStatusEvent,
    TextSplitIdentifier,
};

fn text_splitter() -> SmartSplitter {
    let mut splitter = SmartSplitter::new();
    splitter.add_identifier(Box::new(
        TextSplitIdentifier::single(SEPARATOR).expect("identifier"),
    ));
    splitter
}

fn texts(outputs: &[SplitDocument]) -> Vec<Vec<String>> {
    outputs
        .iter()
        .map(|output| page_texts(&output.document))
        .collect()
}

/// Records the pages it is asked about and answers with a fixed result.
struct Recorder {
    seen: Arc<Mutex<Vec<usize>>>,
    answer: fn(usize) -> Result<bool>,
}

impl SplitPageIdentifier for Recorder {
    fn is_split_page(
        &mut self,
        _document: &PdfDocument,
        _page: &PdfPage,
        page_index: usize,
    ) -> Result<bool> {
        self.seen.lock().unwrap().push(page_index);
        (self.answer)(page_index)
    }

    fn name(&self) -> &str {
        "recorder"
    }
}

#[test]
fn no_separator_yields_one_copy() {
    let source = document(&["Page A", "Page B", "Page C"]);
    let mut splitter = text_splitter();
    let outputs = splitter.split(&source).expect("split");

    assert_eq!(texts(&outputs), vec![vec!["Page A", "Page B", "Page C"]]);
    assert_eq!(splitter.target_documents_count(), 1);
    assert!(outputs[0].path.is_none());
}

#[test]
fn separators_between_content_split_and_are_dropped() {
    let source = document(&[
        "Page A", "Page B", SEPARATOR, "Page C", "Page D", SEPARATOR, "Page E",
    ]);
    let outputs = text_splitter().split(&source).expect("split");
    assert_eq!(
        texts(&outputs),
        vec![
            vec!["Page A", "Page B"],
            vec!["Page C", "Page D"],
            vec!["Page E"],
        ]
    );
}

#[test]
fn splitting_twice_gives_identical_documents() {
    let source = document(&[
        "Page A", SEPARATOR, "Page B", "Page C", SEPARATOR, SEPARATOR, "Page D",
    ]);
    let mut splitter = text_splitter();
    let first = splitter.split(&source).expect("first split");
    let first_count = splitter.target_documents_count();
    let second = splitter.split(&source).expect("second split");

    assert_eq!(texts(&first), texts(&second));
    assert_eq!(
        texts(&second),
        vec![vec!["Page A"], vec!["Page B", "Page C"], vec!["Page D"]]
    );
    assert_eq!(first_count, 3);
    assert_eq!(splitter.target_documents_count(), first_count);
    assert_eq!(source.page_count(), 7);
}

#[test]
fn trailing_separator_opens_no_document() {
    let source = document(&[
        "Page A", "Page B", SEPARATOR, "Page C", "Page D", SEPARATOR,
    ]);
    let outputs = text_splitter().split(&source).expect("split");
    assert_eq!(
        texts(&outputs),
        vec![vec!["Page A", "Page B"], vec!["Page C", "Page D"]]
    );
}

#[test]
fn consecutive_and_leading_separators_produce_no_empty_documents() {
    let source = document(&[SEPARATOR, SEPARATOR, "Page A", SEPARATOR, SEPARATOR, "Page B"]);
    let outputs = text_splitter().split(&source).expect("split");
    assert_eq!(texts(&outputs), vec![vec!["Page A"], vec!["Page B"]]);
}

#[test]
fn only_separators_yields_nothing() {
    let source = document(&[SEPARATOR, SEPARATOR, SEPARATOR]);
    let mut splitter = text_splitter();
    assert!(splitter.split(&source).expect("split").is_empty());
    assert_eq!(splitter.target_documents_count(), 0);
}

#[test]
fn separator_text_may_be_part_of_a_longer_page() {
    let source = document(&[
        "Page A",
        "Batch 12\n===SPLIT===\nplease remove",
        "Page B",
    ]);
    let outputs = text_splitter().split(&source).expect("split");
    assert_eq!(texts(&outputs), vec![vec!["Page A"], vec!["Page B"]]);
}

#[test]
fn required_count_is_a_quorum() {
    let source = document(&["Page A", "FOO only", "FOO\nBAR", "Page B"]);
    let mut splitter = SmartSplitter::new();
    splitter.add_identifier(Box::new(
        TextSplitIdentifier::new(["FOO", "BAR", "BAZ"], 2).expect("identifier"),
    ));
    let outputs = splitter.split(&source).expect("split");
    assert_eq!(
        texts(&outputs),
        vec![vec!["Page A", "FOO only"], vec!["Page B"]]
    );
}

#[test]
fn output_keeps_source_attributes() {
    let source = document(&["Page A", SEPARATOR, "Page B"]);
    let outputs = text_splitter().split(&source).expect("split");
    for output in &outputs {
        assert_eq!(output.document.version(), "1.7");
        assert_eq!(output.document.info_value("Title").as_deref(), Some("Scan batch"));
        assert_eq!(output.document.page(0).expect("page").height(), 792.0);
    }
}

#[test]
fn first_identifier_to_match_wins() {
    let source = document(&["Page A", SEPARATOR, "Page B"]);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut splitter = text_splitter();
    splitter.add_identifier(Box::new(Recorder {
        seen: Arc::clone(&seen),
        answer: |_| Ok(false),
    }));
    assert_eq!(splitter.identifier_names(), vec!["text", "recorder"]);

    let outputs = splitter.split(&source).expect("split");
    assert_eq!(outputs.len(), 2);
    assert_eq!(*seen.lock().unwrap(), vec![0, 2]);
}

#[test]
fn identifier_errors_count_as_content() {
    let source = document(&["Page A", SEPARATOR, "Page B"]);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut splitter = SmartSplitter::new();
    splitter.add_identifier(Box::new(Recorder {
        seen: Arc::clone(&seen),
        answer: |_| Err(SplitError::Render("renderer unavailable".into())),
    }));
    let outputs = splitter.split(&source).expect("split");
    assert_eq!(texts(&outputs), vec![vec!["Page A", SEPARATOR, "Page B"]]);

    // Later identifiers still get their say.
    splitter.add_identifier(Box::new(
        TextSplitIdentifier::single(SEPARATOR).expect("identifier"),
    ));
    let outputs = splitter.split(&source).expect("split");
    assert_eq!(outputs.len(), 2);
    assert_eq!(seen.lock().unwrap().len(), 6);
}

#[test]
fn removed_identifier_is_no_longer_consulted() {
    let source = document(&["Page A", SEPARATOR, "Page B"]);
    let mut splitter = text_splitter();
    assert!(splitter.remove_identifier(3).is_none());
    let removed = splitter.remove_identifier(0).expect("removed");
    assert_eq!(removed.name(), "text");
    assert_eq!(splitter.identifier_count(), 0);
    assert_eq!(splitter.split(&source).expect("split").len(), 1);
}

#[test]
fn page_range_limits_processed_pages() {
    let source = document(&["Page A", "Page B", SEPARATOR, "Page C", "Page D"]);
    let mut splitter = text_splitter();
    splitter.set_page_range(1, 4).expect("range");
    let outputs = splitter.split(&source).expect("split");
    assert_eq!(texts(&outputs), vec![vec!["Page B"], vec!["Page C"]]);

    // An end beyond the document is clamped.
    splitter.set_page_range(3, 100).expect("range");
    let outputs = splitter.split(&source).expect("split");
    assert_eq!(texts(&outputs), vec![vec!["Page C", "Page D"]]);
}

type Recorded = (SplitEventKind, Option<usize>, usize, Option<PathBuf>);

fn record_events(splitter: &mut SmartSplitter) -> Arc<Mutex<Vec<Recorded>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    splitter.add_listener(move |event: &SplitStatusEvent<'_>| {
        sink.lock().unwrap().push((
            event.kind,
            event.current_page,
            event.document_count,
            event.file.map(PathBuf::from),
        ));
    });
    events
}

#[test]
fn events_follow_the_page_walk() {
    let source = document(&["Page A", SEPARATOR, "Page B"]);
    let mut splitter = text_splitter();
    let events = record_events(&mut splitter);
    splitter.split(&source).expect("split");

    use SplitEventKind::*;
    let kinds: Vec<(SplitEventKind, Option<usize>, usize)> = events
        .lock()
        .unwrap()
        .iter()
        .map(|(kind, page, count, _)| (*kind, *page, *count))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (SplittingStarted, None, 0),
            (NewDocument, Some(0), 0),
            (NextPage, Some(0), 0),
            (DocumentFinished, Some(1), 1),
            (NewDocument, Some(2), 1),
            (NextPage, Some(2), 1),
            (DocumentFinished, Some(2), 2),
            (SplittingFinished, Some(2), 2),
        ]
    );
}

#[test]
fn document_count_never_decreases() {
    let source = document(&[
        "Page A", SEPARATOR, "Page B", "Page C", SEPARATOR, SEPARATOR, "Page D",
    ]);
    let mut splitter = text_splitter();
    let events = record_events(&mut splitter);
    let outputs = splitter.split(&source).expect("split");

    let events = events.lock().unwrap();
    let counts: Vec<usize> = events.iter().map(|(_, _, count, _)| *count).collect();
    assert!(counts.windows(2).all(|pair| pair[0] <= pair[1]), "{counts:?}");
    let finished = events
        .iter()
        .filter(|(kind, ..)| *kind == SplitEventKind::DocumentFinished)
        .count();
    assert_eq!(finished, outputs.len());
}

#[test]
fn removed_listener_gets_no_events() {
    let source = document(&["Page A"]);
    let mut splitter = text_splitter();
    let events = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&events);
    let id = splitter.add_listener(move |_: &SplitStatusEvent<'_>| {
        *sink.lock().unwrap() += 1;
    });
    assert_eq!(splitter.listener_ids(), vec![id]);
    assert!(splitter.remove_listener(id));
    splitter.split(&source).expect("split");
    assert_eq!(*events.lock().unwrap(), 0);
}

#[test]
fn abort_stops_before_the_next_page_and_finishes_open_document() {
    let source = document(&["Page A", "Page B", SEPARATOR, "Page C"]);
    let mut splitter = text_splitter();
    let abort = splitter.abort_handle();
    splitter.add_listener(move |event: &SplitStatusEvent<'_>| {
        if event.kind == SplitEventKind::NextPage {
            abort.abort();
        }
    });
    let events = record_events(&mut splitter);

    let outputs = splitter.split(&source).expect("split");
    assert_eq!(texts(&outputs), vec![vec!["Page A"]]);
    let last = events.lock().unwrap().last().map(|(kind, ..)| *kind);
    assert_eq!(last, Some(SplitEventKind::SplittingFinished));

    // The flag stays set until the next run starts.
    assert!(splitter.abort_handle().is_aborted());
}

#[test]
fn outputs_are_written_to_numbered_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = document(&["Page A", SEPARATOR, "Page B", "Page C"]);
    let mut splitter = text_splitter();
    splitter.set_output_target(Some(OutputTarget::with_pattern(dir.path(), "part_{0}.pdf")));
    let events = record_events(&mut splitter);

    let outputs = splitter.split(&source).expect("split");
    let paths: Vec<PathBuf> = outputs
        .iter()
        .map(|output| output.path.clone().expect("path"))
        .collect();
    assert_eq!(
        paths,
        vec![dir.path().join("part_0.pdf"), dir.path().join("part_1.pdf")]
    );

    let reopened = PdfDocument::open(&paths[1]).expect("open");
    assert_eq!(page_texts(&reopened), vec!["Page B", "Page C"]);

    let finished_files: Vec<PathBuf> = events
        .lock()
        .unwrap()
        .iter()
        .filter(|(kind, ..)| *kind == SplitEventKind::DocumentFinished)
        .map(|(.., file)| file.clone().expect("file"))
        .collect();
    assert_eq!(finished_files, paths);
}

#[test]
fn existing_output_files_are_not_overwritten() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("part_0.pdf"), b"previous run").expect("seed");
    let source = document(&["Page A"]);
    let mut splitter = text_splitter();
    splitter.set_output_target(Some(OutputTarget::with_pattern(dir.path(), "part_{0}.pdf")));

    let outputs = splitter.split(&source).expect("split");
    assert_eq!(outputs[0].path.as_deref(), Some(dir.path().join("part_1.pdf").as_path()));
    assert_eq!(
        std::fs::read(dir.path().join("part_0.pdf")).expect("read"),
        b"previous run"
    );
}

#[test]
fn split_does_not_modify_the_source() {
    let source = document(&["Page A", SEPARATOR, "Page B"]);
    let revision = source.revision();
    text_splitter().split(&source).expect("split");
    assert_eq!(source.page_count(), 3);
    assert_eq!(source.revision(), revision);
}
