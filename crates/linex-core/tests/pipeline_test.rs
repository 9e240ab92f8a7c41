//! End-to-end tests for the invoice pipeline with in-memory collaborators.

use std::collections::VecDeque;
use std::sync::Mutex;

use linex_core::analysis::{AnalysisPage, FeatureType, JobStatus};
use linex_core::error::{JobError, PublishError};
use linex_core::models::{BlockType, JobConfig};
use linex_core::publish::Result as PublishResult;
use linex_core::{
    AnalysisBackend, Block, DocumentEvent, DocumentLocation, InvocationOutcome, InvoicePipeline,
    JobOrchestrator, MessageSink, Publisher, RowExtractor,
};
use pretty_assertions::assert_eq;

/// Backend answering status polls from a script, then serving result pages.
struct FakeTextract {
    polls: Mutex<VecDeque<AnalysisPage>>,
    pages: Vec<AnalysisPage>,
    started: Mutex<Vec<DocumentLocation>>,
    status_checks: Mutex<u32>,
}

impl FakeTextract {
    /// A job finishing after `in_progress` polls with the given result pages.
    fn finishing_after(in_progress: usize, mut pages: Vec<AnalysisPage>) -> Self {
        let count = pages.len();
        for (i, page) in pages.iter_mut().enumerate() {
            if i + 1 < count {
                page.next_token = Some(format!("token-{}", i + 1));
            }
        }

        let mut polls: VecDeque<AnalysisPage> =
            std::iter::repeat_with(AnalysisPage::in_progress).take(in_progress).collect();
        polls.push_back(pages[0].clone());

        Self {
            polls: Mutex::new(polls),
            pages,
            started: Mutex::new(Vec::new()),
            status_checks: Mutex::new(0),
        }
    }

    fn failing_with(status: JobStatus) -> Self {
        Self {
            polls: Mutex::new(VecDeque::from(vec![AnalysisPage::with_status(status)])),
            pages: Vec::new(),
            started: Mutex::new(Vec::new()),
            status_checks: Mutex::new(0),
        }
    }

    fn status_checks(&self) -> u32 {
        *self.status_checks.lock().unwrap()
    }
}

impl AnalysisBackend for FakeTextract {
    fn start_analysis(
        &self,
        location: &DocumentLocation,
        features: &[FeatureType],
    ) -> Result<String, JobError> {
        assert!(features.contains(&FeatureType::Tables));
        self.started.lock().unwrap().push(location.clone());
        Ok("job-1".to_string())
    }

    fn get_analysis(&self, job_id: &str, next_token: Option<&str>) -> Result<AnalysisPage, JobError> {
        assert_eq!(job_id, "job-1");
        match next_token {
            None => {
                *self.status_checks.lock().unwrap() += 1;
                self.polls
                    .lock()
                    .unwrap()
                    .pop_front()
                    .ok_or_else(|| JobError::Decode("polled after terminal status".to_string()))
            }
            Some(token) => {
                let index: usize = token
                    .trim_start_matches("token-")
                    .parse()
                    .map_err(|_| JobError::Decode(token.to_string()))?;
                Ok(self.pages[index].clone())
            }
        }
    }
}

#[derive(Default)]
struct RecordingSink {
    messages: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl MessageSink for RecordingSink {
    fn send(&self, destination: &str, body: &str) -> PublishResult<()> {
        if self.fail {
            return Err(PublishError::Rejected {
                status: 500,
                body: "queue unavailable".to_string(),
            });
        }
        self.messages
            .lock()
            .unwrap()
            .push((destination.to_string(), body.to_string()));
        Ok(())
    }
}

const QUEUE: &str = "http://localhost:4566/000000000000/invoice-items";

fn pipeline(backend: FakeTextract, sink: RecordingSink) -> InvoicePipeline<FakeTextract, RecordingSink> {
    let config = JobConfig {
        poll_interval_ms: 0,
        timeout_secs: 30,
    };
    InvoicePipeline::new(JobOrchestrator::new(backend, config), RowExtractor::new())
        .with_publisher(Publisher::new(sink, QUEUE))
}

fn event() -> DocumentEvent {
    DocumentEvent::from_json(
        r#"{"Records": [{"s3": {"bucket": {"name": "invoices"}, "object": {"key": "inv-42.pdf"}}}]}"#,
    )
    .unwrap()
}

/// Blocks of a structured table; each row lists its seven column texts.
fn invoice_table(table_id: &str, rows: &[[&str; 7]]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut cells = Vec::new();

    for (r, row) in rows.iter().enumerate() {
        for (c, text) in row.iter().enumerate() {
            let cell_id = format!("{table_id}-r{}c{}", r + 1, c + 1);
            let words: Vec<String> = text
                .split_whitespace()
                .enumerate()
                .map(|(w, word)| {
                    let id = format!("{cell_id}-w{w}");
                    blocks.push(Block::word(&id, word));
                    id
                })
                .collect();
            blocks.push(Block::cell(&cell_id, r as u32 + 1, c as u32 + 1).with_children(words));
            cells.push(cell_id);
        }
    }

    blocks.insert(0, Block::structured_table(table_id).with_children(cells));
    blocks
}

const HEADER: [&str; 7] = ["Code", "Description", "Unit", "Qty", "VAT", "Unit Price", "Amount"];

#[test]
fn test_publishes_extracted_items() {
    let blocks = invoice_table(
        "t1",
        &[
            HEADER,
            ["A1", "Widget", "pcs", "3", "23%", "10.50", "31.50"],
            ["B7", "Copper Cable", "m", "12", "23%", "1,050.00", "12,600.00"],
        ],
    );
    let backend = FakeTextract::finishing_after(2, vec![AnalysisPage::succeeded(blocks)]);
    let pipeline = pipeline(backend, RecordingSink::default());

    let response = pipeline.handle(&event());

    let expected = r#"[{"code":"A1","description":"Widget","quantity":3,"unitPrice":10.5,"total":31.5},{"code":"B7","description":"Copper Cable","quantity":12,"unitPrice":1050.0,"total":12600.0}]"#;
    assert_eq!(response, expected);

    let publisher = pipeline.publisher().unwrap();
    let messages = publisher.sink().messages.lock().unwrap().clone();
    assert_eq!(messages, vec![(QUEUE.to_string(), expected.to_string())]);

    let backend = pipeline.orchestrator().backend();
    assert_eq!(backend.status_checks(), 3);
    assert_eq!(
        backend.started.lock().unwrap().clone(),
        vec![DocumentLocation::new("invoices", "inv-42.pdf")]
    );
}

#[test]
fn test_table_split_across_pages() {
    let mut blocks = invoice_table(
        "t1",
        &[HEADER, ["A1", "Widget", "pcs", "3", "23%", "10.50", "31.50"]],
    );
    // Words of the data row arrive on the second page.
    let second: Vec<Block> = blocks
        .iter()
        .filter(|b| b.block_type == BlockType::Word && b.id.starts_with("t1-r2"))
        .cloned()
        .collect();
    blocks.retain(|b| !(b.block_type == BlockType::Word && b.id.starts_with("t1-r2")));

    let backend = FakeTextract::finishing_after(
        0,
        vec![AnalysisPage::succeeded(blocks), AnalysisPage::succeeded(second)],
    );
    let pipeline = pipeline(backend, RecordingSink::default());

    let outcome = pipeline.process(&event()).unwrap();
    assert_eq!(outcome.items().len(), 1);
    assert_eq!(outcome.items()[0].description.as_deref(), Some("Widget"));
}

#[test]
fn test_only_first_structured_table_is_used() {
    let mut blocks = invoice_table("t1", &[HEADER, ["A1", "Widget", "", "1", "", "1.00", "1.00"]]);
    blocks.extend(invoice_table("t2", &[HEADER, ["Z9", "Other", "", "1", "", "9.00", "9.00"]]));
    let backend = FakeTextract::finishing_after(0, vec![AnalysisPage::succeeded(blocks)]);
    let pipeline = pipeline(backend, RecordingSink::default());

    let outcome = pipeline.process(&event()).unwrap();
    let codes: Vec<_> = outcome.items().iter().map(|i| i.code.clone()).collect();
    assert_eq!(codes, vec![Some("A1".to_string())]);
}

#[test]
fn test_no_structured_table_returns_empty_object() {
    let blocks = vec![
        Block::word("w1", "Thank"),
        Block::word("w2", "you"),
        Block::new("t", BlockType::Table).with_children(["c"]),
    ];
    let backend = FakeTextract::finishing_after(1, vec![AnalysisPage::succeeded(blocks)]);
    let pipeline = pipeline(backend, RecordingSink::default());

    assert_eq!(pipeline.process(&event()).unwrap(), InvocationOutcome::NoTable);
    assert!(pipeline.publisher().unwrap().sink().messages.lock().unwrap().is_empty());
}

#[test]
fn test_no_table_response_is_empty_object() {
    let backend = FakeTextract::finishing_after(0, vec![AnalysisPage::succeeded(Vec::new())]);
    let pipeline = pipeline(backend, RecordingSink::default());

    assert_eq!(pipeline.handle(&event()), "{}");
}

#[test]
fn test_table_without_data_rows_publishes_empty_array() {
    let blocks = invoice_table("t1", &[HEADER]);
    let backend = FakeTextract::finishing_after(0, vec![AnalysisPage::succeeded(blocks)]);
    let pipeline = pipeline(backend, RecordingSink::default());

    assert_eq!(pipeline.handle(&event()), "[]");
    assert_eq!(pipeline.publisher().unwrap().sink().messages.lock().unwrap().len(), 1);
}

#[test]
fn test_failed_job_is_reported() {
    let pipeline = pipeline(FakeTextract::failing_with(JobStatus::Failed), RecordingSink::default());

    assert_eq!(pipeline.handle(&event()), "Analysis job failed with status: FAILED");
    assert!(pipeline.publisher().unwrap().sink().messages.lock().unwrap().is_empty());
}

#[test]
fn test_unknown_failure_status_is_reported_verbatim() {
    let pipeline = pipeline(
        FakeTextract::failing_with(JobStatus::Other("EXPIRED".to_string())),
        RecordingSink::default(),
    );

    assert_eq!(pipeline.handle(&event()), "Analysis job failed with status: EXPIRED");
}

#[test]
fn test_parse_failure_publishes_nothing() {
    let blocks = invoice_table(
        "t1",
        &[
            HEADER,
            ["A1", "Widget", "pcs", "3", "23%", "10.50", "31.50"],
            ["B2", "Bolt", "pcs", "three", "23%", "1.00", "3.00"],
        ],
    );
    let backend = FakeTextract::finishing_after(0, vec![AnalysisPage::succeeded(blocks)]);
    let pipeline = pipeline(backend, RecordingSink::default());

    let response = pipeline.handle(&event());
    assert_eq!(
        response,
        r#"Error processing document: extraction error: failed to parse quantity: "three""#
    );
    assert!(pipeline.publisher().unwrap().sink().messages.lock().unwrap().is_empty());
}

#[test]
fn test_sink_failure_is_reported() {
    let blocks = invoice_table("t1", &[HEADER, ["A1", "Widget", "", "1", "", "1.00", "1.00"]]);
    let backend = FakeTextract::finishing_after(0, vec![AnalysisPage::succeeded(blocks)]);
    let sink = RecordingSink {
        fail: true,
        ..Default::default()
    };
    let pipeline = pipeline(backend, sink);

    assert!(
        pipeline
            .handle(&event())
            .starts_with("Error processing document: publish error: sink rejected message with 500")
    );
}

#[test]
fn test_without_publisher_items_are_returned_unpublished() {
    let blocks = invoice_table("t1", &[HEADER, ["A1", "Widget", "", "1", "", "1.00", "1.00"]]);
    let backend = FakeTextract::finishing_after(0, vec![AnalysisPage::succeeded(blocks)]);
    let config = JobConfig {
        poll_interval_ms: 0,
        timeout_secs: 30,
    };
    let pipeline: InvoicePipeline<FakeTextract, RecordingSink> =
        InvoicePipeline::new(JobOrchestrator::new(backend, config), RowExtractor::new());

    match pipeline.process(&event()).unwrap() {
        InvocationOutcome::Items { items, published, .. } => {
            assert_eq!(items.len(), 1);
            assert!(!published);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}
