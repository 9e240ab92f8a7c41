//! End-to-end handling of one document notification.
//!
//! submit job -> poll -> paginate -> locate table -> extract rows ->
//! serialize -> publish.

use tracing::{error, info};

use crate::Result;
use crate::analysis::{AnalysisBackend, JobOrchestrator, JobOutcome, JobStatus};
use crate::error::ExtractionError;
use crate::models::{Block, DocumentEvent, DocumentLocation, InvoiceItem, LinexConfig};
use crate::publish::{MessageSink, Publisher, serialize_items};
use crate::table::{RowExtractor, find_structured_table};

/// Response returned when no payload is produced.
pub const EMPTY_PAYLOAD: &str = "{}";

/// Result of handling one document.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    /// Line items were extracted and serialized.
    Items {
        payload: String,
        items: Vec<InvoiceItem>,
        /// Whether the payload was handed to the publisher.
        published: bool,
    },
    /// The document has no structured table.
    NoTable,
    /// The items could not be serialized; nothing was published.
    SerializationFailed,
    /// The analysis job ended with a non-success status.
    JobFailed { job_id: String, status: JobStatus },
}

impl InvocationOutcome {
    /// The string returned to synchronous callers.
    pub fn response(&self) -> String {
        match self {
            InvocationOutcome::Items { payload, .. } => payload.clone(),
            InvocationOutcome::NoTable | InvocationOutcome::SerializationFailed => {
                EMPTY_PAYLOAD.to_string()
            }
            InvocationOutcome::JobFailed { status, .. } => {
                format!("Analysis job failed with status: {}", status)
            }
        }
    }

    /// Extracted items, empty unless items were produced.
    pub fn items(&self) -> &[InvoiceItem] {
        match self {
            InvocationOutcome::Items { items, .. } => items,
            _ => &[],
        }
    }
}

/// Locate the details table and extract its rows.
///
/// Returns `None` when the blocks contain no structured table.
pub fn extract_line_items(
    extractor: &RowExtractor,
    blocks: &[Block],
) -> std::result::Result<Option<Vec<InvoiceItem>>, ExtractionError> {
    match find_structured_table(blocks) {
        Some(table) => extractor.extract(table, blocks).map(Some),
        None => Ok(None),
    }
}

/// Invoice line-item pipeline over an analysis backend and a message sink.
pub struct InvoicePipeline<B: AnalysisBackend, S: MessageSink> {
    orchestrator: JobOrchestrator<B>,
    extractor: RowExtractor,
    publisher: Option<Publisher<S>>,
}

impl<B: AnalysisBackend, S: MessageSink> InvoicePipeline<B, S> {
    /// Create a pipeline that does not publish.
    pub fn new(orchestrator: JobOrchestrator<B>, extractor: RowExtractor) -> Self {
        Self {
            orchestrator,
            extractor,
            publisher: None,
        }
    }

    /// Create a pipeline from configuration.
    ///
    /// A publisher is attached when `sink` is given and a queue URL is configured.
    pub fn from_config(backend: B, sink: Option<S>, config: &LinexConfig) -> Self {
        let orchestrator = JobOrchestrator::new(backend, config.job.clone());
        let extractor = RowExtractor::from_config(&config.extraction);
        let pipeline = Self::new(orchestrator, extractor);

        match sink {
            Some(sink) if !config.publisher.queue_url.is_empty() => {
                pipeline.with_publisher(Publisher::new(sink, config.publisher.queue_url.clone()))
            }
            _ => pipeline,
        }
    }

    /// Publish extracted items through `publisher`.
    pub fn with_publisher(mut self, publisher: Publisher<S>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn orchestrator(&self) -> &JobOrchestrator<B> {
        &self.orchestrator
    }

    pub fn publisher(&self) -> Option<&Publisher<S>> {
        self.publisher.as_ref()
    }

    /// Handle a notification and always return a response string.
    pub fn handle(&self, event: &DocumentEvent) -> String {
        match self.process(event) {
            Ok(outcome) => outcome.response(),
            Err(e) => {
                error!("Error processing document: {}", e);
                format!("Error processing document: {}", e)
            }
        }
    }

    /// Handle the first record of a notification.
    pub fn process(&self, event: &DocumentEvent) -> Result<InvocationOutcome> {
        let location = event.location()?;
        self.process_location(&location)
    }

    /// Handle a single stored document.
    pub fn process_location(&self, location: &DocumentLocation) -> Result<InvocationOutcome> {
        info!("Processing file: {} from bucket: {}", location.key, location.bucket);

        let result = match self.orchestrator.run(location)? {
            JobOutcome::Succeeded(result) => result,
            JobOutcome::Failed { job_id, status, .. } => {
                return Ok(InvocationOutcome::JobFailed { job_id, status });
            }
        };

        let Some(items) = extract_line_items(&self.extractor, &result.blocks)? else {
            info!("No details table found");
            return Ok(InvocationOutcome::NoTable);
        };

        let payload = match serialize_items(&items) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Error converting items to JSON: {}", e);
                return Ok(InvocationOutcome::SerializationFailed);
            }
        };

        let published = match &self.publisher {
            Some(publisher) => {
                publisher.publish(&payload)?;
                true
            }
            None => false,
        };

        Ok(InvocationOutcome::Items {
            payload,
            items,
            published,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::RecordedBackend;
    use crate::models::BlockType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_line_items_without_table() {
        let blocks = vec![Block::word("w", "Invoice"), Block::new("t", BlockType::Table)];
        assert_eq!(extract_line_items(&RowExtractor::new(), &blocks).unwrap(), None);
    }

    #[test]
    fn test_extract_line_items_with_empty_table() {
        let blocks = vec![Block::structured_table("t")];
        assert_eq!(
            extract_line_items(&RowExtractor::new(), &blocks).unwrap(),
            Some(Vec::new())
        );
    }

    #[test]
    fn test_outcome_responses() {
        assert_eq!(InvocationOutcome::NoTable.response(), "{}");
        assert_eq!(InvocationOutcome::SerializationFailed.response(), "{}");
        assert_eq!(
            InvocationOutcome::JobFailed {
                job_id: "j".to_string(),
                status: JobStatus::Failed,
            }
            .response(),
            "Analysis job failed with status: FAILED"
        );
        assert!(InvocationOutcome::NoTable.items().is_empty());
    }

    #[test]
    fn test_handle_reports_missing_records() {
        let pipeline: InvoicePipeline<RecordedBackend, Box<dyn MessageSink>> =
            InvoicePipeline::from_config(
                RecordedBackend::from_blocks(Vec::new()),
                None,
                &LinexConfig::default(),
            );

        assert_eq!(
            pipeline.handle(&DocumentEvent::default()),
            "Error processing document: event error: notification contains no records"
        );
    }
}
