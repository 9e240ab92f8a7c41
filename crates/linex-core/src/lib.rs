//! Core library for invoice line-item extraction.
//!
//! This crate provides:
//! - The block graph model returned by Textract-compatible analysis services
//! - Job orchestration (submit, bounded polling, pagination)
//! - Location and row-wise extraction of the invoice details table
//! - Publishing of extracted items to an SQS-compatible queue

pub mod analysis;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod publish;
pub mod table;

pub use analysis::{AnalysisBackend, CancelFlag, JobOrchestrator, JobOutcome, JobStatus, RecordedBackend};
#[cfg(feature = "http")]
pub use analysis::TextractHttpBackend;
pub use error::{LinexError, Result};
pub use models::{Block, BlockIndex, DocumentEvent, DocumentLocation, InvoiceItem, LinexConfig};
pub use pipeline::{EMPTY_PAYLOAD, InvocationOutcome, InvoicePipeline, extract_line_items};
pub use publish::{MessageSink, Publisher};
#[cfg(feature = "http")]
pub use publish::SqsSink;
pub use table::{RowExtractor, find_structured_table};
