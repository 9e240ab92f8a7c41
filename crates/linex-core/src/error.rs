//! Error types for the linex-core library.

use std::time::Duration;

use thiserror::Error;

/// Main error type for the linex library.
#[derive(Error, Debug)]
pub enum LinexError {
    /// Document analysis job error.
    #[error("analysis job error: {0}")]
    Job(#[from] JobError),

    /// Line-item extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Publishing error.
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    /// Invalid document notification.
    #[error("event error: {0}")]
    Event(#[from] EventError),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while submitting, polling or paging an analysis job.
#[derive(Error, Debug)]
pub enum JobError {
    /// The backend could not be reached.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The backend answered with a non-success HTTP status.
    #[error("backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    /// The backend response could not be decoded.
    #[error("failed to decode backend response: {0}")]
    Decode(String),

    /// The job did not reach a terminal status in time.
    #[error("job {job_id} still in progress after {polls} polls ({elapsed:?})")]
    Timeout {
        job_id: String,
        polls: u32,
        elapsed: Duration,
    },

    /// Waiting was cancelled by the caller.
    #[error("wait for job {0} was cancelled")]
    Cancelled(String),
}

/// Errors related to line-item extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// A numeric cell could not be parsed.
    #[error("failed to parse {field}: {value:?}")]
    Parse { field: String, value: String },
}

/// Errors raised when handing a payload to the sink.
#[derive(Error, Debug)]
pub enum PublishError {
    /// The sink could not be reached.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The sink refused the message.
    #[error("sink rejected message with {status}: {body}")]
    Rejected { status: u16, body: String },

    /// No destination is configured.
    #[error("no destination configured")]
    NoDestination,
}

/// Errors related to the incoming document notification.
#[derive(Error, Debug)]
pub enum EventError {
    /// The notification carries no records.
    #[error("notification contains no records")]
    NoRecords,

    /// The notification could not be decoded.
    #[error("failed to decode notification: {0}")]
    Decode(String),
}

/// Result type for the linex library.
pub type Result<T> = std::result::Result<T, LinexError>;
