//! Asynchronous document analysis jobs.
//!
//! The backend is a Textract-compatible service: a job is started for a
//! stored document, polled until it leaves `IN_PROGRESS`, and its result is
//! then read page by page through a continuation token.

#[cfg(feature = "http")]
pub mod http;
mod orchestrator;
mod recorded;

#[cfg(feature = "http")]
pub use http::TextractHttpBackend;
pub use orchestrator::{AnalysisResult, CancelFlag, JobOrchestrator, JobOutcome};
pub use recorded::RecordedBackend;

use serde::{Deserialize, Serialize};

use crate::error::JobError;
use crate::models::{Block, DocumentLocation};

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, JobError>;

/// Analysis features that can be requested for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureType {
    Tables,
    Forms,
    Queries,
    Signatures,
    Layout,
}

/// Status of an analysis job.
///
/// Unknown statuses are kept verbatim so they can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    InProgress,
    Succeeded,
    Failed,
    PartialSuccess,
    Other(String),
}

impl JobStatus {
    /// Check whether the job is still running.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, JobStatus::InProgress)
    }

    /// Check whether the job finished successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Succeeded)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Failed => "FAILED",
            JobStatus::PartialSuccess => "PARTIAL_SUCCESS",
            JobStatus::Other(s) => s,
        }
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "IN_PROGRESS" => JobStatus::InProgress,
            "SUCCEEDED" => JobStatus::Succeeded,
            "FAILED" => JobStatus::Failed,
            "PARTIAL_SUCCESS" => JobStatus::PartialSuccess,
            _ => JobStatus::Other(s),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One response page of a job status/result query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalysisPage {
    /// Current job status.
    pub job_status: JobStatus,

    /// Blocks on this page. Empty while the job is running.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,

    /// Cursor for the next page, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,

    /// Backend-provided detail for failed jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl AnalysisPage {
    /// A page for a job that is still running.
    pub fn in_progress() -> Self {
        Self::with_status(JobStatus::InProgress)
    }

    /// A final page carrying the given blocks.
    pub fn succeeded(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            ..Self::with_status(JobStatus::Succeeded)
        }
    }

    pub fn with_status(job_status: JobStatus) -> Self {
        Self {
            job_status,
            blocks: Vec::new(),
            next_token: None,
            status_message: None,
        }
    }

    /// Set the continuation token.
    pub fn with_next_token(mut self, token: impl Into<String>) -> Self {
        self.next_token = Some(token.into());
        self
    }
}

/// Trait for document analysis backends.
pub trait AnalysisBackend: Send + Sync {
    /// Start an analysis job for the document and return its identifier.
    fn start_analysis(&self, location: &DocumentLocation, features: &[FeatureType])
    -> Result<String>;

    /// Query job status and results, optionally continuing from a cursor.
    fn get_analysis(&self, job_id: &str, next_token: Option<&str>) -> Result<AnalysisPage>;
}

impl<B: AnalysisBackend + ?Sized> AnalysisBackend for Box<B> {
    fn start_analysis(
        &self,
        location: &DocumentLocation,
        features: &[FeatureType],
    ) -> Result<String> {
        (**self).start_analysis(location, features)
    }

    fn get_analysis(&self, job_id: &str, next_token: Option<&str>) -> Result<AnalysisPage> {
        (**self).get_analysis(job_id, next_token)
    }
}
