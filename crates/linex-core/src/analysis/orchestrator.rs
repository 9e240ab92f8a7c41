//! Job orchestration: submit, wait for a terminal status, collect all pages.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::JobError;
use crate::models::{Block, DocumentLocation, JobConfig};

use super::{AnalysisBackend, AnalysisPage, FeatureType, JobStatus, Result};

/// Longest uninterrupted sleep between cancellation checks.
const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// Shared flag used to stop waiting for a job.
///
/// Cancelling only stops the local wait; the backend job keeps running.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Blocks of a successfully completed job.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Backend job identifier.
    pub job_id: String,
    /// All blocks, in page order then in-page order.
    pub blocks: Vec<Block>,
    /// Number of status checks issued before the job finished.
    pub polls: u32,
    /// Number of result pages read.
    pub pages: u32,
}

/// Terminal outcome of an analysis job.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    /// The job succeeded and all result pages were read.
    Succeeded(AnalysisResult),
    /// The job ended with a non-success status.
    Failed {
        job_id: String,
        status: JobStatus,
        message: Option<String>,
    },
}

/// Drives a single analysis job against a backend.
pub struct JobOrchestrator<B: AnalysisBackend> {
    backend: B,
    config: JobConfig,
    cancel: CancelFlag,
}

impl<B: AnalysisBackend> JobOrchestrator<B> {
    /// Create a new orchestrator.
    pub fn new(backend: B, config: JobConfig) -> Self {
        Self {
            backend,
            config,
            cancel: CancelFlag::new(),
        }
    }

    /// Use an externally owned cancellation flag.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Get the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run a table analysis job for the document to completion.
    pub fn run(&self, location: &DocumentLocation) -> Result<JobOutcome> {
        let job_id = self.submit(location)?;
        let (terminal, polls) = self.wait(&job_id)?;

        if !terminal.job_status.is_success() {
            warn!("Analysis job {} ended with status {}", job_id, terminal.job_status);
            return Ok(JobOutcome::Failed {
                job_id,
                status: terminal.job_status,
                message: terminal.status_message,
            });
        }

        let (blocks, pages) = self.collect_pages(&job_id, terminal)?;
        info!(
            "Analysis job {} returned {} blocks on {} pages",
            job_id,
            blocks.len(),
            pages
        );

        Ok(JobOutcome::Succeeded(AnalysisResult {
            job_id,
            blocks,
            polls,
            pages,
        }))
    }

    /// Submit a table analysis job.
    pub fn submit(&self, location: &DocumentLocation) -> Result<String> {
        let job_id = self
            .backend
            .start_analysis(location, &[FeatureType::Tables])?;
        info!("Started analysis job with ID: {}", job_id);
        Ok(job_id)
    }

    /// Poll until the job leaves `IN_PROGRESS`.
    ///
    /// Returns the terminal response and the number of status checks made.
    pub fn wait(&self, job_id: &str) -> Result<(AnalysisPage, u32)> {
        let started = Instant::now();
        let interval = self.config.poll_interval();
        let timeout = self.config.timeout();
        let mut polls = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(JobError::Cancelled(job_id.to_string()));
            }

            let page = self.backend.get_analysis(job_id, None)?;
            polls += 1;

            if !page.job_status.is_in_progress() {
                debug!("Job {} reached {} after {} polls", job_id, page.job_status, polls);
                return Ok((page, polls));
            }

            let elapsed = started.elapsed();
            if elapsed + interval >= timeout {
                return Err(JobError::Timeout {
                    job_id: job_id.to_string(),
                    polls,
                    elapsed,
                });
            }

            self.sleep(interval);
        }
    }

    /// Sleep for `duration`, waking early once cancelled.
    fn sleep(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        loop {
            let now = Instant::now();
            if now >= deadline || self.cancel.is_cancelled() {
                return;
            }
            std::thread::sleep((deadline - now).min(CANCEL_CHECK_INTERVAL));
        }
    }

    /// Concatenate the blocks of `first` with every following page.
    ///
    /// A continuation token seen twice is a decode error.
    pub fn collect_pages(&self, job_id: &str, first: AnalysisPage) -> Result<(Vec<Block>, u32)> {
        let mut blocks = first.blocks;
        let mut next_token = first.next_token;
        let mut pages = 1u32;
        let mut seen = HashSet::new();

        while let Some(token) = next_token {
            if self.cancel.is_cancelled() {
                return Err(JobError::Cancelled(job_id.to_string()));
            }
            if !seen.insert(token.clone()) {
                return Err(JobError::Decode(format!(
                    "continuation token {token} repeated after {pages} pages"
                )));
            }

            let page = self.backend.get_analysis(job_id, Some(&token))?;
            pages += 1;
            debug!("Page {} of job {}: {} blocks", pages, job_id, page.blocks.len());
            blocks.extend(page.blocks);
            next_token = page.next_token;
        }

        Ok((blocks, pages))
    }
}
