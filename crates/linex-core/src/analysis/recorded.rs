//! Backend replaying a saved analysis result.
//!
//! Accepts the three shapes analysis results are usually saved in: a single
//! response page, an array of response pages, or a bare array of blocks.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::JobError;
use crate::models::{Block, DocumentLocation};

use super::{AnalysisBackend, AnalysisPage, FeatureType, Result};

const RECORDED_JOB_ID: &str = "recorded";

#[derive(Deserialize)]
#[serde(untagged)]
enum SavedAnalysis {
    Pages(Vec<AnalysisPage>),
    Blocks(Vec<Block>),
    Page(AnalysisPage),
}

/// Analysis backend serving pre-recorded result pages.
#[derive(Debug, Clone)]
pub struct RecordedBackend {
    pages: Vec<AnalysisPage>,
    by_token: HashMap<String, usize>,
}

impl RecordedBackend {
    /// Create a backend from result pages, chaining them with tokens.
    ///
    /// Existing `NextToken` values are kept; missing ones are generated so
    /// that every page leads to the following one.
    pub fn new(mut pages: Vec<AnalysisPage>) -> Self {
        if pages.is_empty() {
            pages.push(AnalysisPage::succeeded(Vec::new()));
        }

        let mut by_token = HashMap::new();
        let last = pages.len() - 1;
        for (i, page) in pages.iter_mut().enumerate() {
            if i == last {
                page.next_token = None;
            } else {
                let token = page
                    .next_token
                    .get_or_insert_with(|| format!("page-{}", i + 1))
                    .clone();
                by_token.insert(token, i + 1);
            }
        }

        Self { pages, by_token }
    }

    /// Create a backend serving a single page with the given blocks.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self::new(vec![AnalysisPage::succeeded(blocks)])
    }

    /// Parse a saved analysis result.
    ///
    /// A recording whose first page is still `IN_PROGRESS` is rejected, since
    /// replaying it would never reach a terminal status.
    pub fn from_json(json: &str) -> Result<Self> {
        let saved: SavedAnalysis =
            serde_json::from_str(json).map_err(|e| JobError::Decode(e.to_string()))?;

        let backend = match saved {
            SavedAnalysis::Pages(pages) => Self::new(pages),
            SavedAnalysis::Blocks(blocks) => Self::from_blocks(blocks),
            SavedAnalysis::Page(page) => Self::new(vec![page]),
        };

        if backend.pages[0].job_status.is_in_progress() {
            return Err(JobError::Decode("recording is not terminal".to_string()));
        }
        Ok(backend)
    }

    /// Load a saved analysis result from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| JobError::Transport(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Number of recorded pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

impl AnalysisBackend for RecordedBackend {
    fn start_analysis(&self, location: &DocumentLocation, _features: &[FeatureType]) -> Result<String> {
        debug!("Replaying recorded analysis for {}", location);
        Ok(RECORDED_JOB_ID.to_string())
    }

    fn get_analysis(&self, _job_id: &str, next_token: Option<&str>) -> Result<AnalysisPage> {
        let index = match next_token {
            None => 0,
            Some(token) => *self.by_token.get(token).ok_or_else(|| JobError::Backend {
                status: 400,
                body: format!("unknown continuation token {token}"),
            })?,
        };
        Ok(self.pages[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{JobOrchestrator, JobOutcome, JobStatus};
    use crate::models::JobConfig;
    use pretty_assertions::assert_eq;

    fn replay(backend: RecordedBackend) -> JobOutcome {
        let config = JobConfig {
            poll_interval_ms: 0,
            timeout_secs: 1,
        };
        JobOrchestrator::new(backend, config)
            .run(&DocumentLocation::new("local", "saved.json"))
            .unwrap()
    }

    fn block_ids(outcome: JobOutcome) -> Vec<String> {
        match outcome {
            JobOutcome::Succeeded(result) => result.blocks.into_iter().map(|b| b.id).collect(),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_bare_block_array() {
        let backend = RecordedBackend::from_json(
            r#"[{"BlockType": "WORD", "Id": "a", "Text": "x"}, {"BlockType": "WORD", "Id": "b", "Text": "y"}]"#,
        )
        .unwrap();

        assert_eq!(backend.page_count(), 1);
        assert_eq!(block_ids(replay(backend)), vec!["a", "b"]);
    }

    #[test]
    fn test_page_array_is_chained() {
        let backend = RecordedBackend::from_json(
            r#"[
                {"JobStatus": "SUCCEEDED", "Blocks": [{"BlockType": "WORD", "Id": "a"}]},
                {"JobStatus": "SUCCEEDED", "NextToken": "ignored-on-last", "Blocks": [{"BlockType": "WORD", "Id": "b"}]}
            ]"#,
        )
        .unwrap();

        assert_eq!(backend.page_count(), 2);
        assert_eq!(block_ids(replay(backend)), vec!["a", "b"]);
    }

    #[test]
    fn test_existing_tokens_are_kept() {
        let pages = vec![
            AnalysisPage::succeeded(vec![Block::word("a", "1")]).with_next_token("tok-xyz"),
            AnalysisPage::succeeded(vec![Block::word("b", "2")]),
        ];
        let backend = RecordedBackend::new(pages);

        let second = backend.get_analysis(RECORDED_JOB_ID, Some("tok-xyz")).unwrap();
        assert_eq!(second.blocks[0].id, "b");
        assert!(matches!(
            backend.get_analysis(RECORDED_JOB_ID, Some("nope")),
            Err(JobError::Backend { status: 400, .. })
        ));
    }

    #[test]
    fn test_single_failed_page() {
        let backend = RecordedBackend::from_json(
            r#"{"JobStatus": "FAILED", "StatusMessage": "bad input"}"#,
        )
        .unwrap();

        assert!(matches!(
            replay(backend),
            JobOutcome::Failed { status: JobStatus::Failed, .. }
        ));
    }

    #[test]
    fn test_empty_array() {
        let backend = RecordedBackend::from_json("[]").unwrap();
        assert!(block_ids(replay(backend)).is_empty());
    }

    #[test]
    fn test_in_progress_recording_is_rejected() {
        for json in [
            r#"{"JobStatus": "IN_PROGRESS"}"#,
            r#"[{"JobStatus": "IN_PROGRESS"}, {"JobStatus": "SUCCEEDED"}]"#,
        ] {
            match RecordedBackend::from_json(json) {
                Err(JobError::Decode(message)) => assert_eq!(message, "recording is not terminal"),
                other => panic!("expected decode error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            RecordedBackend::from_json("{not json"),
            Err(JobError::Decode(_))
        ));
    }
}
