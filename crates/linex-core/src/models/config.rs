//! Configuration structures for the extraction pipeline.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LinexError, Result};

/// Main configuration for the linex pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinexConfig {
    /// Document analysis backend configuration.
    pub analysis: AnalysisConfig,

    /// Job polling configuration.
    pub job: JobConfig,

    /// Publisher configuration.
    pub publisher: PublisherConfig,

    /// Line-item extraction configuration.
    pub extraction: ExtractionConfig,
}

/// Document analysis backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Endpoint of the Textract-compatible API.
    pub endpoint: String,

    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4566".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Job polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Wait between status checks in milliseconds.
    pub poll_interval_ms: u64,

    /// Give up waiting for a terminal status after this many seconds.
    pub timeout_secs: u64,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            timeout_secs: 300,
        }
    }
}

impl JobConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Publisher configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Destination queue URL. Empty means "do not publish".
    pub queue_url: String,

    /// Endpoint of the SQS-compatible API. Defaults to the queue URL itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Line-item extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Number of leading rows treated as headers.
    pub header_rows: u32,

    /// Column positions of the invoice fields.
    pub columns: ColumnLayout,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            header_rows: 1,
            columns: ColumnLayout::default(),
        }
    }
}

/// 1-based column positions of the line-item fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    pub code: u32,
    pub description: u32,
    pub quantity: u32,
    pub unit_price: u32,
    pub total: u32,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        // Columns 3 and 5 carry unit of measure and tax, which are not extracted.
        Self {
            code: 1,
            description: 2,
            quantity: 4,
            unit_price: 6,
            total: 7,
        }
    }
}

impl LinexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| LinexError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
