//! Document-ready notifications.
//!
//! The wire form is the storage notification batch
//! `{"Records": [{"s3": {"bucket": {"name": ..}, "object": {"key": ..}}}]}`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EventError;

/// Location of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLocation {
    /// Bucket/container name.
    pub bucket: String,
    /// Object key within the bucket.
    pub key: String,
}

impl DocumentLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for DocumentLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// A batch of document-ready notifications.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    pub s3: StorageEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageEntity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectEntity {
    pub key: String,
}

impl DocumentEvent {
    /// Parse a notification batch from JSON.
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        serde_json::from_str(json).map_err(|e| EventError::Decode(e.to_string()))
    }

    /// Build a single-record batch for the given location.
    pub fn for_location(location: &DocumentLocation) -> Self {
        Self {
            records: vec![EventRecord {
                s3: StorageEntity {
                    bucket: BucketEntity {
                        name: location.bucket.clone(),
                    },
                    object: ObjectEntity {
                        key: location.key.clone(),
                    },
                },
            }],
        }
    }

    /// Location of the first record. Later records are ignored.
    pub fn location(&self) -> Result<DocumentLocation, EventError> {
        let first = self.records.first().ok_or(EventError::NoRecords)?;
        if self.records.len() > 1 {
            debug!("Ignoring {} additional notification records", self.records.len() - 1);
        }
        Ok(DocumentLocation::new(
            first.s3.bucket.name.clone(),
            first.s3.object.key.clone(),
        ))
    }
}
