//! Data models: block graph, line items, notifications and configuration.

pub mod block;
pub mod config;
pub mod event;
pub mod item;

pub use block::{Block, BlockIndex, BlockType, EntityType, Relationship, RelationshipType};
pub use config::{
    AnalysisConfig, ColumnLayout, ExtractionConfig, JobConfig, LinexConfig, PublisherConfig,
};
pub use event::{DocumentEvent, DocumentLocation};
pub use item::InvoiceItem;
