//! Block graph returned by the document analysis backend.
//!
//! Blocks arrive as a flat list and reference each other by identifier
//! through typed relationships. The wire form follows the Textract JSON
//! layout (`Id`, `BlockType`, `Relationships`, ...).

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Kind of a detected document element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    Page,
    Line,
    Word,
    Table,
    Cell,
    MergedCell,
    KeyValueSet,
    SelectionElement,
    /// Any block type this crate does not interpret.
    #[serde(other)]
    Other,
}

/// Classification tag attached to a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    /// Table with a regular row/column grid.
    StructuredTable,
    /// Free-form table without a regular grid.
    SemiStructuredTable,
    ColumnHeader,
    TableTitle,
    TableFooter,
    TableSummary,
    TableSectionTitle,
    Key,
    Value,
    #[serde(other)]
    Other,
}

/// Kind of edge between two blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    Child,
    Value,
    ComplexFeatures,
    MergedCell,
    Title,
    Answer,
    Table,
    TableTitle,
    TableFooter,
    #[serde(other)]
    Other,
}

/// A typed edge from one block to an ordered list of other blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Relationship {
    /// Edge type.
    #[serde(rename = "Type")]
    pub kind: RelationshipType,

    /// Target block identifiers, in backend order.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub ids: Vec<String>,
}

/// A detected document element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Block {
    /// Unique identifier.
    pub id: String,

    /// Element kind.
    pub block_type: BlockType,

    /// Classification tags.
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub entity_types: Vec<EntityType>,

    /// Row index for table cells (1-based).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_index: Option<u32>,

    /// Column index for table cells (1-based).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_index: Option<u32>,

    /// Recognized text, present on words and lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Edges to other blocks.
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub relationships: Vec<Relationship>,

    /// Page the block was found on (1-based).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Block {
    /// Create a bare block of the given type.
    pub fn new(id: impl Into<String>, block_type: BlockType) -> Self {
        Self {
            id: id.into(),
            block_type,
            entity_types: Vec::new(),
            row_index: None,
            column_index: None,
            text: None,
            relationships: Vec::new(),
            page: None,
        }
    }

    /// Create a word block.
    pub fn word(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, BlockType::Word).with_text(text)
    }

    /// Create a table cell at the given (1-based) position.
    pub fn cell(id: impl Into<String>, row: u32, column: u32) -> Self {
        let mut block = Self::new(id, BlockType::Cell);
        block.row_index = Some(row);
        block.column_index = Some(column);
        block
    }

    /// Create a table block tagged as a structured table.
    pub fn structured_table(id: impl Into<String>) -> Self {
        Self::new(id, BlockType::Table).with_entity_type(EntityType::StructuredTable)
    }

    /// Set the text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Add a classification tag.
    pub fn with_entity_type(mut self, entity_type: EntityType) -> Self {
        self.entity_types.push(entity_type);
        self
    }

    /// Add a CHILD relationship to the given blocks.
    pub fn with_children<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relationships.push(Relationship {
            kind: RelationshipType::Child,
            ids: ids.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Identifiers reachable through CHILD relationships, in order.
    pub fn child_ids(&self) -> impl Iterator<Item = &str> {
        self.relationships
            .iter()
            .filter(|r| r.kind == RelationshipType::Child)
            .flat_map(|r| r.ids.iter().map(String::as_str))
    }

    /// Check whether the block carries the given tag.
    pub fn has_entity_type(&self, entity_type: EntityType) -> bool {
        self.entity_types.contains(&entity_type)
    }

    /// Check whether this is a table classified as a structured table.
    pub fn is_structured_table(&self) -> bool {
        self.block_type == BlockType::Table && self.has_entity_type(EntityType::StructuredTable)
    }
}

/// Identifier lookup over a block sequence, built once per document.
///
/// When an identifier occurs more than once the first block wins.
#[derive(Debug)]
pub struct BlockIndex<'a> {
    by_id: HashMap<&'a str, &'a Block>,
}

impl<'a> BlockIndex<'a> {
    /// Build the index.
    pub fn new(blocks: &'a [Block]) -> Self {
        let mut by_id = HashMap::with_capacity(blocks.len());
        for block in blocks {
            by_id.entry(block.id.as_str()).or_insert(block);
        }
        Self { by_id }
    }

    /// Look up a block by identifier.
    pub fn get(&self, id: &str) -> Option<&'a Block> {
        self.by_id.get(id).copied()
    }

    /// Number of distinct identifiers.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Resolve the CHILD relationships of `parent` to blocks of the given type.
    ///
    /// Dangling identifiers are skipped.
    pub fn children_of_type(
        &self,
        parent: &'a Block,
        block_type: BlockType,
    ) -> impl Iterator<Item = &'a Block> + '_ {
        parent.child_ids().filter_map(move |id| match self.get(id) {
            Some(block) => Some(block).filter(|b| b.block_type == block_type),
            None => {
                debug!("Block {} references unknown child {}", parent.id, id);
                None
            }
        })
    }
}
