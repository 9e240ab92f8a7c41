//! Line-item extraction from a located table.
//!
//! Cells are visited in backend order and dispatched by column index, with
//! one builder per row index, so cells of different rows may interleave.
//! Rows up to `header_rows` are skipped, a row with an empty code cell is
//! skipped entirely, and a non-empty total cell commits the row. Within a
//! row, fields arriving after its total are ignored.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::ExtractionError;
use crate::models::{Block, BlockIndex, BlockType, ColumnLayout, ExtractionConfig, InvoiceItem};

use super::row::RowBuilder;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Turns the rows of an invoice details table into line items.
#[derive(Debug, Clone)]
pub struct RowExtractor {
    header_rows: u32,
    columns: ColumnLayout,
}

impl Default for RowExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RowExtractor {
    /// Create an extractor for the standard invoice layout.
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    /// Create an extractor from configuration.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            header_rows: config.header_rows,
            columns: config.columns,
        }
    }

    /// Set the number of header rows.
    pub fn with_header_rows(mut self, header_rows: u32) -> Self {
        self.header_rows = header_rows;
        self
    }

    /// Set the column layout.
    pub fn with_columns(mut self, columns: ColumnLayout) -> Self {
        self.columns = columns;
        self
    }

    /// Extract the line items of `table`, resolving blocks from `blocks`.
    pub fn extract(&self, table: &Block, blocks: &[Block]) -> Result<Vec<InvoiceItem>> {
        let index = BlockIndex::new(blocks);
        self.extract_indexed(table, &index)
    }

    /// Extract the line items of `table` using a prebuilt index.
    pub fn extract_indexed<'a>(
        &self,
        table: &'a Block,
        index: &BlockIndex<'a>,
    ) -> Result<Vec<InvoiceItem>> {
        info!("Processing table: {}", table.id);

        let cells: Vec<&Block> = index.children_of_type(table, BlockType::Cell).collect();
        debug!("Table {} has {} cells", table.id, cells.len());

        let mut items = Vec::new();
        let mut skipped: HashSet<u32> = HashSet::new();
        let mut rows: HashMap<u32, RowBuilder> = HashMap::new();

        for cell in cells {
            let (Some(row_index), Some(column)) = (cell.row_index, cell.column_index) else {
                continue;
            };
            if row_index <= self.header_rows || skipped.contains(&row_index) {
                continue;
            }

            let text = cell_text(cell, index);
            let columns = &self.columns;

            if column == columns.code && text.is_empty() {
                debug!("Row {} has no code, skipping", row_index);
                skipped.insert(row_index);
                rows.remove(&row_index);
                continue;
            }

            let row = rows
                .entry(row_index)
                .or_insert_with(|| RowBuilder::new(row_index));

            if column == columns.code {
                row.set_code(text);
            } else if column == columns.description {
                row.set_description(text);
            } else if column == columns.quantity && !text.is_empty() {
                row.set_quantity(parse_quantity(&text)?);
            } else if column == columns.unit_price && !text.is_empty() {
                row.set_unit_price(parse_amount("unit price", &text)?);
            } else if column == columns.total && !text.is_empty() {
                let total = parse_amount("total", &text)?;
                items.push(row.finish(total));
                skipped.insert(row_index);
                rows.remove(&row_index);
            }
        }

        if !rows.is_empty() {
            debug!("{} rows ended without a total", rows.len());
        }

        info!("Found {} invoice items", items.len());
        Ok(items)
    }
}

/// Text of a cell: its child words joined by single spaces.
pub fn cell_text<'a>(cell: &'a Block, index: &BlockIndex<'a>) -> String {
    let words: Vec<&str> = index
        .children_of_type(cell, BlockType::Word)
        .map(|word| word.text.as_deref().unwrap_or_default())
        .collect();
    words.join(" ").trim().to_string()
}

/// Parse an integer quantity.
pub fn parse_quantity(text: &str) -> Result<i64> {
    text.parse::<i64>().map_err(|_| ExtractionError::Parse {
        field: "quantity".to_string(),
        value: text.to_string(),
    })
}

/// Parse a decimal amount, ignoring thousands-separator commas.
pub fn parse_amount(field: &str, text: &str) -> Result<Decimal> {
    let cleaned = text.replace(',', "");
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| ExtractionError::Parse {
            field: field.to_string(),
            value: text.to_string(),
        })
}
