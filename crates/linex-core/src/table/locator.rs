//! Locating the line-item table in a block sequence.

use tracing::debug;

use crate::models::Block;

/// Return the first TABLE block tagged as a structured table.
pub fn find_structured_table(blocks: &[Block]) -> Option<&Block> {
    let mut tables = blocks.iter().filter(|b| b.is_structured_table());
    let first = tables.next()?;

    let others = tables.count();
    if others > 0 {
        debug!("Ignoring {} further structured tables after {}", others, first.id);
    }
    Some(first)
}
