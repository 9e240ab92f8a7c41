//! Invoice details table reconstruction.

mod extractor;
mod locator;
mod row;

pub use extractor::{RowExtractor, cell_text, parse_amount, parse_quantity};
pub use locator::find_structured_table;
pub use row::RowBuilder;
