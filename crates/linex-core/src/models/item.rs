//! Invoice line-item record produced by the row extractor.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single line item read from the invoice details table.
///
/// Serializes as `{code, description, quantity, unitPrice, total}` with
/// decimals written as JSON numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    /// Product code (column 1). `None` if the row committed before it was set.
    pub code: Option<String>,

    /// Product/service description (column 2).
    pub description: Option<String>,

    /// Quantity (column 4), zero when the cell is empty.
    pub quantity: i64,

    /// Unit price (column 6), zero when the cell is empty.
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,

    /// Line total (column 7).
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

impl InvoiceItem {
    /// Check whether quantity times unit price matches the line total.
    ///
    /// Only meaningful when all three values were present on the invoice.
    /// A product that overflows is inconsistent.
    pub fn is_consistent(&self) -> bool {
        Decimal::from(self.quantity).checked_mul(self.unit_price) == Some(self.total)
    }
}
