//! Per-row accumulation of line-item fields.

use rust_decimal::Decimal;

use crate::models::InvoiceItem;

/// Collects the fields of one table row until its total is read.
#[derive(Debug, Clone, Default)]
pub struct RowBuilder {
    row: Option<u32>,
    code: Option<String>,
    description: Option<String>,
    quantity: i64,
    unit_price: Decimal,
}

impl RowBuilder {
    /// Start an empty row.
    pub fn new(row: u32) -> Self {
        Self {
            row: Some(row),
            ..Self::default()
        }
    }

    /// Row index this builder collects, if any.
    pub fn row(&self) -> Option<u32> {
        self.row
    }

    pub fn set_code(&mut self, code: String) {
        self.code = Some(code);
    }

    pub fn set_description(&mut self, description: String) {
        self.description = Some(description);
    }

    pub fn set_quantity(&mut self, quantity: i64) {
        self.quantity = quantity;
    }

    pub fn set_unit_price(&mut self, unit_price: Decimal) {
        self.unit_price = unit_price;
    }

    /// Produce the item, leaving the builder empty for the same row.
    pub fn finish(&mut self, total: Decimal) -> InvoiceItem {
        let row = self.row;
        let taken = std::mem::replace(self, Self { row, ..Self::default() });
        InvoiceItem {
            code: taken.code,
            description: taken.description,
            quantity: taken.quantity,
            unit_price: taken.unit_price,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let mut row = RowBuilder::new(2);
        let item = row.finish(Decimal::TEN);

        assert_eq!(item.code, None);
        assert_eq!(item.description, None);
        assert_eq!(item.quantity, 0);
        assert_eq!(item.unit_price, Decimal::ZERO);
        assert_eq!(item.total, Decimal::TEN);
    }

    #[test]
    fn test_finish_resets_fields_but_keeps_row() {
        let mut row = RowBuilder::new(5);
        row.set_code("A1".to_string());
        row.set_quantity(2);

        let item = row.finish(Decimal::ONE);
        assert_eq!(item.code.as_deref(), Some("A1"));
        assert_eq!(item.quantity, 2);

        assert_eq!(row.row(), Some(5));
        assert_eq!(row.finish(Decimal::ONE).code, None);
    }
}
