//! Projection of order items to the join-ready shape.

use sales_core::{Result, Table};

use crate::constants::ITEM_COLUMNS;

/// Keep `order_id`, `product_id`, `seller_id` and `price`, dropping the
/// shipping and freight columns. Row order is preserved.
pub fn project_items(items: &Table) -> Result<Table> {
    items.project("items", &ITEM_COLUMNS)
}
