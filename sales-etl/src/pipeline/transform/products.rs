//! Projection of the product catalog to the join-ready shape.

use sales_core::{Result, Table};

use crate::constants::PRODUCT_COLUMNS;

/// Keep `product_id` and `product_category_name`. Row order is preserved
/// and category nulls pass through untouched.
pub fn project_products(products: &Table) -> Result<Table> {
    products.project("products", &PRODUCT_COLUMNS)
}
