//! Hash inner joins over in-memory tables.

use std::collections::HashMap;

use sales_core::{EtlError, Result, Table};
use tracing::debug;

use crate::constants::{ORDER_ID, PRODUCT_ID};
use crate::observability::metrics;

/// Inner join of two tables on one shared key column.
///
/// The right side is indexed by canonical key and left rows stream past it,
/// so output order is left row order, with multiple right matches in right
/// row order. Null keys never match anything. Output columns are the left
/// columns followed by the right columns minus the key.
pub fn inner_join(left: &Table, right: &Table, on: &str) -> Result<Table> {
    let left_key = left
        .column_index(on)
        .ok_or_else(|| EtlError::Join(format!("key column '{on}' missing on the left side")))?;
    let right_key = right
        .column_index(on)
        .ok_or_else(|| EtlError::Join(format!("key column '{on}' missing on the right side")))?;

    let carried: Vec<usize> = (0..right.width()).filter(|&i| i != right_key).collect();
    let mut columns: Vec<String> = left.columns().to_vec();
    for &position in &carried {
        let name = &right.columns()[position];
        if left.column_index(name).is_some() {
            return Err(EtlError::Join(format!(
                "column '{name}' exists on both sides of the join on '{on}'"
            )));
        }
        columns.push(name.clone());
    }

    let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();
    for (position, row) in right.rows().iter().enumerate() {
        if let Some(key) = row[right_key].canonical() {
            by_key.entry(key).or_default().push(position);
        }
    }

    let mut joined = Table::new(columns);
    for row in left.rows() {
        let Some(key) = row[left_key].canonical() else {
            continue;
        };
        let Some(matches) = by_key.get(&key) else {
            continue;
        };
        for &position in matches {
            let right_row = &right.rows()[position];
            let mut out = row.clone();
            out.extend(carried.iter().map(|&i| right_row[i].clone()));
            joined.push_row(out)?;
        }
    }
    Ok(joined)
}

/// Cleaned orders joined with projected items on `order_id`, then with
/// projected products on `product_id`.
pub fn join_sales(orders: &Table, items: &Table, products: &Table) -> Result<Table> {
    let with_items = inner_join(orders, items, ORDER_ID)?;
    let joined = inner_join(&with_items, products, PRODUCT_ID)?;

    debug!("🔗 Joined sales rows: {}", joined.len());
    metrics::join::rows_joined(joined.len());
    Ok(joined)
}
