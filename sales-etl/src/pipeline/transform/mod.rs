//! Row-level cleaning and projection steps between load and join.

mod items;
mod orders;
mod products;

pub use items::project_items;
pub use orders::{clean_orders, TimestampPolicy};
pub use products::project_products;
