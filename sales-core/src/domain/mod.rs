mod filter;
mod table;
mod value;

pub use filter::{Filter, FilterOp};
pub use table::Table;
pub use value::Value;
