/// Column name constants to keep the pipeline and its tests consistent.
/// Input files are addressed by these names, never by position.

// Orders table
pub const ORDER_ID: &str = "order_id";
pub const ORDER_STATUS: &str = "order_status";
pub const ORDER_PURCHASE_TIMESTAMP: &str = "order_purchase_timestamp";

// Derived by cleaning
pub const YEAR: &str = "year";
pub const WEEK: &str = "week";
pub const MONTH: &str = "month";
pub const DAY_OF_WEEK: &str = "day_of_week";

// Items table
pub const PRODUCT_ID: &str = "product_id";
pub const SELLER_ID: &str = "seller_id";
pub const PRICE: &str = "price";

// Products table
pub const PRODUCT_CATEGORY_NAME: &str = "product_category_name";

/// Order statuses that survive cleaning.
pub const KEPT_ORDER_STATUSES: [&str; 2] = ["delivered", "shipped"];

/// Columns of the cleaned orders table, in output order.
pub const CLEANED_ORDER_COLUMNS: [&str; 6] = [
    ORDER_ID,
    ORDER_PURCHASE_TIMESTAMP,
    YEAR,
    WEEK,
    MONTH,
    DAY_OF_WEEK,
];

/// Columns projected from the items table.
pub const ITEM_COLUMNS: [&str; 4] = [ORDER_ID, PRODUCT_ID, SELLER_ID, PRICE];

/// Columns projected from the products table.
pub const PRODUCT_COLUMNS: [&str; 2] = [PRODUCT_ID, PRODUCT_CATEGORY_NAME];

/// Column order of the joined table.
pub const JOINED_COLUMNS: [&str; 10] = [
    ORDER_ID,
    ORDER_PURCHASE_TIMESTAMP,
    YEAR,
    WEEK,
    MONTH,
    DAY_OF_WEEK,
    PRODUCT_ID,
    SELLER_ID,
    PRICE,
    PRODUCT_CATEGORY_NAME,
];

/// Partition columns of the output dataset, outermost directory first.
pub const PARTITION_COLUMNS: [&str; 2] = [PRODUCT_CATEGORY_NAME, PRODUCT_ID];
