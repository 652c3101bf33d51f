//! Order cleaning: status filter, timestamp parsing, calendar derivations.

use chrono::{DateTime, Datelike, NaiveDateTime};
use sales_core::{EtlError, Result, Table, Value};
use tracing::debug;

use crate::constants::{
    CLEANED_ORDER_COLUMNS, KEPT_ORDER_STATUSES, ORDER_ID, ORDER_PURCHASE_TIMESTAMP, ORDER_STATUS,
};
use crate::observability::metrics;

/// Purchase timestamps as they appear in the source files.
const PURCHASE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What to do with rows whose purchase timestamp does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampPolicy {
    /// Drop the row and count it.
    #[default]
    Coerce,
    /// Fail the run on the first bad timestamp.
    Strict,
}

/// Filter orders to the kept statuses, parse the purchase timestamp and
/// derive `year`, `week` (ISO), `month` and `day_of_week` (Monday = 0).
///
/// The output keeps source row order and carries exactly
/// [`CLEANED_ORDER_COLUMNS`]; `order_status` does not survive the step.
pub fn clean_orders(orders: &Table, policy: TimestampPolicy) -> Result<Table> {
    let id_at = orders.require_column("orders", ORDER_ID)?;
    let status_at = orders.require_column("orders", ORDER_STATUS)?;
    let purchased_at = orders.require_column("orders", ORDER_PURCHASE_TIMESTAMP)?;

    let mut cleaned = Table::new(
        CLEANED_ORDER_COLUMNS
            .iter()
            .map(|column| column.to_string())
            .collect(),
    );
    let mut dropped_status = 0usize;
    let mut dropped_timestamp = 0usize;

    for row in orders.rows() {
        let kept_status = row[status_at]
            .as_str()
            .is_some_and(|status| KEPT_ORDER_STATUSES.contains(&status));
        if !kept_status {
            dropped_status += 1;
            continue;
        }

        let ts = match (parse_purchase_timestamp(&row[purchased_at]), policy) {
            (Some(ts), _) => ts,
            (None, TimestampPolicy::Coerce) => {
                dropped_timestamp += 1;
                continue;
            }
            (None, TimestampPolicy::Strict) => {
                return Err(EtlError::Parse(format!(
                    "order '{}' has unparseable purchase timestamp '{}'",
                    row[id_at], row[purchased_at]
                )));
            }
        };

        cleaned.push_row(vec![
            row[id_at].clone(),
            Value::Timestamp(ts),
            Value::Int(i64::from(ts.year())),
            Value::Int(i64::from(ts.iso_week().week())),
            Value::Int(i64::from(ts.month())),
            Value::Int(i64::from(ts.weekday().num_days_from_monday())),
        ])?;
    }

    debug!(
        "🧹 Cleaned orders: kept {}, dropped {} by status, {} by timestamp",
        cleaned.len(),
        dropped_status,
        dropped_timestamp
    );
    metrics::transform::orders_cleaned(cleaned.len(), dropped_status, dropped_timestamp);
    Ok(cleaned)
}

/// `YYYY-MM-DD HH:MM:SS` first, RFC 3339 as a fallback (offsets collapse
/// to UTC). Anything else, including non-string cells, is unparseable.
fn parse_purchase_timestamp(cell: &Value) -> Option<NaiveDateTime> {
    match cell {
        Value::Timestamp(ts) => Some(*ts),
        Value::Str(raw) => NaiveDateTime::parse_from_str(raw, PURCHASE_TIMESTAMP_FORMAT)
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|dt| dt.naive_utc())
            }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders_table(rows: &[(&str, &str, &str)]) -> Table {
        let mut table = Table::new(vec![
            ORDER_ID.to_string(),
            ORDER_STATUS.to_string(),
            ORDER_PURCHASE_TIMESTAMP.to_string(),
        ]);
        for (id, status, purchased) in rows {
            let as_cell = |raw: &str| {
                if raw.is_empty() {
                    Value::Null
                } else {
                    Value::Str(raw.to_string())
                }
            };
            table
                .push_row(vec![Value::Str(id.to_string()), as_cell(status), as_cell(purchased)])
                .unwrap();
        }
        table
    }

    #[test]
    fn test_derivations_for_a_delivered_order() {
        let orders = orders_table(&[("A", "delivered", "2017-12-21 17:43:41")]);
        let cleaned = clean_orders(&orders, TimestampPolicy::Coerce).unwrap();

        assert_eq!(cleaned.columns(), &CLEANED_ORDER_COLUMNS);
        assert_eq!(cleaned.len(), 1);
        let row = &cleaned.rows()[0];
        assert_eq!(row[0], Value::Str("A".into()));
        assert_eq!(row[2], Value::Int(2017)); // year
        assert_eq!(row[3], Value::Int(51)); // ISO week
        assert_eq!(row[4], Value::Int(12)); // month
        assert_eq!(row[5], Value::Int(3)); // Thursday
    }

    #[test]
    fn test_status_filter_keeps_only_delivered_and_shipped() {
        let orders = orders_table(&[
            ("A", "delivered", "2017-12-21 17:43:41"),
            ("B", "shipped", "2017-05-09 11:48:37"),
            ("C", "canceled", "2017-05-09 11:48:37"),
            ("D", "DELIVERED", "2017-05-09 11:48:37"),
            ("E", "", "2017-05-09 11:48:37"),
        ]);
        let cleaned = clean_orders(&orders, TimestampPolicy::Coerce).unwrap();
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned.rows()[0][0], Value::Str("A".into()));
        assert_eq!(cleaned.rows()[1][0], Value::Str("B".into()));
    }

    #[test]
    fn test_rfc3339_fallback_collapses_to_utc() {
        let orders = orders_table(&[("A", "delivered", "2017-12-21T19:43:41+02:00")]);
        let cleaned = clean_orders(&orders, TimestampPolicy::Coerce).unwrap();
        let expected =
            NaiveDateTime::parse_from_str("2017-12-21 17:43:41", PURCHASE_TIMESTAMP_FORMAT)
                .unwrap();
        assert_eq!(cleaned.rows()[0][1], Value::Timestamp(expected));
    }

    #[test]
    fn test_coerce_drops_bad_timestamps() {
        let orders = orders_table(&[
            ("A", "delivered", "not a timestamp"),
            ("B", "delivered", ""),
            ("C", "shipped", "2017-05-09 11:48:37"),
        ]);
        let cleaned = clean_orders(&orders, TimestampPolicy::Coerce).unwrap();
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned.rows()[0][0], Value::Str("C".into()));
    }

    #[test]
    fn test_strict_fails_on_bad_timestamp() {
        let orders = orders_table(&[("A", "delivered", "not a timestamp")]);
        let err = clean_orders(&orders, TimestampPolicy::Strict).unwrap_err();
        match err {
            EtlError::Parse(message) => assert!(message.contains("order 'A'")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_status_column_is_schema_error() {
        let table = Table::new(vec![ORDER_ID.to_string(), ORDER_PURCHASE_TIMESTAMP.to_string()]);
        let err = clean_orders(&table, TimestampPolicy::Coerce).unwrap_err();
        match err {
            EtlError::Schema { table, column } => {
                assert_eq!(table, "orders");
                assert_eq!(column, ORDER_STATUS);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }
}
