use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use crate::common::error::{EtlError, Result};

use super::Value;

/// Comparison operator of a read-back predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl FilterOp {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOp::Eq => "==",
            FilterOp::Ne => "!=",
            FilterOp::Lt => "<",
            FilterOp::Le => "<=",
            FilterOp::Gt => ">",
            FilterOp::Ge => ">=",
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            FilterOp::Eq => ordering == Ordering::Equal,
            FilterOp::Ne => ordering != Ordering::Equal,
            FilterOp::Lt => ordering == Ordering::Less,
            FilterOp::Le => ordering != Ordering::Greater,
            FilterOp::Gt => ordering == Ordering::Greater,
            FilterOp::Ge => ordering != Ordering::Less,
        }
    }
}

/// One column-operator-value predicate for filtered dataset reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    pub fn new(column: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// Parses a CLI-style predicate such as `price>=40` or
    /// `product_category_name==moveis_decoracao`. Two-character operators
    /// are matched before their one-character prefixes.
    pub fn parse(spec: &str) -> Result<Filter> {
        const OPS: [(&str, FilterOp); 6] = [
            ("==", FilterOp::Eq),
            ("!=", FilterOp::Ne),
            ("<=", FilterOp::Le),
            (">=", FilterOp::Ge),
            ("<", FilterOp::Lt),
            (">", FilterOp::Gt),
        ];
        for (token, op) in OPS {
            if let Some((column, value)) = spec.split_once(token) {
                let column = column.trim();
                let value = value.trim();
                if column.is_empty() || value.is_empty() {
                    break;
                }
                return Ok(Filter::new(column, op, value));
            }
        }
        Err(EtlError::Config(format!(
            "invalid filter '{spec}': expected column<op>value with one of == != < <= > >="
        )))
    }

    /// Whether a cell satisfies this predicate. A null cell never matches
    /// (for any operator), and a right-hand side that cannot be read in the
    /// cell's type never matches.
    pub fn matches(&self, cell: &Value) -> bool {
        match self.compare_cell(cell) {
            Some(ordering) => self.op.accepts(ordering),
            None => false,
        }
    }

    fn compare_cell(&self, cell: &Value) -> Option<Ordering> {
        let rhs = match cell {
            Value::Str(_) => Value::Str(self.value.clone()),
            Value::Int(_) | Value::Float(_) => match self.value.parse::<i64>() {
                Ok(n) => Value::Int(n),
                Err(_) => Value::Float(self.value.parse::<f64>().ok()?),
            },
            Value::Timestamp(_) => Value::Timestamp(parse_timestamp_bound(&self.value)?),
            Value::Null => return None,
        };
        cell.compare(&rhs)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.column, self.op.as_str(), self.value)
    }
}

/// Timestamp bound in `YYYY-MM-DD HH:MM:SS` form, or a bare date taken as
/// that day's midnight.
fn parse_timestamp_bound(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|day| day.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_each_operator() {
        for (spec, op) in [
            ("price==40", FilterOp::Eq),
            ("price!=40", FilterOp::Ne),
            ("price<40", FilterOp::Lt),
            ("price<=40", FilterOp::Le),
            ("price>40", FilterOp::Gt),
            ("price>=40", FilterOp::Ge),
        ] {
            let filter = Filter::parse(spec).unwrap();
            assert_eq!(filter.column, "price");
            assert_eq!(filter.op, op);
            assert_eq!(filter.value, "40");
        }
    }

    #[test]
    fn test_parse_prefers_two_character_operators() {
        let filter = Filter::parse("week<=51").unwrap();
        assert_eq!(filter.op, FilterOp::Le);
        assert_eq!(filter.value, "51");
    }

    #[test]
    fn test_parse_rejects_malformed_specs() {
        for spec in ["price", "price=40", "==40", "price=="] {
            let err = Filter::parse(spec).unwrap_err();
            assert!(matches!(err, EtlError::Config(_)), "spec {spec:?}");
        }
    }

    #[test]
    fn test_string_equality() {
        let filter = Filter::parse("category==moveis_decoracao").unwrap();
        assert!(filter.matches(&Value::Str("moveis_decoracao".into())));
        assert!(!filter.matches(&Value::Str("bebes".into())));
    }

    #[test]
    fn test_numeric_comparison_crosses_int_and_float() {
        let filter = Filter::parse("price>49").unwrap();
        assert!(filter.matches(&Value::Float(49.9)));
        assert!(!filter.matches(&Value::Float(12.0)));
        assert!(filter.matches(&Value::Int(50)));
    }

    #[test]
    fn test_null_never_matches() {
        let eq = Filter::parse("price==40").unwrap();
        let ne = Filter::parse("price!=40").unwrap();
        assert!(!eq.matches(&Value::Null));
        assert!(!ne.matches(&Value::Null));
    }

    #[test]
    fn test_unreadable_bound_never_matches() {
        let filter = Filter::parse("price>abc").unwrap();
        assert!(!filter.matches(&Value::Float(49.9)));
    }

    #[test]
    fn test_timestamp_bound_accepts_bare_date() {
        let filter = Filter::parse("order_purchase_timestamp>=2017-12-01").unwrap();
        let ts = NaiveDateTime::parse_from_str("2017-12-21 17:43:41", "%Y-%m-%d %H:%M:%S").unwrap();
        assert!(filter.matches(&Value::Timestamp(ts)));
        let earlier = NaiveDateTime::parse_from_str("2017-05-09 11:48:37", "%Y-%m-%d %H:%M:%S").unwrap();
        assert!(!filter.matches(&Value::Timestamp(earlier)));
    }
}
