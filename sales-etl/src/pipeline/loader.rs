//! CSV loading with light per-column type inference.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use sales_core::{EtlError, Result, Table, Value};
use tracing::debug;

use crate::observability::metrics;

/// Narrowest type that fits every non-empty value in a column.
/// Widening order is Int, then Float, then Str.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Int,
    Float,
    Str,
}

/// Read one CSV file into a [`Table`], inferring a type per column.
///
/// Empty fields become [`Value::Null`] and are ignored during inference.
/// Rows whose field count differs from the header surface as parse errors
/// carrying the offending record position.
pub fn load_table(name: &'static str, path: &Path, delimiter: u8) -> Result<Table> {
    let file = File::open(path).map_err(|e| EtlError::File {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(file);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut seen = HashSet::new();
    for column in &headers {
        if !seen.insert(column.as_str()) {
            return Err(EtlError::Parse(format!(
                "duplicate column '{column}' in table '{name}'"
            )));
        }
    }

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| {
            if matches!(e.kind(), csv::ErrorKind::UnequalLengths { .. }) {
                EtlError::Parse(format!("table '{name}': {e}"))
            } else {
                EtlError::Csv(e)
            }
        })?;
        records.push(record);
    }

    let types: Vec<ColumnType> = (0..headers.len())
        .map(|position| infer_column_type(&records, position))
        .collect();
    debug!("📋 Inferred column types for {}: {:?}", name, types);

    let mut table = Table::new(headers);
    for record in &records {
        let row = record
            .iter()
            .zip(&types)
            .map(|(raw, &ty)| parse_cell(raw, ty))
            .collect();
        table.push_row(row)?;
    }

    metrics::loader::rows_loaded(name, table.len());
    Ok(table)
}

fn infer_column_type(records: &[StringRecord], position: usize) -> ColumnType {
    let mut ty = ColumnType::Int;
    for record in records {
        let raw = record.get(position).unwrap_or("");
        if raw.is_empty() {
            continue;
        }
        ty = match ty {
            ColumnType::Int if raw.parse::<i64>().is_ok() => ColumnType::Int,
            ColumnType::Int | ColumnType::Float if raw.parse::<f64>().is_ok() => ColumnType::Float,
            _ => return ColumnType::Str,
        };
    }
    ty
}

fn parse_cell(raw: &str, ty: ColumnType) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    match ty {
        ColumnType::Int => raw.parse().map(Value::Int).unwrap_or(Value::Null),
        ColumnType::Float => raw.parse().map(Value::Float).unwrap_or(Value::Null),
        ColumnType::Str => Value::Str(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_csv(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_infers_types_and_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "items.csv",
            "order_id,order_item_id,price\n\
             o1,1,58.9\n\
             o2,2,\n\
             o3,,13.0\n",
        );

        let table = load_table("items", &path, b',').unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[0][0], Value::Str("o1".into()));
        assert_eq!(table.rows()[0][1], Value::Int(1));
        assert_eq!(table.rows()[0][2], Value::Float(58.9));
        assert_eq!(table.rows()[1][2], Value::Null);
        assert_eq!(table.rows()[2][1], Value::Null);
    }

    #[test]
    fn test_int_column_widens_to_float() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "t.csv", "qty\n1\n2.5\n3\n");

        let table = load_table("t", &path, b',').unwrap();
        assert_eq!(table.rows()[0][0], Value::Float(1.0));
        assert_eq!(table.rows()[1][0], Value::Float(2.5));
    }

    #[test]
    fn test_mixed_column_falls_back_to_str() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "t.csv", "code\n12\nabc\n");

        let table = load_table("t", &path, b',').unwrap();
        assert_eq!(table.rows()[0][0], Value::Str("12".into()));
    }

    #[test]
    fn test_semicolon_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "t.csv", "a;b\nx;7\n");

        let table = load_table("t", &path, b';').unwrap();
        assert_eq!(table.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(table.rows()[0][1], Value::Int(7));
    }

    #[test]
    fn test_duplicate_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "t.csv", "id,id\n1,2\n");

        let err = load_table("t", &path, b',').unwrap_err();
        assert!(err.to_string().contains("duplicate column 'id'"));
    }

    #[test]
    fn test_ragged_row_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "t.csv", "a,b\n1,2,3\n");

        let err = load_table("t", &path, b',').unwrap_err();
        match err {
            EtlError::Parse(message) => assert!(message.contains("table 't'")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_file_error() {
        let err = load_table("t", Path::new("does/not/exist.csv"), b',').unwrap_err();
        assert!(matches!(err, EtlError::File { .. }));
    }
}
